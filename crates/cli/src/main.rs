//! Meridian CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront and session store migrations
//! meridian migrate
//!
//! # Load catalog products from YAML
//! meridian seed --file products.yaml
//!
//! # Promote a user to admin
//! meridian user set-role --email admin@example.com --role admin
//! ```
//!
//! Every command reads `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "meridian")]
#[command(author, version, about = "Meridian CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations (storefront schema and session store)
    Migrate,
    /// Insert or update catalog products from a YAML file
    Seed {
        /// Path to the products YAML file
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Manage storefront users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Change a user's role
    SetRole {
        /// User email address
        #[arg(short, long)]
        email: String,

        /// New role (`customer` or `admin`)
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => {
            let count = commands::seed::products(&file).await?;
            tracing::info!(count, "Catalog seeded");
        }
        Commands::User { action } => match action {
            UserAction::SetRole { email, role } => {
                commands::user::set_role(&email, &role).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_role() {
        let cli = Cli::try_parse_from([
            "meridian", "user", "set-role", "--email", "a@b.test", "--role", "admin",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::User {
                action: UserAction::SetRole { .. }
            }
        ));
    }
}
