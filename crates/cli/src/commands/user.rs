//! Storefront user management.

use meridian_core::{Email, UserRole};

use super::{CommandError, connect};

/// Errors from user commands.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Invalid role: {0}. Valid roles: customer, admin")]
    InvalidRole(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] meridian_core::EmailError),

    #[error("No user with email: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Change the role of the user with `email`.
///
/// Sessions keep the role they were created with; the user has to log in
/// again for the change to apply.
///
/// # Errors
///
/// Returns `UserError` if the input is invalid, the user does not exist, or
/// the update fails.
pub async fn set_role(email: &str, role: &str) -> Result<(), UserError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;
    let email = Email::parse(email)?;

    let pool = connect().await?;

    let result = sqlx::query("UPDATE storefront.users SET role = $2 WHERE email = $1")
        .bind(&email)
        .bind(role)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(UserError::NotFound(email.to_string()));
    }

    tracing::info!(%email, %role, "User role updated");
    Ok(())
}
