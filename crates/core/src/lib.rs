//! Meridian Core - Shared types and cart aggregation.
//!
//! This crate provides the domain pieces used across all Meridian components:
//! - `storefront` - Public-facing e-commerce site and JSON API
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types, pure state transitions and traits - no
//! database access, no HTTP clients. Persistence is reached through the
//! [`cart::CartStorage`] trait, which the storefront implements on top of its
//! session store.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, and statuses
//! - [`cart`] - Cart aggregation: merge-by-identity, quantity floor, totals, persistence
//! - [`checkout`] - Order pricing and validation of order submissions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod types;

pub use types::*;
