//! Centralized error handling for cron-relay
//!
//! This module unifies the error types used by the scheduling core, the
//! persistence layer and the web layer so that every failure maps to one
//! status classification at the API boundary.
//!
//! # Error Categories
//!
//! - **Schedule Errors**: malformed cron expressions or unknown timezones
//! - **Target Errors**: a job whose target kind lacks its required field
//! - **Access Errors**: missing resources and ownership violations
//! - **Queue Errors**: trigger queue faults during reconciliation
//! - **Database Errors**: SeaORM failures and repository faults
//!
//! # Usage
//!
//! ```rust
//! use cron_relay::errors::{AppError, AppResult};
//!
//! fn check_name(name: &str) -> AppResult<()> {
//!     if name.is_empty() {
//!         return Err(AppError::validation("name must not be empty"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;
