//! Error type definitions for cron-relay
//!
//! This module defines the error hierarchy shared by the scheduling core,
//! the services and the web layer.

use thiserror::Error;

use crate::job_scheduling::TriggerQueueError;

/// Top-level application error type
///
/// Every service operation returns this type; the web layer turns each
/// variant into one HTTP status code.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors (SeaORM)
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Cron expression or timezone rejected at definition time
    #[error("Invalid schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },

    /// Target kind is missing the field it requires
    #[error("Invalid target configuration: {message}")]
    TargetConfiguration { message: String },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// Caller does not own the resource
    #[error("You do not have access to this {resource}")]
    Forbidden { resource: String, id: String },

    /// Caller identity is missing or malformed
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Trigger queue errors surfaced during reconciliation
    #[error("Trigger queue error: {0}")]
    Queue(#[from] TriggerQueueError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database errors from SeaORM
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Anything raised by a repository through anyhow
    #[error("{0}")]
    Other(#[from] anyhow::Error),

    /// Data serialization/deserialization failures
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Record not found
    #[error("Record not found: {table} with {field} = {value}")]
    RecordNotFound {
        table: String,
        field: String,
        value: String,
    },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an invalid schedule error
    pub fn invalid_schedule<E: Into<String>, R: Into<String>>(expression: E, reason: R) -> Self {
        Self::InvalidSchedule {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Create a target configuration error
    pub fn target_configuration<S: Into<String>>(message: S) -> Self {
        Self::TargetConfiguration {
            message: message.into(),
        }
    }

    pub fn not_found<R: Into<String>, I: ToString>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn forbidden<R: Into<String>, I: ToString>(resource: R, id: I) -> Self {
        Self::Forbidden {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Repository(RepositoryError::Other(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AppError::invalid_schedule("* * *", "expected 5 or 6 fields");
        assert_eq!(
            err.to_string(),
            "Invalid schedule '* * *': expected 5 or 6 fields"
        );

        let err = AppError::forbidden("job", "abc");
        assert_eq!(err.to_string(), "You do not have access to this job");

        let err = AppError::not_found("Cron job", "abc");
        assert_eq!(err.to_string(), "Cron job not found: abc");
    }

    #[test]
    fn test_anyhow_conversion_wraps_repository_error() {
        let err: AppError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, AppError::Repository(RepositoryError::Other(_))));
    }
}
