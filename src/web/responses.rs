//! HTTP response types and utilities
//!
//! This module provides standardized response types and error handling
//! for the web layer, ensuring consistent API responses across all endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::error;
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error_with_details(
        message: String,
        details: HashMap<String, String>,
    ) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            details: Some(details),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Helper function to convert AppResult to HTTP response
pub fn handle_result<T>(result: AppResult<T>) -> Response
where
    T: Serialize,
{
    match result {
        Ok(data) => ok(data).into_response(),
        Err(error) => handle_error(error),
    }
}

/// Status code for each error variant
pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::InvalidSchedule { .. } => StatusCode::BAD_REQUEST,
        AppError::TargetConfiguration { .. } | AppError::Validation { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Queue(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Database(_)
        | AppError::Repository(_)
        | AppError::Configuration { .. }
        | AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let status = status_for(&error);
    let (message, details) = match &error {
        AppError::InvalidSchedule { expression, reason } => {
            let mut details = HashMap::new();
            details.insert("cron_expression".to_string(), expression.clone());
            details.insert("reason".to_string(), reason.clone());
            ("Invalid cron expression".to_string(), Some(details))
        }
        AppError::TargetConfiguration { message } | AppError::Validation { message } => {
            (message.clone(), None)
        }
        AppError::NotFound { resource, .. } => (format!("{resource} not found"), None),
        AppError::Forbidden { .. } | AppError::Unauthorized { .. } => (error.to_string(), None),
        AppError::Queue(_) => ("Scheduling backend unavailable".to_string(), None),
        AppError::Database(_) => ("Database operation failed".to_string(), None),
        AppError::Repository(_) => ("Data access failed".to_string(), None),
        AppError::Configuration { .. } | AppError::Internal { .. } => {
            ("Internal server error".to_string(), None)
        }
    };

    if status.is_server_error() {
        error!("Request failed: {}", error);
    }

    let response = match details {
        Some(details) => ApiResponse::<()>::error_with_details(message, details),
        None => ApiResponse::<()>::error(message),
    };
    (status, Json(response)).into_response()
}

/// Success response helpers
pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

pub fn created<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

pub fn accepted<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::ACCEPTED, Json(ApiResponse::success(data)))
}

pub fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(message.to_string())),
    )
        .into_response()
}

/// Validation error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub field: String,
    pub message: String,
}

pub fn validation_error(errors: Vec<ValidationErrorResponse>) -> Response {
    let details = errors
        .into_iter()
        .map(|error| (error.field, error.message))
        .collect();

    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error_with_details(
            "Validation failed".to_string(),
            details,
        )),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_scheduling::TriggerQueueError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&AppError::invalid_schedule("bad", "nope")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&AppError::target_configuration("missing url")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&AppError::forbidden("job", "1")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&AppError::not_found("Cron job", "1")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&AppError::unauthorized("missing header")),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&AppError::Queue(TriggerQueueError::Unavailable("down".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&AppError::internal("boom")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_success_envelope_shape() {
        let value = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"], 42);
        assert!(value.get("error").is_none());
        assert!(value.get("timestamp").is_some());
    }
}
