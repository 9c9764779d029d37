//! Request extractors and validation
//!
//! Pagination parameters, the caller identity header and per-request
//! context used for logging.

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    response::Response,
};
use serde::Deserialize;
use uuid::Uuid;

use super::responses::{ValidationErrorResponse, bad_request, handle_error, validation_error};
use crate::config::defaults::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::errors::AppError;
use crate::models::PageRequest;

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// Pagination parameters from query string
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    DEFAULT_PAGE_LIMIT
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PaginationParams {
    pub fn validate(&self) -> Result<PageRequest, Vec<ValidationErrorResponse>> {
        let mut errors = Vec::new();

        if self.page < 1 {
            errors.push(ValidationErrorResponse {
                field: "page".to_string(),
                message: "Page must be >= 1".to_string(),
            });
        }

        if self.limit < 1 || self.limit > MAX_PAGE_LIMIT {
            errors.push(ValidationErrorResponse {
                field: "limit".to_string(),
                message: format!("Limit must be between 1 and {MAX_PAGE_LIMIT}"),
            });
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(PageRequest {
            page: self.page,
            limit: self.limit,
        })
    }
}

/// Validated page request
#[derive(Debug, Clone, Copy)]
pub struct Pagination(pub PageRequest);

impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params): Query<PaginationParams> = Query::from_request_parts(parts, state)
            .await
            .map_err(|_| bad_request("Invalid pagination parameters"))?;

        params.validate().map(Pagination).map_err(validation_error)
    }
}

/// Identity of the calling user, taken from the `X-User-Id` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId(pub Uuid);

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| handle_error(AppError::unauthorized("missing X-User-Id header")))?;

        value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(OwnerId)
            .ok_or_else(|| handle_error(AppError::unauthorized("X-User-Id must be a UUID")))
    }
}

/// Request context for logging
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub real_ip: Option<String>,
    pub request_id: String,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        let real_ip = parts
            .headers
            .get("x-real-ip")
            .or_else(|| parts.headers.get("x-forwarded-for"))
            .and_then(|h| h.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());

        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Self {
            user_agent,
            real_ip,
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 1, true)]
    #[case(3, 100, true)]
    #[case(1, 0, false)]
    #[case(0, 20, false)]
    #[case(1, 101, false)]
    fn test_pagination_limits(#[case] page: u64, #[case] limit: u64, #[case] valid: bool) {
        assert_eq!(PaginationParams { page, limit }.validate().is_ok(), valid);
    }

    #[test]
    fn test_pagination_defaults_and_bounds() {
        let page = PaginationParams::default().validate().unwrap();
        assert_eq!((page.page, page.limit), (1, 20));

        let errors = PaginationParams { page: 0, limit: 101 }
            .validate()
            .unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["page", "limit"]);
    }
}
