//! Web utility functions

use axum::http::Method;
use tracing::info;
use uuid::Uuid;

use super::extractors::RequestContext;

/// Log an incoming HTTP request
pub fn log_request(method: &Method, path: &str, context: &RequestContext) {
    info!(
        method = %method,
        path = %path,
        request_id = %context.request_id,
        user_agent = ?context.user_agent,
        real_ip = ?context.real_ip,
        "HTTP request"
    );
}

/// Extract UUID from path parameter
pub fn extract_uuid_param(param: &str) -> Result<Uuid, String> {
    Uuid::parse_str(param).map_err(|_| format!("Invalid UUID format: {param}"))
}
