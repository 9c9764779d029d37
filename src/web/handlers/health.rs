//! Health check HTTP handlers

use axum::{Json, extract::State, response::IntoResponse};

use crate::web::AppState;

/// Health check endpoint
///
/// Reports the service version and trigger queue occupancy
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is running", body = crate::job_scheduling::SchedulingHealthStatus))
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.scheduling.health().await)
}
