//! Statistics HTTP handlers

use axum::{
    extract::{Path, State},
    http::Method,
    response::Response,
};

use crate::web::{
    AppState,
    extractors::{OwnerId, RequestContext},
    responses::{bad_request, handle_result},
    utils::{extract_uuid_param, log_request},
};

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/stats",
    tag = "stats",
    params(
        ("id" = String, Path, description = "Job ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Caller user id (UUID)"),
    ),
    responses(
        (status = 200, description = "Outcome counts, success rate and recent attempts"),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job not found"),
    )
)]
pub async fn job_statistics(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OwnerId(owner): OwnerId,
    context: RequestContext,
) -> Response {
    log_request(&Method::GET, &format!("/api/v1/jobs/{id}/stats"), &context);

    let id = match extract_uuid_param(&id) {
        Ok(id) => id,
        Err(error) => return bad_request(&error),
    };
    handle_result(state.execution_service.get_job_statistics(owner, id).await)
}

#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "stats",
    params(("X-User-Id" = String, Header, description = "Caller user id (UUID)")),
    responses(
        (status = 200, description = "Job and execution totals for the caller"),
        (status = 401, description = "Missing or malformed X-User-Id"),
    )
)]
pub async fn user_statistics(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    context: RequestContext,
) -> Response {
    log_request(&Method::GET, "/api/v1/stats", &context);
    handle_result(state.execution_service.get_user_statistics(owner).await)
}
