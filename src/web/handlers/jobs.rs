//! Cron job HTTP handlers
//!
//! Thin wrappers around `CronJobService`; they only deal with request and
//! response mapping.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::Method,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::models::{CronJobCreateRequest, CronJobUpdateRequest, JobListQuery};
use crate::web::{
    AppState,
    extractors::{OwnerId, Pagination, RequestContext},
    responses::{accepted, bad_request, created, handle_error, handle_result, ok},
    utils::{extract_uuid_param, log_request},
};

#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "jobs",
    params(
        JobListQuery,
        ("page" = Option<u64>, Query, description = "Page number (1-based)", example = 1),
        ("limit" = Option<u64>, Query, description = "Items per page (1-100)", example = 20),
        ("X-User-Id" = String, Header, description = "Caller user id (UUID)"),
    ),
    responses(
        (status = 200, description = "Jobs of the caller, newest first"),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Missing or malformed X-User-Id"),
    )
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Pagination(page): Pagination,
    Query(query): Query<JobListQuery>,
    context: RequestContext,
) -> Response {
    log_request(&Method::GET, "/api/v1/jobs", &context);
    handle_result(state.job_service.list_jobs(owner, query, page).await)
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    tag = "jobs",
    request_body = CronJobCreateRequest,
    params(("X-User-Id" = String, Header, description = "Caller user id (UUID)")),
    responses(
        (status = 201, description = "Job created and scheduled"),
        (status = 400, description = "Invalid cron expression or timezone"),
        (status = 401, description = "Missing or malformed X-User-Id"),
        (status = 422, description = "Invalid job definition"),
    )
)]
pub async fn create_job(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    context: RequestContext,
    Json(request): Json<CronJobCreateRequest>,
) -> Response {
    log_request(&Method::POST, "/api/v1/jobs", &context);

    match state.job_service.create_job(owner, request).await {
        Ok(job) => created(job).into_response(),
        Err(e) => handle_error(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Caller user id (UUID)"),
    ),
    responses(
        (status = 200, description = "Job details with next and last fire times"),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job not found"),
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OwnerId(owner): OwnerId,
    context: RequestContext,
) -> Response {
    log_request(&Method::GET, &format!("/api/v1/jobs/{id}"), &context);

    let id = match extract_uuid_param(&id) {
        Ok(id) => id,
        Err(error) => return bad_request(&error),
    };
    handle_result(state.job_service.get_job(owner, id).await)
}

#[utoipa::path(
    put,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    request_body = CronJobUpdateRequest,
    params(
        ("id" = String, Path, description = "Job ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Caller user id (UUID)"),
    ),
    responses(
        (status = 200, description = "Job updated and rescheduled"),
        (status = 400, description = "Invalid cron expression or timezone"),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job not found"),
        (status = 422, description = "Invalid job definition"),
    )
)]
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OwnerId(owner): OwnerId,
    context: RequestContext,
    Json(request): Json<CronJobUpdateRequest>,
) -> Response {
    log_request(&Method::PUT, &format!("/api/v1/jobs/{id}"), &context);

    let id = match extract_uuid_param(&id) {
        Ok(id) => id,
        Err(error) => return bad_request(&error),
    };
    handle_result(state.job_service.update_job(owner, id, request).await)
}

#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Caller user id (UUID)"),
    ),
    responses(
        (status = 200, description = "Job and its execution history deleted"),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job not found"),
    )
)]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OwnerId(owner): OwnerId,
    context: RequestContext,
) -> Response {
    log_request(&Method::DELETE, &format!("/api/v1/jobs/{id}"), &context);

    let id = match extract_uuid_param(&id) {
        Ok(id) => id,
        Err(error) => return bad_request(&error),
    };
    match state.job_service.delete_job(owner, id).await {
        Ok(()) => ok(json!({ "id": id, "message": "Cron job deleted successfully" }))
            .into_response(),
        Err(e) => handle_error(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/pause",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Caller user id (UUID)"),
    ),
    responses(
        (status = 200, description = "Job paused (no-op when already paused)"),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job not found"),
    )
)]
pub async fn pause_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OwnerId(owner): OwnerId,
    context: RequestContext,
) -> Response {
    log_request(&Method::POST, &format!("/api/v1/jobs/{id}/pause"), &context);

    let id = match extract_uuid_param(&id) {
        Ok(id) => id,
        Err(error) => return bad_request(&error),
    };
    handle_result(state.job_service.pause_job(owner, id).await)
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/resume",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Caller user id (UUID)"),
    ),
    responses(
        (status = 200, description = "Job resumed (no-op when already active)"),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job not found"),
    )
)]
pub async fn resume_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OwnerId(owner): OwnerId,
    context: RequestContext,
) -> Response {
    log_request(&Method::POST, &format!("/api/v1/jobs/{id}/resume"), &context);

    let id = match extract_uuid_param(&id) {
        Ok(id) => id,
        Err(error) => return bad_request(&error),
    };
    handle_result(state.job_service.resume_job(owner, id).await)
}

#[utoipa::path(
    post,
    path = "/api/v1/jobs/{id}/run",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Caller user id (UUID)"),
    ),
    responses(
        (status = 202, description = "Immediate run queued"),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job not found"),
        (status = 503, description = "Trigger queue unavailable"),
    )
)]
pub async fn run_job_now(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OwnerId(owner): OwnerId,
    context: RequestContext,
) -> Response {
    log_request(&Method::POST, &format!("/api/v1/jobs/{id}/run"), &context);

    let id = match extract_uuid_param(&id) {
        Ok(id) => id,
        Err(error) => return bad_request(&error),
    };
    match state.job_service.run_job_now(owner, id).await {
        Ok(queued) => accepted(queued).into_response(),
        Err(e) => handle_error(e),
    }
}
