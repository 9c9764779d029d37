//! Execution log HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::Method,
    response::Response,
};

use crate::models::ExecutionListQuery;
use crate::web::{
    AppState,
    extractors::{OwnerId, Pagination, RequestContext},
    responses::{bad_request, handle_result},
    utils::{extract_uuid_param, log_request},
};

#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}/executions",
    tag = "executions",
    params(
        ("id" = String, Path, description = "Job ID (UUID)"),
        ExecutionListQuery,
        ("page" = Option<u64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<u64>, Query, description = "Items per page (1-100)"),
        ("X-User-Id" = String, Header, description = "Caller user id (UUID)"),
    ),
    responses(
        (status = 200, description = "Attempts of the job, most recent first"),
        (status = 403, description = "Job belongs to another user"),
        (status = 404, description = "Job not found"),
    )
)]
pub async fn list_job_executions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OwnerId(owner): OwnerId,
    Pagination(page): Pagination,
    Query(query): Query<ExecutionListQuery>,
    context: RequestContext,
) -> Response {
    log_request(&Method::GET, &format!("/api/v1/jobs/{id}/executions"), &context);

    let id = match extract_uuid_param(&id) {
        Ok(id) => id,
        Err(error) => return bad_request(&error),
    };
    handle_result(
        state
            .execution_service
            .list_executions(owner, id, query, page)
            .await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/executions",
    tag = "executions",
    params(
        ExecutionListQuery,
        ("page" = Option<u64>, Query, description = "Page number (1-based)"),
        ("limit" = Option<u64>, Query, description = "Items per page (1-100)"),
        ("X-User-Id" = String, Header, description = "Caller user id (UUID)"),
    ),
    responses(
        (status = 200, description = "Attempts across all of the caller's jobs"),
        (status = 401, description = "Missing or malformed X-User-Id"),
    )
)]
pub async fn list_user_executions(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Pagination(page): Pagination,
    Query(query): Query<ExecutionListQuery>,
    context: RequestContext,
) -> Response {
    log_request(&Method::GET, "/api/v1/executions", &context);
    handle_result(
        state
            .execution_service
            .list_user_executions(owner, query, page)
            .await,
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/executions/{id}",
    tag = "executions",
    params(
        ("id" = String, Path, description = "Execution log ID (UUID)"),
        ("X-User-Id" = String, Header, description = "Caller user id (UUID)"),
    ),
    responses(
        (status = 200, description = "Execution log entry"),
        (status = 403, description = "Log belongs to another user's job"),
        (status = 404, description = "Execution log not found"),
    )
)]
pub async fn get_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
    OwnerId(owner): OwnerId,
    context: RequestContext,
) -> Response {
    log_request(&Method::GET, &format!("/api/v1/executions/{id}"), &context);

    let id = match extract_uuid_param(&id) {
        Ok(id) => id,
        Err(error) => return bad_request(&error),
    };
    handle_result(state.execution_service.get_execution_by_id(owner, id).await)
}
