//! OpenAPI documentation generation using utoipa
//!
//! Handler functions are annotated with `#[utoipa::path]`; this module
//! collects them into one document served at `/api/openapi.json`.

use utoipa::OpenApi;

use super::handlers;
use crate::job_scheduling::api::{QueueHealth, SchedulingHealthStatus};
use crate::models::{
    CronJob, CronJobCreateRequest, CronJobResponse, CronJobUpdateRequest, ExecutionCounts,
    ExecutionLog, ExecutionStatus, ExecutionWithJob, HttpMethod, JobCounts, JobStatistics,
    JobStatus, PaginationInfo, RunNowResponse, TargetType, UserStatistics,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "cron-relay API",
        description = "Schedule HTTP callbacks with cron expressions and inspect every execution."
    ),
    paths(
        handlers::health::health_check,
        handlers::jobs::list_jobs,
        handlers::jobs::create_job,
        handlers::jobs::get_job,
        handlers::jobs::update_job,
        handlers::jobs::delete_job,
        handlers::jobs::pause_job,
        handlers::jobs::resume_job,
        handlers::jobs::run_job_now,
        handlers::executions::list_job_executions,
        handlers::executions::list_user_executions,
        handlers::executions::get_execution,
        handlers::stats::job_statistics,
        handlers::stats::user_statistics,
    ),
    components(schemas(
        CronJob,
        CronJobCreateRequest,
        CronJobUpdateRequest,
        CronJobResponse,
        RunNowResponse,
        JobStatus,
        TargetType,
        HttpMethod,
        ExecutionLog,
        ExecutionStatus,
        ExecutionWithJob,
        JobStatistics,
        JobCounts,
        ExecutionCounts,
        UserStatistics,
        PaginationInfo,
        SchedulingHealthStatus,
        QueueHealth,
    )),
    tags(
        (name = "jobs", description = "Cron job management"),
        (name = "executions", description = "Execution history"),
        (name = "stats", description = "Execution statistics"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Complete OpenAPI document for the service
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_job_routes() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/v1/jobs"));
        assert!(spec.paths.paths.contains_key("/api/v1/jobs/{id}/run"));
        assert!(spec.paths.paths.contains_key("/health"));
    }
}
