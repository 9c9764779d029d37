//! Cron job service
//!
//! Owner-scoped job management. Every mutation goes to the store first and
//! is then reflected in the trigger queue through the reconciler.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::database::repositories::CronJobSeaOrmRepository;
use crate::errors::{AppError, AppResult};
use crate::job_scheduling::SchedulerReconciler;
use crate::models::{
    CronJob, CronJobCreateRequest, CronJobResponse, CronJobUpdateRequest, JobListQuery, JobStatus,
    PageRequest, PaginatedResponse, RunNowResponse,
};

/// Service for managing cron jobs with business logic
#[derive(Clone)]
pub struct CronJobService {
    job_repo: CronJobSeaOrmRepository,
    reconciler: Arc<SchedulerReconciler>,
}

impl CronJobService {
    pub fn new(job_repo: CronJobSeaOrmRepository, reconciler: Arc<SchedulerReconciler>) -> Self {
        Self {
            job_repo,
            reconciler,
        }
    }

    /// Validate, persist and schedule a new job
    pub async fn create_job(
        &self,
        owner: Uuid,
        request: CronJobCreateRequest,
    ) -> AppResult<CronJobResponse> {
        let job = request.into_job(owner);
        job.validate()?;
        debug!("Creating cron job: {}", job.name);

        let job = self.job_repo.create(&job).await?;

        if let Err(e) = self.reconciler.on_create(&job).await {
            error!(job_id = %job.id, "Failed to schedule new job, rolling back: {}", e);
            if let Err(rollback) = self.job_repo.delete(&job.id).await {
                error!(job_id = %job.id, "Rollback of job row failed: {}", rollback);
            }
            return Err(e);
        }

        info!(job_id = %job.id, user_id = %owner, "Created cron job '{}'", job.name);
        Ok(CronJobResponse::from_job(job, Utc::now()))
    }

    pub async fn get_job(&self, owner: Uuid, id: Uuid) -> AppResult<CronJobResponse> {
        let job = self.owned_job(owner, id).await?;
        Ok(CronJobResponse::from_job(job, Utc::now()))
    }

    /// Newest first, optionally filtered by status
    pub async fn list_jobs(
        &self,
        owner: Uuid,
        query: JobListQuery,
        page: PageRequest,
    ) -> AppResult<PaginatedResponse<CronJobResponse>> {
        let (jobs, total) = self
            .job_repo
            .find_by_user(&owner, query.status, page.offset(), page.limit)
            .await?;

        let now = Utc::now();
        Ok(PaginatedResponse::new(jobs, total, page).map(|job| CronJobResponse::from_job(job, now)))
    }

    /// Merge, re-validate, persist and re-schedule
    pub async fn update_job(
        &self,
        owner: Uuid,
        id: Uuid,
        request: CronJobUpdateRequest,
    ) -> AppResult<CronJobResponse> {
        let previous = self.owned_job(owner, id).await?;
        let merged = request.apply_to(&previous);
        merged.validate()?;

        let updated = self.job_repo.update(&merged).await?;
        self.reconciler.on_update(&previous, &updated).await?;

        info!(job_id = %id, status = %updated.status, "Updated cron job");
        Ok(CronJobResponse::from_job(updated, Utc::now()))
    }

    /// Unschedule and delete; execution logs go with the row
    pub async fn delete_job(&self, owner: Uuid, id: Uuid) -> AppResult<()> {
        let job = self.owned_job(owner, id).await?;
        self.reconciler.on_delete(&job).await?;
        info!(job_id = %id, "Deleted cron job");
        Ok(())
    }

    pub async fn pause_job(&self, owner: Uuid, id: Uuid) -> AppResult<CronJobResponse> {
        self.set_status(owner, id, JobStatus::Paused).await
    }

    pub async fn resume_job(&self, owner: Uuid, id: Uuid) -> AppResult<CronJobResponse> {
        self.set_status(owner, id, JobStatus::Active).await
    }

    /// Queue one immediate firing outside the schedule
    pub async fn run_job_now(&self, owner: Uuid, id: Uuid) -> AppResult<RunNowResponse> {
        let job = self.owned_job(owner, id).await?;
        let delivery_id = self.reconciler.run_now(&job).await?;

        Ok(RunNowResponse {
            job_id: job.id,
            delivery_id,
            queued_at: Utc::now(),
        })
    }

    async fn set_status(
        &self,
        owner: Uuid,
        id: Uuid,
        status: JobStatus,
    ) -> AppResult<CronJobResponse> {
        let previous = self.owned_job(owner, id).await?;
        if previous.status == status {
            debug!(job_id = %id, status = %status, "Job already in requested status");
            return Ok(CronJobResponse::from_job(previous, Utc::now()));
        }

        let updated = self
            .job_repo
            .set_status(&id, status)
            .await?
            .ok_or_else(|| AppError::not_found("Cron job", id))?;
        self.reconciler.on_update(&previous, &updated).await?;

        info!(job_id = %id, from = %previous.status, to = %status, "Changed job status");
        Ok(CronJobResponse::from_job(updated, Utc::now()))
    }

    /// Load a job and check it belongs to `owner`
    async fn owned_job(&self, owner: Uuid, id: Uuid) -> AppResult<CronJob> {
        let job = self
            .job_repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::not_found("Cron job", id))?;

        if job.user_id != owner {
            return Err(AppError::forbidden("job", id));
        }
        Ok(job)
    }
}
