//! Execution log queries and statistics

use uuid::Uuid;

use crate::database::repositories::{CronJobSeaOrmRepository, ExecutionLogSeaOrmRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{
    CronJob, ExecutionCounts, ExecutionListQuery, ExecutionLog, ExecutionWithJob, JobStatistics,
    PageRequest, PaginatedResponse, UserStatistics, success_rate,
};

const RECENT_JOB_EXECUTIONS: u64 = 5;
const RECENT_USER_EXECUTIONS: u64 = 10;

#[derive(Clone)]
pub struct ExecutionLogService {
    job_repo: CronJobSeaOrmRepository,
    log_repo: ExecutionLogSeaOrmRepository,
}

impl ExecutionLogService {
    pub fn new(job_repo: CronJobSeaOrmRepository, log_repo: ExecutionLogSeaOrmRepository) -> Self {
        Self { job_repo, log_repo }
    }

    /// Attempts of one job, most recent first
    pub async fn list_executions(
        &self,
        owner: Uuid,
        job_id: Uuid,
        query: ExecutionListQuery,
        page: PageRequest,
    ) -> AppResult<PaginatedResponse<ExecutionLog>> {
        self.owned_job(owner, job_id).await?;

        let (items, total) = self
            .log_repo
            .find_by_job(&job_id, query.status, page.offset(), page.limit)
            .await?;
        Ok(PaginatedResponse::new(items, total, page))
    }

    /// Attempts across every job the owner has
    pub async fn list_user_executions(
        &self,
        owner: Uuid,
        query: ExecutionListQuery,
        page: PageRequest,
    ) -> AppResult<PaginatedResponse<ExecutionWithJob>> {
        let (items, total) = self
            .log_repo
            .find_by_user(&owner, query.status, page.offset(), page.limit)
            .await?;
        Ok(PaginatedResponse::new(items, total, page))
    }

    pub async fn get_execution_by_id(&self, owner: Uuid, id: Uuid) -> AppResult<ExecutionLog> {
        let log = self
            .log_repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::not_found("Execution log", id))?;

        let job = self
            .job_repo
            .find_by_id(&log.job_id)
            .await?
            .ok_or_else(|| AppError::not_found("Execution log", id))?;
        if job.user_id != owner {
            return Err(AppError::forbidden("log", id));
        }
        Ok(log)
    }

    pub async fn get_job_statistics(&self, owner: Uuid, job_id: Uuid) -> AppResult<JobStatistics> {
        self.owned_job(owner, job_id).await?;

        let counts = self.log_repo.count_by_job(&job_id).await?;
        let average_duration_ms = self.log_repo.average_duration_by_job(&job_id).await?;
        let recent_executions = self
            .log_repo
            .recent_by_job(&job_id, RECENT_JOB_EXECUTIONS)
            .await?;

        Ok(JobStatistics {
            job_id,
            total_executions: counts.total,
            success_count: counts.success,
            failed_count: counts.failed,
            timeout_count: counts.timeout,
            success_rate: success_rate(counts.success, counts.total),
            average_duration_ms,
            recent_executions,
        })
    }

    pub async fn get_user_statistics(&self, owner: Uuid) -> AppResult<UserStatistics> {
        let jobs = self.job_repo.count_by_user(&owner).await?;
        let counts = self.log_repo.count_by_user(&owner).await?;
        let recent_executions = self
            .log_repo
            .recent_by_user(&owner, RECENT_USER_EXECUTIONS)
            .await?;

        Ok(UserStatistics {
            jobs,
            executions: ExecutionCounts {
                total: counts.total,
                successful: counts.success,
                failed: counts.failed,
                success_rate: success_rate(counts.success, counts.total),
            },
            recent_executions,
        })
    }

    async fn owned_job(&self, owner: Uuid, job_id: Uuid) -> AppResult<CronJob> {
        let job = self
            .job_repo
            .find_by_id(&job_id)
            .await?
            .ok_or_else(|| AppError::not_found("Cron job", job_id))?;

        if job.user_id != owner {
            return Err(AppError::forbidden("job", job_id));
        }
        Ok(job)
    }
}
