//! SeaORM-based CronJob repository implementation
//!
//! This provides a database-agnostic repository for job definitions using SeaORM.

use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{cron_jobs, prelude::CronJobs};
use crate::models::{CronJob, JobCounts, JobStatus};

/// SeaORM-based repository for CronJob operations
#[derive(Clone)]
pub struct CronJobSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl CronJobSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Insert a validated job
    pub async fn create(&self, job: &CronJob) -> Result<CronJob> {
        let active_model = cron_jobs::ActiveModel {
            id: Set(job.id),
            user_id: Set(job.user_id),
            name: Set(job.name.clone()),
            cron_expression: Set(job.cron_expression.clone()),
            timezone: Set(job.timezone.clone()),
            target_type: Set(job.target_type),
            target_url: Set(job.target_url.clone()),
            command: Set(job.command.clone()),
            headers: Set(serde_json::to_value(&job.headers)?),
            http_method: Set(job.http_method),
            payload: Set(job.payload.clone()),
            status: Set(job.status),
            retry_count: Set(job.retry_count),
            max_retries: Set(job.max_retries),
            timeout_ms: Set(job.timeout_ms),
            created_at: Set(job.created_at),
            updated_at: Set(job.updated_at),
        };

        let model = active_model.insert(&*self.connection).await?;
        Self::model_to_domain(model)
    }

    /// Find a job by ID
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<CronJob>> {
        let model = CronJobs::find_by_id(*id).one(&*self.connection).await?;
        model.map(Self::model_to_domain).transpose()
    }

    /// Page through one owner's jobs, newest first
    pub async fn find_by_user(
        &self,
        user_id: &Uuid,
        status: Option<JobStatus>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<CronJob>, u64)> {
        let mut query = CronJobs::find().filter(cron_jobs::Column::UserId.eq(*user_id));
        if let Some(status) = status {
            query = query.filter(cron_jobs::Column::Status.eq(status));
        }

        let total_count = query.clone().count(&*self.connection).await?;

        let models = query
            .order_by_desc(cron_jobs::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.connection)
            .await?;

        let jobs = models
            .into_iter()
            .map(Self::model_to_domain)
            .collect::<Result<Vec<_>>>()?;
        Ok((jobs, total_count))
    }

    /// All ACTIVE jobs across every owner
    pub async fn find_active(&self) -> Result<Vec<CronJob>> {
        CronJobs::find()
            .filter(cron_jobs::Column::Status.eq(JobStatus::Active))
            .order_by_asc(cron_jobs::Column::CreatedAt)
            .all(&*self.connection)
            .await?
            .into_iter()
            .map(Self::model_to_domain)
            .collect()
    }

    /// Overwrite every mutable column with the given job
    pub async fn update(&self, job: &CronJob) -> Result<CronJob> {
        let active_model = cron_jobs::ActiveModel {
            id: Set(job.id),
            user_id: Set(job.user_id),
            name: Set(job.name.clone()),
            cron_expression: Set(job.cron_expression.clone()),
            timezone: Set(job.timezone.clone()),
            target_type: Set(job.target_type),
            target_url: Set(job.target_url.clone()),
            command: Set(job.command.clone()),
            headers: Set(serde_json::to_value(&job.headers)?),
            http_method: Set(job.http_method),
            payload: Set(job.payload.clone()),
            status: Set(job.status),
            retry_count: Set(job.retry_count),
            max_retries: Set(job.max_retries),
            timeout_ms: Set(job.timeout_ms),
            created_at: Set(job.created_at),
            updated_at: Set(chrono::Utc::now()),
        };

        let model = active_model.update(&*self.connection).await?;
        Self::model_to_domain(model)
    }

    /// Change only the status column
    pub async fn set_status(&self, id: &Uuid, status: JobStatus) -> Result<Option<CronJob>> {
        let Some(model) = CronJobs::find_by_id(*id).one(&*self.connection).await? else {
            return Ok(None);
        };

        let mut active_model: cron_jobs::ActiveModel = model.into();
        active_model.status = Set(status);
        active_model.updated_at = Set(chrono::Utc::now());

        let model = active_model.update(&*self.connection).await?;
        Self::model_to_domain(model).map(Some)
    }

    /// Delete a job; execution logs cascade
    pub async fn delete(&self, id: &Uuid) -> Result<bool> {
        let result = CronJobs::delete_by_id(*id).exec(&*self.connection).await?;
        Ok(result.rows_affected > 0)
    }

    /// Job totals by status for one owner
    pub async fn count_by_user(&self, user_id: &Uuid) -> Result<JobCounts> {
        let base = CronJobs::find().filter(cron_jobs::Column::UserId.eq(*user_id));

        let total = base.clone().count(&*self.connection).await?;
        let active = base
            .clone()
            .filter(cron_jobs::Column::Status.eq(JobStatus::Active))
            .count(&*self.connection)
            .await?;
        let paused = base
            .filter(cron_jobs::Column::Status.eq(JobStatus::Paused))
            .count(&*self.connection)
            .await?;

        Ok(JobCounts {
            total,
            active,
            paused,
        })
    }

    /// Convert SeaORM model to domain model
    fn model_to_domain(model: cron_jobs::Model) -> Result<CronJob> {
        let headers: HashMap<String, String> = if model.headers.is_null() {
            HashMap::new()
        } else {
            serde_json::from_value(model.headers)?
        };

        Ok(CronJob {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            cron_expression: model.cron_expression,
            timezone: model.timezone,
            target_type: model.target_type,
            target_url: model.target_url,
            command: model.command,
            headers,
            http_method: model.http_method,
            payload: model.payload.filter(|p| !p.is_null()),
            status: model.status,
            retry_count: model.retry_count,
            max_retries: model.max_retries,
            timeout_ms: model.timeout_ms,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
