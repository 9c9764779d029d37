//! SeaORM-based ExecutionLog repository implementation
//!
//! Execution logs are append-only: rows are inserted once finished and only
//! ever removed by the retention sweep or by cascade from their job.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Select, Set,
    sea_query::{Alias, Expr, Func, SimpleExpr},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{
    cron_jobs, execution_logs,
    prelude::{CronJobs, ExecutionLogs},
};
use crate::models::{ExecutionLog, ExecutionStatus, ExecutionWithJob, NewExecutionLog};

/// Per-status attempt totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub timeout: u64,
}

/// SeaORM-based repository for ExecutionLog operations
#[derive(Clone)]
pub struct ExecutionLogSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl ExecutionLogSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Append a finished attempt
    pub async fn create(&self, log: NewExecutionLog) -> Result<ExecutionLog> {
        let duration_ms = log.duration_ms();
        let active_model = execution_logs::ActiveModel {
            id: Set(Uuid::new_v4()),
            job_id: Set(log.job_id),
            status: Set(log.status),
            response_code: Set(log.response_code),
            response_body: Set(log.response_body),
            error_message: Set(log.error_message),
            started_at: Set(log.started_at),
            finished_at: Set(Some(log.finished_at)),
            duration_ms: Set(Some(duration_ms)),
            created_at: Set(log.finished_at),
        };

        let model = active_model.insert(&*self.connection).await?;
        Ok(Self::model_to_domain(model))
    }

    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<ExecutionLog>> {
        let model = ExecutionLogs::find_by_id(*id)
            .one(&*self.connection)
            .await?;
        Ok(model.map(Self::model_to_domain))
    }

    /// Page through one job's attempts, most recent start first
    pub async fn find_by_job(
        &self,
        job_id: &Uuid,
        status: Option<ExecutionStatus>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<ExecutionLog>, u64)> {
        let mut query =
            ExecutionLogs::find().filter(execution_logs::Column::JobId.eq(*job_id));
        if let Some(status) = status {
            query = query.filter(execution_logs::Column::Status.eq(status));
        }

        let total_count = query.clone().count(&*self.connection).await?;
        let models = query
            .order_by_desc(execution_logs::Column::StartedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.connection)
            .await?;

        Ok((
            models.into_iter().map(Self::model_to_domain).collect(),
            total_count,
        ))
    }

    /// Page through attempts across every job one owner has
    pub async fn find_by_user(
        &self,
        user_id: &Uuid,
        status: Option<ExecutionStatus>,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<ExecutionWithJob>, u64)> {
        let mut query = Self::owned_by(user_id);
        if let Some(status) = status {
            query = query.filter(execution_logs::Column::Status.eq(status));
        }

        let total_count = query.clone().count(&*self.connection).await?;
        let rows = query
            .order_by_desc(execution_logs::Column::StartedAt)
            .limit(limit)
            .offset(offset)
            .all(&*self.connection)
            .await?;

        let items = self.attach_job_names(rows).await?;
        Ok((items, total_count))
    }

    pub async fn recent_by_job(&self, job_id: &Uuid, limit: u64) -> Result<Vec<ExecutionLog>> {
        let (items, _) = self.find_by_job(job_id, None, 0, limit).await?;
        Ok(items)
    }

    pub async fn recent_by_user(&self, user_id: &Uuid, limit: u64) -> Result<Vec<ExecutionWithJob>> {
        let (items, _) = self.find_by_user(user_id, None, 0, limit).await?;
        Ok(items)
    }

    pub async fn count_by_job(&self, job_id: &Uuid) -> Result<StatusCounts> {
        let base = ExecutionLogs::find().filter(execution_logs::Column::JobId.eq(*job_id));
        self.count_statuses(base).await
    }

    pub async fn count_by_user(&self, user_id: &Uuid) -> Result<StatusCounts> {
        self.count_statuses(Self::owned_by(user_id)).await
    }

    /// Mean duration over attempts that recorded one, rounded to whole milliseconds
    pub async fn average_duration_by_job(&self, job_id: &Uuid) -> Result<Option<i64>> {
        // AVG over an integer column is NUMERIC on Postgres; cast so every backend decodes to f64
        let float_type = match self.connection.get_database_backend() {
            DatabaseBackend::Postgres => "DOUBLE PRECISION",
            DatabaseBackend::MySql => "DOUBLE",
            DatabaseBackend::Sqlite => "REAL",
        };
        let average = SimpleExpr::from(Func::cast_as(
            Func::avg(Expr::col(execution_logs::Column::DurationMs)),
            Alias::new(float_type),
        ));

        let mean: Option<Option<f64>> = ExecutionLogs::find()
            .select_only()
            .column_as(average, "average_duration_ms")
            .filter(execution_logs::Column::JobId.eq(*job_id))
            .filter(execution_logs::Column::DurationMs.is_not_null())
            .into_tuple()
            .one(&*self.connection)
            .await?;

        Ok(mean.flatten().map(|mean| mean.round() as i64))
    }

    /// Remove every attempt created before `cutoff`
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = ExecutionLogs::delete_many()
            .filter(execution_logs::Column::CreatedAt.lt(cutoff))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }

    fn owned_by(user_id: &Uuid) -> Select<ExecutionLogs> {
        ExecutionLogs::find()
            .join(JoinType::InnerJoin, execution_logs::Relation::CronJobs.def())
            .filter(cron_jobs::Column::UserId.eq(*user_id))
    }

    async fn count_statuses(&self, base: Select<ExecutionLogs>) -> Result<StatusCounts> {
        let total = base.clone().count(&*self.connection).await?;
        let mut counts = StatusCounts {
            total,
            ..Default::default()
        };
        for (status, slot) in [
            (ExecutionStatus::Success, &mut counts.success),
            (ExecutionStatus::Failed, &mut counts.failed),
            (ExecutionStatus::Timeout, &mut counts.timeout),
        ] {
            *slot = base
                .clone()
                .filter(execution_logs::Column::Status.eq(status))
                .count(&*self.connection)
                .await?;
        }
        Ok(counts)
    }

    async fn attach_job_names(
        &self,
        rows: Vec<execution_logs::Model>,
    ) -> Result<Vec<ExecutionWithJob>> {
        let mut job_ids: Vec<Uuid> = rows.iter().map(|r| r.job_id).collect();
        job_ids.sort_unstable();
        job_ids.dedup();

        let names: std::collections::HashMap<Uuid, String> = if job_ids.is_empty() {
            Default::default()
        } else {
            CronJobs::find()
                .filter(cron_jobs::Column::Id.is_in(job_ids))
                .all(&*self.connection)
                .await?
                .into_iter()
                .map(|job| (job.id, job.name))
                .collect()
        };

        Ok(rows
            .into_iter()
            .map(|row| {
                let job_name = names.get(&row.job_id).cloned().unwrap_or_default();
                ExecutionWithJob {
                    execution: Self::model_to_domain(row),
                    job_name,
                }
            })
            .collect())
    }

    /// Convert SeaORM model to domain model
    fn model_to_domain(model: execution_logs::Model) -> ExecutionLog {
        ExecutionLog {
            id: model.id,
            job_id: model.job_id,
            status: model.status,
            response_code: model.response_code,
            response_body: model.response_body,
            error_message: model.error_message,
            started_at: model.started_at,
            finished_at: model.finished_at,
            duration_ms: model.duration_ms,
            created_at: model.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::Database;
    use crate::database::repositories::CronJobSeaOrmRepository;
    use crate::models::{CronJobCreateRequest, TargetType};

    async fn setup() -> (CronJobSeaOrmRepository, ExecutionLogSeaOrmRepository) {
        let database = Database::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: Some(1),
        })
        .await
        .unwrap();
        database.migrate().await.unwrap();
        (
            CronJobSeaOrmRepository::new(database.connection()),
            ExecutionLogSeaOrmRepository::new(database.connection()),
        )
    }

    async fn seed_job(jobs: &CronJobSeaOrmRepository, user_id: Uuid, name: &str) -> Uuid {
        let job = CronJobCreateRequest {
            name: name.to_string(),
            cron_expression: "* * * * *".to_string(),
            timezone: None,
            target_type: TargetType::Http,
            target_url: Some("http://localhost/hook".to_string()),
            command: None,
            headers: None,
            http_method: None,
            payload: None,
            retry_count: None,
            max_retries: None,
            timeout_ms: None,
        }
        .into_job(user_id);
        jobs.create(&job).await.unwrap().id
    }

    fn attempt(job_id: Uuid, status: ExecutionStatus, finished: DateTime<Utc>, ms: i64) -> NewExecutionLog {
        NewExecutionLog {
            job_id,
            status,
            response_code: Some(200),
            response_body: None,
            error_message: None,
            started_at: finished - chrono::Duration::milliseconds(ms),
            finished_at: finished,
        }
    }

    #[tokio::test]
    async fn test_counts_and_average() {
        let (jobs, logs) = setup().await;
        let job_id = seed_job(&jobs, Uuid::new_v4(), "stats").await;
        let now = Utc::now();

        logs.create(attempt(job_id, ExecutionStatus::Success, now, 100)).await.unwrap();
        logs.create(attempt(job_id, ExecutionStatus::Success, now, 201)).await.unwrap();
        logs.create(attempt(job_id, ExecutionStatus::Failed, now, 300)).await.unwrap();

        let counts = logs.count_by_job(&job_id).await.unwrap();
        assert_eq!(
            counts,
            StatusCounts {
                total: 3,
                success: 2,
                failed: 1,
                timeout: 0
            }
        );
        assert_eq!(logs.average_duration_by_job(&job_id).await.unwrap(), Some(200));
        assert_eq!(logs.average_duration_by_job(&Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_average_is_aggregated_and_rounded() {
        let (jobs, logs) = setup().await;
        let job_id = seed_job(&jobs, Uuid::new_v4(), "rounding").await;
        let other = seed_job(&jobs, Uuid::new_v4(), "other").await;
        let now = Utc::now();

        logs.create(attempt(job_id, ExecutionStatus::Success, now, 100)).await.unwrap();
        logs.create(attempt(job_id, ExecutionStatus::Timeout, now, 201)).await.unwrap();
        logs.create(attempt(other, ExecutionStatus::Success, now, 9_000)).await.unwrap();

        assert_eq!(logs.average_duration_by_job(&job_id).await.unwrap(), Some(151));
        assert_eq!(logs.average_duration_by_job(&other).await.unwrap(), Some(9_000));
    }

    #[tokio::test]
    async fn test_user_scope_and_job_names() {
        let (jobs, logs) = setup().await;
        let owner = Uuid::new_v4();
        let mine = seed_job(&jobs, owner, "mine").await;
        let theirs = seed_job(&jobs, Uuid::new_v4(), "theirs").await;
        let now = Utc::now();

        logs.create(attempt(mine, ExecutionStatus::Success, now, 10)).await.unwrap();
        logs.create(attempt(theirs, ExecutionStatus::Success, now, 10)).await.unwrap();

        let (items, total) = logs.find_by_user(&owner, None, 0, 10).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].job_name, "mine");
        assert_eq!(logs.count_by_user(&owner).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_delete_older_than_and_cascade() {
        let (jobs, logs) = setup().await;
        let job_id = seed_job(&jobs, Uuid::new_v4(), "old").await;
        let now = Utc::now();

        logs.create(attempt(job_id, ExecutionStatus::Success, now - chrono::Duration::days(40), 5))
            .await
            .unwrap();
        logs.create(attempt(job_id, ExecutionStatus::Success, now - chrono::Duration::days(10), 5))
            .await
            .unwrap();

        let deleted = logs
            .delete_older_than(now - chrono::Duration::days(30))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(logs.count_by_job(&job_id).await.unwrap().total, 1);

        jobs.delete(&job_id).await.unwrap();
        assert_eq!(logs.count_by_job(&job_id).await.unwrap().total, 0);
    }
}
