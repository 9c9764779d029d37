//! External API for the job scheduling system
//!
//! Owns the queues, reconciler and runners so the rest of the application
//! only deals with one handle.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use utoipa::ToSchema;

use super::job_executor::JobExecutor;
use super::job_queue_runner::JobQueueRunner;
use super::reconciler::SchedulerReconciler;
use super::retention::RetentionSweeper;
use super::trigger_queue::{InMemoryTriggerQueue, TriggerQueue};
use super::types::BackoffPolicy;
use crate::config::Config;
use crate::database::Database;
use crate::database::repositories::{CronJobSeaOrmRepository, ExecutionLogSeaOrmRepository};
use crate::errors::AppResult;
use crate::utils::http_client::DispatchHttpClient;

/// Handle to the scheduling subsystem
#[derive(Clone)]
pub struct JobSchedulingAPI {
    dispatch_queue: Arc<dyn TriggerQueue>,
    maintenance_queue: Arc<dyn TriggerQueue>,
    reconciler: Arc<SchedulerReconciler>,
    dispatch_runner: Arc<JobQueueRunner>,
    maintenance_runner: Arc<JobQueueRunner>,
    sweeper: Arc<RetentionSweeper>,
    config: Arc<Config>,
}

impl JobSchedulingAPI {
    /// Wire the subsystem together on top of an already migrated database
    pub fn new(database: &Database, config: &Config) -> Result<Self> {
        let backoff = BackoffPolicy::new(
            config.scheduler.backoff_base,
            config.scheduler.backoff_max,
        );
        let dispatch_queue: Arc<dyn TriggerQueue> = Arc::new(InMemoryTriggerQueue::new(
            "cron-jobs",
            config.scheduler.default_attempts,
            backoff,
        ));
        let maintenance_queue: Arc<dyn TriggerQueue> = Arc::new(InMemoryTriggerQueue::new(
            "maintenance",
            config.scheduler.default_attempts,
            backoff,
        ));

        let job_repo = CronJobSeaOrmRepository::new(database.connection());
        let log_repo = ExecutionLogSeaOrmRepository::new(database.connection());
        let http_client = DispatchHttpClient::new(
            &config.executor.user_agent,
            config.executor.response_body_limit,
        )?;

        let reconciler = Arc::new(SchedulerReconciler::new(
            dispatch_queue.clone(),
            job_repo.clone(),
        ));
        let executor = Arc::new(JobExecutor::new(job_repo, log_repo.clone(), http_client));
        let sweeper = Arc::new(RetentionSweeper::new(log_repo));

        let dispatch_runner = Arc::new(JobQueueRunner::for_dispatch(
            dispatch_queue.clone(),
            executor,
            &config.scheduler,
        ));
        let maintenance_runner = Arc::new(JobQueueRunner::for_maintenance(
            maintenance_queue.clone(),
            sweeper.clone(),
            &config.scheduler,
        ));

        Ok(Self {
            dispatch_queue,
            maintenance_queue,
            reconciler,
            dispatch_runner,
            maintenance_runner,
            sweeper,
            config: Arc::new(config.clone()),
        })
    }

    /// Rebuild every repeatable trigger from the stored ACTIVE jobs
    pub async fn reconcile_all(&self) -> AppResult<usize> {
        self.reconciler.reconcile_all().await
    }

    /// Register the retention sweep and spawn both runners
    pub async fn start(&self, cancellation_token: CancellationToken) -> AppResult<Vec<JoinHandle<()>>> {
        RetentionSweeper::register(&self.maintenance_queue, &self.config.retention).await?;

        let mut handles = Vec::with_capacity(2);
        for runner in [self.dispatch_runner.clone(), self.maintenance_runner.clone()] {
            let token = cancellation_token.clone();
            handles.push(tokio::spawn(async move {
                if let Err(e) = runner.run(token).await {
                    error!("Runner exited with error: {}", e);
                }
            }));
        }

        info!(
            "Job scheduling started (workers: {}, rate limit: {} per {:?})",
            self.config.scheduler.worker_concurrency,
            self.config.scheduler.rate_limit_max,
            self.config.scheduler.rate_limit_window
        );
        Ok(handles)
    }

    pub fn reconciler(&self) -> Arc<SchedulerReconciler> {
        self.reconciler.clone()
    }

    pub fn dispatch_queue(&self) -> Arc<dyn TriggerQueue> {
        self.dispatch_queue.clone()
    }

    pub fn maintenance_queue(&self) -> Arc<dyn TriggerQueue> {
        self.maintenance_queue.clone()
    }

    pub fn sweeper(&self) -> Arc<RetentionSweeper> {
        self.sweeper.clone()
    }

    /// Health check endpoint for the scheduling system
    pub async fn health(&self) -> SchedulingHealthStatus {
        let stats = self.dispatch_queue.stats().await;

        SchedulingHealthStatus {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            queue: QueueHealth {
                repeatable: stats.repeatable,
                pending: stats.pending,
                in_flight: stats.in_flight,
            },
        }
    }
}

/// Health status of the scheduling system
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchedulingHealthStatus {
    pub status: String,
    pub version: String,
    pub queue: QueueHealth,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QueueHealth {
    pub repeatable: usize,
    pub pending: usize,
    pub in_flight: usize,
}
