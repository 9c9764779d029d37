//! Job executor service for performing the actual work of a delivery

use async_trait::async_trait;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::types::{Delivery, DispatchError, DispatchSnapshot, ExecutionOutcome, TriggerPayload};
use crate::database::repositories::{CronJobSeaOrmRepository, ExecutionLogSeaOrmRepository};
use crate::models::{CronJob, ExecutionStatus, NewExecutionLog, TargetType};
use crate::utils::http_client::{DispatchHttpClient, HttpDispatchRequest};

pub const SCRIPT_DISABLED_BODY: &str = "Script execution is disabled for security reasons";
pub const SCRIPT_DISABLED_ERROR: &str = "Script execution not implemented";

/// Consumer of deliveries handed out by a `JobQueueRunner`
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn handle(&self, delivery: &Delivery) -> ExecutionOutcome;
}

/// Performs one attempt of a job firing and records terminal outcomes
pub struct JobExecutor {
    job_repo: CronJobSeaOrmRepository,
    log_repo: ExecutionLogSeaOrmRepository,
    http_client: DispatchHttpClient,
}

/// Result of one attempt before it is written to the execution log
struct AttemptResult {
    status: ExecutionStatus,
    response_code: Option<i32>,
    response_body: Option<String>,
    error_message: Option<String>,
}

impl JobExecutor {
    pub fn new(
        job_repo: CronJobSeaOrmRepository,
        log_repo: ExecutionLogSeaOrmRepository,
        http_client: DispatchHttpClient,
    ) -> Self {
        Self {
            job_repo,
            log_repo,
            http_client,
        }
    }

    /// Execute one dispatch delivery
    pub async fn execute(&self, delivery: &Delivery, snapshot: &DispatchSnapshot) -> ExecutionOutcome {
        let job_id = snapshot.job_id;
        let started_at = Utc::now();
        let clock = Instant::now();

        info!(
            job_id = %job_id,
            trigger_key = %delivery.key,
            attempt = delivery.attempts_made + 1,
            "Processing cron job"
        );

        let job = match self.job_repo.find_by_id(&job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(job_id = %job_id, trigger_key = %delivery.key, "Cron job not found, skipping");
                return ExecutionOutcome::Skipped {
                    reason: "Job not found".to_string(),
                };
            }
            Err(e) => {
                if delivery.is_last_attempt() {
                    // Terminal without an execution log; nothing to attribute it to
                    error!(job_id = %job_id, "Failed to load job on final attempt: {}", e);
                    return ExecutionOutcome::Completed;
                }
                return ExecutionOutcome::Retry {
                    reason: format!("Failed to load job: {e}"),
                };
            }
        };

        if !job.is_active() {
            warn!(job_id = %job_id, status = %job.status, "Cron job is not active, skipping");
            return ExecutionOutcome::Skipped {
                reason: "Job not active".to_string(),
            };
        }

        let terminal = Self::is_terminal(delivery, &job);
        let attempt = match job.target_type {
            TargetType::Http => match self.dispatch_http(&job).await {
                Ok(attempt) => attempt,
                Err(e) if !terminal => {
                    warn!(
                        job_id = %job_id,
                        attempts_made = delivery.attempts_made,
                        max_retries = job.max_retries,
                        "Job execution failed, will retry: {}",
                        e
                    );
                    return ExecutionOutcome::Retry {
                        reason: e.to_string(),
                    };
                }
                Err(e) => {
                    error!(job_id = %job_id, "Job execution failed: {}", e);
                    let status = match e {
                        DispatchError::Timeout { .. } => ExecutionStatus::Timeout,
                        DispatchError::Transport { .. } => ExecutionStatus::Failed,
                    };
                    AttemptResult {
                        status,
                        response_code: None,
                        response_body: None,
                        error_message: Some(e.to_string()),
                    }
                }
            },
            TargetType::Script => {
                warn!(
                    job_id = %job_id,
                    command = job.command.as_deref().unwrap_or_default(),
                    "Script execution is disabled"
                );
                AttemptResult {
                    status: ExecutionStatus::Failed,
                    response_code: None,
                    response_body: Some(SCRIPT_DISABLED_BODY.to_string()),
                    error_message: Some(SCRIPT_DISABLED_ERROR.to_string()),
                }
            }
        };

        let finished_at = Utc::now();
        let status = attempt.status;
        let response_code = attempt.response_code;
        let log = NewExecutionLog {
            job_id,
            status: attempt.status,
            response_code: attempt.response_code,
            response_body: attempt.response_body,
            error_message: attempt.error_message,
            started_at,
            finished_at,
        };

        if let Err(e) = self.log_repo.create(log).await {
            error!(job_id = %job_id, "Failed to record execution log: {}", e);
        }

        info!(
            job_id = %job_id,
            status = %status,
            status_code = response_code,
            duration_ms = clock.elapsed().as_millis() as u64,
            "Job execution completed"
        );
        ExecutionOutcome::Completed
    }

    /// Whether this attempt's failure must be recorded instead of retried
    fn is_terminal(delivery: &Delivery, job: &CronJob) -> bool {
        i64::from(delivery.attempts_made) >= i64::from(job.max_retries) || delivery.is_last_attempt()
    }

    async fn dispatch_http(&self, job: &CronJob) -> Result<AttemptResult, DispatchError> {
        let Some(url) = job.target_url.as_deref() else {
            return Err(DispatchError::Transport {
                message: "HTTP job has no target URL".to_string(),
            });
        };

        let response = self
            .http_client
            .send(HttpDispatchRequest {
                method: job.http_method,
                url,
                headers: &job.headers,
                payload: job.payload.as_ref(),
                timeout: job.timeout(),
            })
            .await?;

        debug!(job_id = %job.id, status = response.status, "Target responded");
        let status = if response.is_success() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };

        Ok(AttemptResult {
            status,
            response_code: Some(i32::from(response.status)),
            response_body: Some(response.body),
            error_message: None,
        })
    }
}

#[async_trait]
impl DeliveryHandler for JobExecutor {
    async fn handle(&self, delivery: &Delivery) -> ExecutionOutcome {
        match &delivery.payload {
            TriggerPayload::Dispatch(snapshot) => self.execute(delivery, snapshot).await,
            TriggerPayload::RetentionSweep { .. } => {
                warn!(trigger_key = %delivery.key, "Dispatch runner received a maintenance trigger");
                ExecutionOutcome::Skipped {
                    reason: "Not a dispatch trigger".to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::Database;
    use crate::models::{CronJobCreateRequest, JobStatus};
    use tracing_test::traced_test;
    use uuid::Uuid;

    async fn setup() -> (JobExecutor, CronJobSeaOrmRepository, ExecutionLogSeaOrmRepository) {
        let database = Database::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: Some(1),
        })
        .await
        .unwrap();
        database.migrate().await.unwrap();
        let jobs = CronJobSeaOrmRepository::new(database.connection());
        let logs = ExecutionLogSeaOrmRepository::new(database.connection());
        let client = DispatchHttpClient::new("cron-relay-test", 5000).unwrap();
        (JobExecutor::new(jobs.clone(), logs.clone(), client), jobs, logs)
    }

    fn script_job(user_id: Uuid) -> CronJob {
        CronJobCreateRequest {
            name: "script".to_string(),
            cron_expression: "* * * * *".to_string(),
            timezone: None,
            target_type: TargetType::Script,
            target_url: None,
            command: Some("echo hi".to_string()),
            headers: None,
            http_method: None,
            payload: None,
            retry_count: None,
            max_retries: Some(3),
            timeout_ms: None,
        }
        .into_job(user_id)
    }

    fn delivery_for(job: &CronJob, attempts_made: u32) -> Delivery {
        let snapshot = DispatchSnapshot::from_job(job);
        Delivery {
            id: Uuid::new_v4(),
            key: crate::job_scheduling::repeatable_key(job.id),
            max_attempts: snapshot.max_attempts(),
            payload: TriggerPayload::Dispatch(snapshot),
            attempts_made,
            due: Utc::now(),
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_missing_job_is_skipped() {
        let (executor, _, _) = setup().await;
        let job = script_job(Uuid::new_v4());

        let outcome = executor.handle(&delivery_for(&job, 0)).await;
        assert!(matches!(outcome, ExecutionOutcome::Skipped { .. }));
        assert!(logs_contain("Cron job not found, skipping"));
    }

    #[tokio::test]
    async fn test_paused_job_is_skipped_without_log() {
        let (executor, jobs, logs) = setup().await;
        let job = script_job(Uuid::new_v4());
        jobs.create(&job).await.unwrap();
        jobs.set_status(&job.id, JobStatus::Paused).await.unwrap();

        let outcome = executor.handle(&delivery_for(&job, 0)).await;
        assert!(matches!(outcome, ExecutionOutcome::Skipped { .. }));
        assert_eq!(logs.count_by_job(&job.id).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_script_job_records_failure_without_retry() {
        let (executor, jobs, logs) = setup().await;
        let job = script_job(Uuid::new_v4());
        jobs.create(&job).await.unwrap();

        let outcome = executor.handle(&delivery_for(&job, 0)).await;
        assert_eq!(outcome, ExecutionOutcome::Completed);

        let recent = logs.recent_by_job(&job.id, 5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].status, ExecutionStatus::Failed);
        assert_eq!(recent[0].response_body.as_deref(), Some(SCRIPT_DISABLED_BODY));
        assert_eq!(recent[0].error_message.as_deref(), Some(SCRIPT_DISABLED_ERROR));
        assert!(recent[0].response_code.is_none());
    }

    #[test]
    fn test_terminal_uses_live_retry_budget() {
        let mut job = script_job(Uuid::new_v4());
        let delivery = delivery_for(&job, 1);
        assert!(!JobExecutor::is_terminal(&delivery, &job));

        job.max_retries = 1;
        assert!(JobExecutor::is_terminal(&delivery, &job));
    }
}
