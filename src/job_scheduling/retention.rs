//! Daily purge of old execution logs

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::job_executor::DeliveryHandler;
use super::trigger_queue::TriggerQueue;
use super::types::{
    Delivery, ExecutionOutcome, RETENTION_SWEEP_KEY, RepeatRule, RepeatableTrigger,
    TriggerPayload,
};
use crate::config::RetentionConfig;
use crate::database::repositories::ExecutionLogSeaOrmRepository;
use crate::errors::AppResult;

pub struct RetentionSweeper {
    log_repo: ExecutionLogSeaOrmRepository,
}

impl RetentionSweeper {
    pub fn new(log_repo: ExecutionLogSeaOrmRepository) -> Self {
        Self { log_repo }
    }

    /// Replace any maintenance triggers with the daily sweep
    pub async fn register(
        queue: &Arc<dyn TriggerQueue>,
        config: &RetentionConfig,
    ) -> AppResult<Option<RepeatableTrigger>> {
        let cleared = queue.clear_repeatable().await?;
        if cleared > 0 {
            info!("Removed {} existing maintenance triggers", cleared);
        }

        if !config.enabled {
            info!("Execution log retention is disabled");
            return Ok(None);
        }

        let trigger = queue
            .add_repeatable(
                RETENTION_SWEEP_KEY,
                TriggerPayload::RetentionSweep {
                    days_to_keep: config.days_to_keep,
                },
                RepeatRule::new(config.cron_expression.clone(), config.timezone.clone()),
            )
            .await?;

        info!(
            cron_expression = %config.cron_expression,
            days_to_keep = config.days_to_keep,
            next_fire = %trigger.next_fire,
            "Scheduled execution log cleanup"
        );
        Ok(Some(trigger))
    }

    /// Delete execution logs created more than `days_to_keep` days ago
    pub async fn sweep(&self, days_to_keep: u32) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_to_keep));
        info!(cutoff = %cutoff, "Starting execution log cleanup");

        let deleted = self.log_repo.delete_older_than(cutoff).await?;
        info!(deleted_count = deleted, "Cleaned up old execution logs");
        Ok(deleted)
    }
}

#[async_trait]
impl DeliveryHandler for RetentionSweeper {
    async fn handle(&self, delivery: &Delivery) -> ExecutionOutcome {
        let TriggerPayload::RetentionSweep { days_to_keep } = &delivery.payload else {
            warn!(trigger_key = %delivery.key, "Maintenance runner received a dispatch trigger");
            return ExecutionOutcome::Skipped {
                reason: "Not a maintenance trigger".to_string(),
            };
        };

        match self.sweep(*days_to_keep).await {
            Ok(_) => ExecutionOutcome::Completed,
            Err(e) => {
                error!("Cleanup job failed: {}", e);
                ExecutionOutcome::Retry {
                    reason: e.to_string(),
                }
            }
        }
    }
}
