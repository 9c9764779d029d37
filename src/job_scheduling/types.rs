//! Job scheduling type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::cron_job::{CronJob, HttpMethod, TargetType};

/// Key of the maintenance trigger that purges old execution logs
pub const RETENTION_SWEEP_KEY: &str = "daily-cleanup";

/// Stable key of the repeatable trigger owned by a job
pub fn repeatable_key(job_id: Uuid) -> String {
    format!("cron-{job_id}")
}

/// Key of a one-shot "run now" trigger for a job
pub fn once_key(job_id: Uuid) -> String {
    format!("immediate-{job_id}")
}

/// Dispatch parameters captured when a trigger is enqueued.
///
/// The snapshot may go stale relative to the job row; the executor re-reads
/// the row before dispatching and only uses the snapshot to locate the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSnapshot {
    pub job_id: Uuid,
    pub target_type: TargetType,
    pub target_url: Option<String>,
    pub command: Option<String>,
    pub http_method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub payload: Option<serde_json::Value>,
    pub timeout_ms: i32,
    pub max_retries: i32,
}

impl DispatchSnapshot {
    pub fn from_job(job: &CronJob) -> Self {
        Self {
            job_id: job.id,
            target_type: job.target_type,
            target_url: job.target_url.clone(),
            command: job.command.clone(),
            http_method: job.http_method,
            headers: job.headers.clone(),
            payload: job.payload.clone(),
            timeout_ms: job.timeout_ms,
            max_retries: job.max_retries,
        }
    }

    /// One initial attempt plus the retry budget
    pub fn max_attempts(&self) -> u32 {
        u32::try_from(self.max_retries).unwrap_or(0) + 1
    }
}

/// Work carried by a trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TriggerPayload {
    /// Fire one job
    Dispatch(DispatchSnapshot),
    /// Purge execution logs older than the retention window
    RetentionSweep { days_to_keep: u32 },
}

impl TriggerPayload {
    /// Attempt budget carried by the payload itself, if any
    pub fn max_attempts(&self) -> Option<u32> {
        match self {
            TriggerPayload::Dispatch(snapshot) => Some(snapshot.max_attempts()),
            TriggerPayload::RetentionSweep { .. } => None,
        }
    }

    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            TriggerPayload::Dispatch(snapshot) => Some(snapshot.job_id),
            TriggerPayload::RetentionSweep { .. } => None,
        }
    }
}

/// Cron rule a repeatable trigger fires on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatRule {
    pub cron_expression: String,
    pub timezone: String,
}

impl RepeatRule {
    pub fn new<E: Into<String>, T: Into<String>>(cron_expression: E, timezone: T) -> Self {
        Self {
            cron_expression: cron_expression.into(),
            timezone: timezone.into(),
        }
    }
}

/// A registered repeatable trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatableTrigger {
    pub key: String,
    pub rule: RepeatRule,
    pub payload: TriggerPayload,
    /// Next instant this trigger produces a delivery
    pub next_fire: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One firing handed to a consumer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    /// Key of the trigger that produced this delivery
    pub key: String,
    pub payload: TriggerPayload,
    /// Failed attempts so far; 0 on the first delivery
    pub attempts_made: u32,
    pub max_attempts: u32,
    pub due: DateTime<Utc>,
}

impl Delivery {
    pub fn is_last_attempt(&self) -> bool {
        self.attempts_made + 1 >= self.max_attempts
    }
}

/// Result of handing a failed delivery back to the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Redelivery scheduled
    Rescheduled {
        attempts_made: u32,
        next_attempt_at: DateTime<Utc>,
    },
    /// Attempt budget used up; the delivery was dropped
    Exhausted { attempts_made: u32 },
}

/// Queue counters for health reporting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub repeatable: usize,
    pub pending: usize,
    pub in_flight: usize,
    pub completed: u64,
    pub retried: u64,
    pub exhausted: u64,
}

/// Trigger queue faults
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriggerQueueError {
    #[error("Invalid repeat rule for trigger '{key}': {reason}")]
    InvalidRule { key: String, reason: String },

    #[error("Unknown delivery: {0}")]
    UnknownDelivery(Uuid),

    #[error("Trigger queue unavailable: {0}")]
    Unavailable(String),
}

/// Failures while performing one dispatch. Never leaves the executor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("{message}")]
    Transport { message: String },
}

/// What the runner should do with a delivery after the executor is done
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Attempt finished and was recorded (success or terminal failure)
    Completed,
    /// Transient failure with budget left; hand back to the queue
    Retry { reason: String },
    /// Stale trigger; nothing dispatched, nothing recorded
    Skipped { reason: String },
}

/// Exponential backoff between redeliveries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before the redelivery that follows `attempts_made` failures
    pub fn delay_for(&self, attempts_made: u32) -> Duration {
        let exponent = attempts_made.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(crate::config::defaults::DEFAULT_BACKOFF_BASE_MS),
            max: Duration::from_secs(crate::config::defaults::DEFAULT_BACKOFF_MAX_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = BackoffPolicy::new(Duration::from_secs(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for(40), Duration::from_secs(10));
    }

    #[test]
    fn test_trigger_keys() {
        let id = Uuid::nil();
        assert_eq!(
            repeatable_key(id),
            "cron-00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            once_key(id),
            "immediate-00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_last_attempt() {
        let delivery = Delivery {
            id: Uuid::new_v4(),
            key: "k".to_string(),
            payload: TriggerPayload::RetentionSweep { days_to_keep: 30 },
            attempts_made: 2,
            max_attempts: 3,
            due: Utc::now(),
        };
        assert!(delivery.is_last_attempt());
    }
}
