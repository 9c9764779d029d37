//! Trigger queue: repeatable cron triggers, one-shot triggers and redelivery
//!
//! The queue hands out `Delivery` values to consumers. A delivery stays
//! in flight until the consumer either completes it or hands it back for
//! retry; retries are rescheduled with exponential backoff until the
//! delivery's attempt budget is used up.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{
    BackoffPolicy, Delivery, QueueStats, RepeatRule, RepeatableTrigger, RetryOutcome,
    TriggerPayload, TriggerQueueError,
};
use crate::utils::cron_helper::CronSchedule;

/// Delivery mechanism shared by the reconciler, the runners and the retention sweeper
#[async_trait]
pub trait TriggerQueue: Send + Sync {
    /// Register (or replace) the repeatable trigger stored under `key`
    async fn add_repeatable(
        &self,
        key: &str,
        payload: TriggerPayload,
        rule: RepeatRule,
    ) -> Result<RepeatableTrigger, TriggerQueueError>;

    /// Stop future firings of `key`; returns whether it existed
    async fn remove_repeatable(&self, key: &str) -> Result<bool, TriggerQueueError>;

    async fn list_repeatable(&self) -> Result<Vec<RepeatableTrigger>, TriggerQueueError>;

    /// Remove every repeatable trigger; returns how many were removed
    async fn clear_repeatable(&self) -> Result<usize, TriggerQueueError>;

    /// Enqueue a single immediate delivery
    async fn add_once(&self, key: &str, payload: TriggerPayload)
    -> Result<Uuid, TriggerQueueError>;

    /// Take up to `limit` deliveries due at `now`, marking them in flight
    async fn poll_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Delivery>, TriggerQueueError>;

    async fn complete(&self, delivery_id: Uuid) -> Result<(), TriggerQueueError>;

    /// Hand a failed delivery back for redelivery
    async fn retry(
        &self,
        delivery_id: Uuid,
        reason: &str,
    ) -> Result<RetryOutcome, TriggerQueueError>;

    async fn stats(&self) -> QueueStats;
}

/// Pending delivery ordered by due time, then insertion order
#[derive(Debug)]
struct QueuedDelivery {
    seq: u64,
    delivery: Delivery,
}

impl PartialEq for QueuedDelivery {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for QueuedDelivery {}

impl PartialOrd for QueuedDelivery {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedDelivery {
    fn cmp(&self, other: &Self) -> Ordering {
        self.delivery
            .due
            .cmp(&other.delivery.due)
            .then(self.seq.cmp(&other.seq))
    }
}

struct RepeatableEntry {
    trigger: RepeatableTrigger,
    schedule: CronSchedule,
}

#[derive(Default)]
struct QueueState {
    repeatables: HashMap<String, RepeatableEntry>,
    /// Min-heap of pending deliveries
    pending: BinaryHeap<Reverse<QueuedDelivery>>,
    in_flight: HashMap<Uuid, Delivery>,
    next_seq: u64,
    completed: u64,
    retried: u64,
    exhausted: u64,
}

impl QueueState {
    fn push(&mut self, delivery: Delivery) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Reverse(QueuedDelivery { seq, delivery }));
    }
}

/// Process-local trigger queue
///
/// State lives in memory only; `reconcile_all` rebuilds the repeatable set
/// from the job store at startup.
pub struct InMemoryTriggerQueue {
    name: String,
    state: Arc<RwLock<QueueState>>,
    default_attempts: u32,
    backoff: BackoffPolicy,
}

impl InMemoryTriggerQueue {
    pub fn new<S: Into<String>>(name: S, default_attempts: u32, backoff: BackoffPolicy) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(RwLock::new(QueueState::default())),
            default_attempts: default_attempts.max(1),
            backoff,
        }
    }

    fn attempts_for(&self, payload: &TriggerPayload) -> u32 {
        payload.max_attempts().unwrap_or(self.default_attempts)
    }

    fn new_delivery(&self, key: &str, payload: TriggerPayload, due: DateTime<Utc>) -> Delivery {
        Delivery {
            id: Uuid::new_v4(),
            key: key.to_string(),
            max_attempts: self.attempts_for(&payload),
            payload,
            attempts_made: 0,
            due,
        }
    }
}

#[async_trait]
impl TriggerQueue for InMemoryTriggerQueue {
    async fn add_repeatable(
        &self,
        key: &str,
        payload: TriggerPayload,
        rule: RepeatRule,
    ) -> Result<RepeatableTrigger, TriggerQueueError> {
        let schedule = CronSchedule::parse(&rule.cron_expression, &rule.timezone).map_err(|e| {
            TriggerQueueError::InvalidRule {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;

        let now = Utc::now();
        let next_fire = schedule
            .next_after(&now)
            .ok_or_else(|| TriggerQueueError::InvalidRule {
                key: key.to_string(),
                reason: "schedule has no future fire time".to_string(),
            })?;

        let trigger = RepeatableTrigger {
            key: key.to_string(),
            rule,
            payload,
            next_fire,
            created_at: now,
        };

        let mut state = self.state.write().await;
        let replaced = state
            .repeatables
            .insert(
                key.to_string(),
                RepeatableEntry {
                    trigger: trigger.clone(),
                    schedule,
                },
            )
            .is_some();

        debug!(
            queue = %self.name,
            trigger_key = %key,
            next_fire = %next_fire,
            replaced,
            "Registered repeatable trigger"
        );
        Ok(trigger)
    }

    async fn remove_repeatable(&self, key: &str) -> Result<bool, TriggerQueueError> {
        let removed = self.state.write().await.repeatables.remove(key).is_some();
        debug!(queue = %self.name, trigger_key = %key, removed, "Removed repeatable trigger");
        Ok(removed)
    }

    async fn list_repeatable(&self) -> Result<Vec<RepeatableTrigger>, TriggerQueueError> {
        let state = self.state.read().await;
        let mut triggers: Vec<RepeatableTrigger> = state
            .repeatables
            .values()
            .map(|entry| entry.trigger.clone())
            .collect();
        triggers.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(triggers)
    }

    async fn clear_repeatable(&self) -> Result<usize, TriggerQueueError> {
        let mut state = self.state.write().await;
        let count = state.repeatables.len();
        state.repeatables.clear();
        if count > 0 {
            info!(queue = %self.name, "Cleared {} repeatable triggers", count);
        }
        Ok(count)
    }

    async fn add_once(
        &self,
        key: &str,
        payload: TriggerPayload,
    ) -> Result<Uuid, TriggerQueueError> {
        let delivery = self.new_delivery(key, payload, Utc::now());
        let id = delivery.id;
        self.state.write().await.push(delivery);
        debug!(queue = %self.name, trigger_key = %key, delivery_id = %id, "Enqueued one-shot trigger");
        Ok(id)
    }

    async fn poll_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Delivery>, TriggerQueueError> {
        let mut state = self.state.write().await;

        // Materialize due repeatables; missed firings collapse into one delivery
        let mut fired = Vec::new();
        for entry in state.repeatables.values_mut() {
            if entry.trigger.next_fire > now {
                continue;
            }
            fired.push((
                entry.trigger.key.clone(),
                entry.trigger.payload.clone(),
                entry.trigger.next_fire,
            ));
            match entry.schedule.next_after(&now) {
                Some(next) => entry.trigger.next_fire = next,
                None => {
                    warn!(
                        queue = %self.name,
                        trigger_key = %entry.trigger.key,
                        "Repeatable trigger has no further fire time"
                    );
                    entry.trigger.next_fire = DateTime::<Utc>::MAX_UTC;
                }
            }
        }
        for (key, payload, due) in fired {
            let delivery = self.new_delivery(&key, payload, due);
            state.push(delivery);
        }

        let mut ready = Vec::new();
        while ready.len() < limit {
            let is_due = state
                .pending
                .peek()
                .is_some_and(|Reverse(top)| top.delivery.due <= now);
            if !is_due {
                break;
            }
            if let Some(Reverse(queued)) = state.pending.pop() {
                state
                    .in_flight
                    .insert(queued.delivery.id, queued.delivery.clone());
                ready.push(queued.delivery);
            }
        }

        if !ready.is_empty() {
            debug!(queue = %self.name, "Retrieved {} due deliveries", ready.len());
        }
        Ok(ready)
    }

    async fn complete(&self, delivery_id: Uuid) -> Result<(), TriggerQueueError> {
        let mut state = self.state.write().await;
        if state.in_flight.remove(&delivery_id).is_none() {
            return Err(TriggerQueueError::UnknownDelivery(delivery_id));
        }
        state.completed += 1;
        Ok(())
    }

    async fn retry(
        &self,
        delivery_id: Uuid,
        reason: &str,
    ) -> Result<RetryOutcome, TriggerQueueError> {
        let mut state = self.state.write().await;
        let mut delivery = state
            .in_flight
            .remove(&delivery_id)
            .ok_or(TriggerQueueError::UnknownDelivery(delivery_id))?;

        delivery.attempts_made += 1;
        let attempts_made = delivery.attempts_made;

        if attempts_made >= delivery.max_attempts {
            state.exhausted += 1;
            warn!(
                queue = %self.name,
                trigger_key = %delivery.key,
                attempts_made,
                "Delivery exhausted its attempts: {}",
                reason
            );
            return Ok(RetryOutcome::Exhausted { attempts_made });
        }

        let delay = self.backoff.delay_for(attempts_made);
        let next_attempt_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        delivery.due = next_attempt_at;
        state.retried += 1;
        state.push(delivery.clone());

        debug!(
            queue = %self.name,
            trigger_key = %delivery.key,
            attempts_made,
            delay_ms = delay.as_millis() as u64,
            "Rescheduled delivery: {}",
            reason
        );
        Ok(RetryOutcome::Rescheduled {
            attempts_made,
            next_attempt_at,
        })
    }

    async fn stats(&self) -> QueueStats {
        let state = self.state.read().await;
        QueueStats {
            repeatable: state.repeatables.len(),
            pending: state.pending.len(),
            in_flight: state.in_flight.len(),
            completed: state.completed,
            retried: state.retried,
            exhausted: state.exhausted,
        }
    }
}
