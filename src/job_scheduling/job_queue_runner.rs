//! Job queue runner service for executing due deliveries

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{Duration, Instant, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::job_executor::DeliveryHandler;
use super::trigger_queue::TriggerQueue;
use super::types::{Delivery, ExecutionOutcome, RetryOutcome};
use crate::config::SchedulerConfig;
use crate::utils::rate_limiter::RateLimiter;

/// Service responsible for pulling deliveries off a queue and running them
pub struct JobQueueRunner {
    name: String,
    queue: Arc<dyn TriggerQueue>,
    handler: Arc<dyn DeliveryHandler>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    rate_limiter: Mutex<RateLimiter>,
    poll_interval: Duration,
    shutdown_grace_period: Duration,
}

impl JobQueueRunner {
    pub fn new<S: Into<String>>(
        name: S,
        queue: Arc<dyn TriggerQueue>,
        handler: Arc<dyn DeliveryHandler>,
        max_concurrent: usize,
        rate_limiter: RateLimiter,
        poll_interval: Duration,
        shutdown_grace_period: Duration,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            name: name.into(),
            queue,
            handler,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            rate_limiter: Mutex::new(rate_limiter),
            poll_interval,
            shutdown_grace_period,
        }
    }

    /// Dispatch runner configured from the scheduler section
    pub fn for_dispatch(
        queue: Arc<dyn TriggerQueue>,
        handler: Arc<dyn DeliveryHandler>,
        config: &SchedulerConfig,
    ) -> Self {
        Self::new(
            "dispatch",
            queue,
            handler,
            config.worker_concurrency,
            RateLimiter::new(config.rate_limit_max, config.rate_limit_window),
            config.poll_interval,
            config.shutdown_grace_period,
        )
    }

    /// Single-worker runner without a rate ceiling
    pub fn for_maintenance(
        queue: Arc<dyn TriggerQueue>,
        handler: Arc<dyn DeliveryHandler>,
        config: &SchedulerConfig,
    ) -> Self {
        Self::new(
            "maintenance",
            queue,
            handler,
            1,
            RateLimiter::unlimited(),
            config.poll_interval,
            config.shutdown_grace_period,
        )
    }

    /// Run until cancelled, then drain in-flight work
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        info!(
            "Starting {} runner (max concurrent: {})",
            self.name, self.max_concurrent
        );
        let mut poll_check = interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = poll_check.tick() => {
                    if let Err(e) = self.process_due_deliveries().await {
                        error!("Error processing due deliveries on {} runner: {}", self.name, e);
                    }
                }
                _ = cancellation_token.cancelled() => {
                    info!("{} runner received cancellation signal", self.name);
                    self.wait_for_running_jobs_to_complete().await;
                    break;
                }
            }
        }

        info!("{} runner stopped", self.name);
        Ok(())
    }

    /// Deliveries currently being executed
    pub fn running_count(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    /// Take as many due deliveries as free permits and the rate window allow
    pub async fn process_due_deliveries(&self) -> Result<usize> {
        let free_slots = self.permits.available_permits();
        if free_slots == 0 {
            debug!("At maximum concurrent jobs ({}), waiting", self.max_concurrent);
            return Ok(0);
        }

        let allowed = self.rate_limiter.lock().await.available(Instant::now());
        if allowed == 0 {
            debug!("{} runner rate limit reached, waiting", self.name);
            return Ok(0);
        }

        let deliveries = self
            .queue
            .poll_due(Utc::now(), free_slots.min(allowed))
            .await?;
        let started = deliveries.len();

        for delivery in deliveries {
            let permit = self.permits.clone().acquire_owned().await?;
            self.rate_limiter.lock().await.record(Instant::now());

            let queue = self.queue.clone();
            let handler = self.handler.clone();
            tokio::spawn(async move {
                let started_at = std::time::Instant::now();
                let outcome = handler.handle(&delivery).await;
                Self::settle(queue.as_ref(), &delivery, outcome).await;
                debug!(
                    trigger_key = %delivery.key,
                    duration_ms = started_at.elapsed().as_millis() as u64,
                    "Delivery finished"
                );
                drop(permit);
            });
        }

        Ok(started)
    }

    /// Report the handler's outcome back to the queue
    async fn settle(queue: &dyn TriggerQueue, delivery: &Delivery, outcome: ExecutionOutcome) {
        let result = match outcome {
            ExecutionOutcome::Completed => queue.complete(delivery.id).await,
            ExecutionOutcome::Skipped { reason } => {
                debug!(trigger_key = %delivery.key, "Delivery skipped: {}", reason);
                queue.complete(delivery.id).await
            }
            ExecutionOutcome::Retry { reason } => match queue.retry(delivery.id, &reason).await {
                Ok(RetryOutcome::Rescheduled {
                    attempts_made,
                    next_attempt_at,
                }) => {
                    info!(
                        trigger_key = %delivery.key,
                        attempts_made,
                        next_attempt_at = %next_attempt_at,
                        "Delivery scheduled for retry"
                    );
                    Ok(())
                }
                Ok(RetryOutcome::Exhausted { attempts_made }) => {
                    error!(
                        trigger_key = %delivery.key,
                        attempts_made,
                        "Job failed: {}",
                        reason
                    );
                    Ok(())
                }
                Err(e) => Err(e),
            },
        };

        if let Err(e) = result {
            error!(trigger_key = %delivery.key, "Failed to settle delivery: {}", e);
        }
    }

    /// Wait for all running deliveries to complete during shutdown
    async fn wait_for_running_jobs_to_complete(&self) {
        info!("Waiting for running jobs to complete...");

        let mut check_interval = interval(Duration::from_millis(500));
        let start_time = Instant::now();

        loop {
            let running_count = self.running_count();

            if running_count == 0 {
                info!("All jobs completed successfully");
                break;
            }

            if start_time.elapsed() > self.shutdown_grace_period {
                warn!(
                    "Timeout waiting for {} jobs to complete, proceeding with shutdown",
                    running_count
                );
                break;
            }

            debug!("Still waiting for {} jobs to complete...", running_count);
            check_interval.tick().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_scheduling::trigger_queue::InMemoryTriggerQueue;
    use crate::job_scheduling::types::{BackoffPolicy, TriggerPayload};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: AtomicUsize,
        outcome: ExecutionOutcome,
        hold: Duration,
    }

    #[async_trait]
    impl DeliveryHandler for CountingHandler {
        async fn handle(&self, _delivery: &Delivery) -> ExecutionOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.hold).await;
            self.outcome.clone()
        }
    }

    fn handler(outcome: ExecutionOutcome, hold: Duration) -> Arc<CountingHandler> {
        Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
            outcome,
            hold,
        })
    }

    fn queue() -> Arc<InMemoryTriggerQueue> {
        Arc::new(InMemoryTriggerQueue::new(
            "test",
            3,
            BackoffPolicy::new(Duration::from_secs(60), Duration::from_secs(60)),
        ))
    }

    async fn enqueue(queue: &InMemoryTriggerQueue, count: usize) {
        for i in 0..count {
            queue
                .add_once(
                    &format!("once-{i}"),
                    TriggerPayload::RetentionSweep { days_to_keep: 30 },
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_concurrency_caps_deliveries_per_poll() {
        let queue = queue();
        enqueue(&queue, 5).await;
        let counting = handler(ExecutionOutcome::Completed, Duration::from_millis(200));
        let runner = JobQueueRunner::new(
            "test",
            queue.clone(),
            counting.clone(),
            2,
            RateLimiter::unlimited(),
            Duration::from_millis(10),
            Duration::from_secs(1),
        );

        assert_eq!(runner.process_due_deliveries().await.unwrap(), 2);
        assert_eq!(runner.running_count(), 2);
        assert_eq!(runner.process_due_deliveries().await.unwrap(), 0);
        assert_eq!(queue.stats().await.pending, 3);
    }

    #[tokio::test]
    async fn test_rate_limit_caps_starts() {
        let queue = queue();
        enqueue(&queue, 5).await;
        let counting = handler(ExecutionOutcome::Completed, Duration::ZERO);
        let runner = JobQueueRunner::new(
            "test",
            queue.clone(),
            counting.clone(),
            10,
            RateLimiter::new(3, Duration::from_secs(60)),
            Duration::from_millis(10),
            Duration::from_secs(1),
        );

        assert_eq!(runner.process_due_deliveries().await.unwrap(), 3);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runner.process_due_deliveries().await.unwrap(), 0);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 3);
        assert_eq!(queue.stats().await.completed, 3);
    }

    #[tokio::test]
    async fn test_retry_outcome_reschedules() {
        let queue = queue();
        enqueue(&queue, 1).await;
        let counting = handler(
            ExecutionOutcome::Retry {
                reason: "boom".to_string(),
            },
            Duration::ZERO,
        );
        let runner = JobQueueRunner::new(
            "test",
            queue.clone(),
            counting,
            1,
            RateLimiter::unlimited(),
            Duration::from_millis(10),
            Duration::from_secs(1),
        );

        runner.process_due_deliveries().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stats = queue.stats().await;
        assert_eq!(stats.retried, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_shutdown_gives_up_after_grace_period() {
        let queue = queue();
        enqueue(&queue, 1).await;
        let counting = handler(ExecutionOutcome::Completed, Duration::from_secs(30));
        let runner = Arc::new(JobQueueRunner::new(
            "test",
            queue.clone(),
            counting,
            1,
            RateLimiter::unlimited(),
            Duration::from_millis(10),
            Duration::from_millis(300),
        ));

        runner.process_due_deliveries().await.unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let started = Instant::now();
        runner.run(token).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(runner.running_count(), 1);
    }
}
