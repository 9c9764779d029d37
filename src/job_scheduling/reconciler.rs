//! Keeps the trigger queue's repeatable set congruent with the ACTIVE jobs

use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::trigger_queue::TriggerQueue;
use super::types::{
    DispatchSnapshot, RepeatRule, TriggerPayload, TriggerQueueError, once_key, repeatable_key,
};
use crate::database::repositories::CronJobSeaOrmRepository;
use crate::errors::{AppError, AppResult};
use crate::models::CronJob;
use crate::utils::cron_helper::CronSchedule;

pub struct SchedulerReconciler {
    queue: Arc<dyn TriggerQueue>,
    job_repo: CronJobSeaOrmRepository,
}

impl SchedulerReconciler {
    pub fn new(queue: Arc<dyn TriggerQueue>, job_repo: CronJobSeaOrmRepository) -> Self {
        Self { queue, job_repo }
    }

    /// Register the repeatable trigger of a freshly created job
    pub async fn on_create(&self, job: &CronJob) -> AppResult<()> {
        CronSchedule::parse(&job.cron_expression, &job.timezone)?;
        if job.is_active() {
            self.add_trigger(job).await?;
        }
        Ok(())
    }

    /// Replace the trigger when the schedule, dispatch snapshot or status changed;
    /// removal always precedes the add
    pub async fn on_update(&self, previous: &CronJob, current: &CronJob) -> AppResult<()> {
        CronSchedule::parse(&current.cron_expression, &current.timezone)?;

        let schedule_changed = previous.cron_expression != current.cron_expression
            || previous.timezone != current.timezone;
        let snapshot_changed =
            DispatchSnapshot::from_job(previous) != DispatchSnapshot::from_job(current);
        let status_changed = previous.status != current.status;

        if !(schedule_changed || snapshot_changed || status_changed) {
            debug!(job_id = %current.id, "Job update does not affect its trigger");
            return Ok(());
        }

        debug!(
            job_id = %current.id,
            schedule_changed,
            snapshot_changed,
            from = %previous.status,
            to = %current.status,
            "Replacing job trigger"
        );
        self.remove_trigger(current.id).await?;
        if current.is_active() {
            self.add_trigger(current).await?;
        }
        Ok(())
    }

    pub async fn on_delete(&self, job: &CronJob) -> AppResult<()> {
        self.remove_trigger(job.id).await?;
        if !self.job_repo.delete(&job.id).await? {
            warn!(job_id = %job.id, "Job row already gone during delete");
        }
        Ok(())
    }

    /// Rebuild every repeatable trigger from the ACTIVE jobs in the store.
    /// Returns the number of jobs synchronized.
    pub async fn reconcile_all(&self) -> AppResult<usize> {
        let active_jobs = self.job_repo.find_active().await?;
        let cleared = self.queue.clear_repeatable().await?;
        debug!("Cleared {} repeatable triggers before resync", cleared);

        let mut synced = 0;
        for job in &active_jobs {
            match self.add_trigger(job).await {
                Ok(()) => synced += 1,
                Err(AppError::Queue(TriggerQueueError::InvalidRule { reason, .. })) => {
                    warn!(
                        job_id = %job.id,
                        cron_expression = %job.cron_expression,
                        "Skipping job with unusable schedule: {}",
                        reason
                    );
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Synchronized {} of {} active jobs with the trigger queue",
            synced,
            active_jobs.len()
        );
        Ok(synced)
    }

    /// Enqueue a one-shot delivery that bypasses the schedule
    pub async fn run_now(&self, job: &CronJob) -> AppResult<Uuid> {
        let key = once_key(job.id);
        let delivery_id = self
            .queue
            .add_once(&key, TriggerPayload::Dispatch(DispatchSnapshot::from_job(job)))
            .await?;
        info!(job_id = %job.id, trigger_key = %key, "Queued immediate run");
        Ok(delivery_id)
    }

    /// Whether the job currently owns a repeatable trigger
    pub async fn has_trigger(&self, job_id: Uuid) -> AppResult<bool> {
        let key = repeatable_key(job_id);
        Ok(self
            .queue
            .list_repeatable()
            .await?
            .iter()
            .any(|trigger| trigger.key == key))
    }

    async fn add_trigger(&self, job: &CronJob) -> AppResult<()> {
        let key = repeatable_key(job.id);
        let trigger = self
            .queue
            .add_repeatable(
                &key,
                TriggerPayload::Dispatch(DispatchSnapshot::from_job(job)),
                RepeatRule::new(job.cron_expression.clone(), job.timezone.clone()),
            )
            .await?;
        debug!(
            job_id = %job.id,
            trigger_key = %key,
            next_fire = %trigger.next_fire,
            "Scheduled job"
        );
        Ok(())
    }

    async fn remove_trigger(&self, job_id: Uuid) -> AppResult<bool> {
        let key = repeatable_key(job_id);
        let removed = self.queue.remove_repeatable(&key).await?;
        if removed {
            debug!(job_id = %job_id, trigger_key = %key, "Unscheduled job");
        }
        Ok(removed)
    }
}
