//! Trigger set congruence with the stored jobs

mod common;

use std::sync::Arc;
use uuid::Uuid;

use common::{http_job, test_database};
use cron_relay::{
    database::repositories::CronJobSeaOrmRepository,
    errors::AppError,
    job_scheduling::{
        BackoffPolicy, DispatchSnapshot, InMemoryTriggerQueue, SchedulerReconciler, TriggerPayload,
        TriggerQueue, once_key, repeatable_key,
    },
    models::JobStatus,
};

async fn setup() -> (Arc<InMemoryTriggerQueue>, SchedulerReconciler, CronJobSeaOrmRepository) {
    let database = test_database().await;
    let jobs = CronJobSeaOrmRepository::new(database.connection());
    let queue = Arc::new(InMemoryTriggerQueue::new("test", 3, BackoffPolicy::default()));
    let reconciler = SchedulerReconciler::new(queue.clone(), jobs.clone());
    (queue, reconciler, jobs)
}

#[tokio::test]
async fn active_job_gets_one_trigger_and_paused_job_none() {
    let (queue, reconciler, jobs) = setup().await;
    let job = http_job(Uuid::new_v4(), "https://example.com/hook");
    jobs.create(&job).await.unwrap();

    reconciler.on_create(&job).await.unwrap();
    reconciler.on_create(&job).await.unwrap();
    assert!(reconciler.has_trigger(job.id).await.unwrap());
    assert_eq!(queue.list_repeatable().await.unwrap().len(), 1);

    let paused = jobs.set_status(&job.id, JobStatus::Paused).await.unwrap().unwrap();
    reconciler.on_update(&job, &paused).await.unwrap();
    assert!(!reconciler.has_trigger(job.id).await.unwrap());

    let resumed = jobs.set_status(&job.id, JobStatus::Active).await.unwrap().unwrap();
    reconciler.on_update(&paused, &resumed).await.unwrap();
    assert!(reconciler.has_trigger(job.id).await.unwrap());
}

#[tokio::test]
async fn schedule_change_replaces_the_trigger_rule() {
    let (queue, reconciler, jobs) = setup().await;
    let job = http_job(Uuid::new_v4(), "https://example.com/hook");
    jobs.create(&job).await.unwrap();
    reconciler.on_create(&job).await.unwrap();

    let mut changed = job.clone();
    changed.cron_expression = "0 12 * * *".to_string();
    changed.timezone = "Europe/Berlin".to_string();
    jobs.update(&changed).await.unwrap();
    reconciler.on_update(&job, &changed).await.unwrap();

    let triggers = queue.list_repeatable().await.unwrap();
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].key, repeatable_key(job.id));
    assert_eq!(triggers[0].rule.cron_expression, "0 12 * * *");
    assert_eq!(triggers[0].rule.timezone, "Europe/Berlin");
}

#[tokio::test]
async fn invalid_schedule_is_rejected_before_touching_the_queue() {
    let (queue, reconciler, _) = setup().await;
    let mut job = http_job(Uuid::new_v4(), "https://example.com/hook");
    job.cron_expression = "61 * * * *".to_string();

    let err = reconciler.on_create(&job).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidSchedule { .. }));
    assert!(queue.list_repeatable().await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_removes_trigger_and_row() {
    let (_, reconciler, jobs) = setup().await;
    let job = http_job(Uuid::new_v4(), "https://example.com/hook");
    jobs.create(&job).await.unwrap();
    reconciler.on_create(&job).await.unwrap();

    reconciler.on_delete(&job).await.unwrap();
    assert!(!reconciler.has_trigger(job.id).await.unwrap());
    assert!(jobs.find_by_id(&job.id).await.unwrap().is_none());
}

#[tokio::test]
async fn reconcile_all_rebuilds_from_active_jobs_only() {
    let (queue, reconciler, jobs) = setup().await;
    let owner = Uuid::new_v4();

    let active = http_job(owner, "https://example.com/a");
    jobs.create(&active).await.unwrap();
    let paused = http_job(owner, "https://example.com/b");
    jobs.create(&paused).await.unwrap();
    jobs.set_status(&paused.id, JobStatus::Paused).await.unwrap();
    let mut broken = http_job(owner, "https://example.com/c");
    broken.timezone = "Mars/Olympus".to_string();
    jobs.create(&broken).await.unwrap();

    queue
        .add_repeatable(
            &repeatable_key(Uuid::new_v4()),
            TriggerPayload::RetentionSweep { days_to_keep: 1 },
            cron_relay::job_scheduling::RepeatRule::new("* * * * *", "UTC"),
        )
        .await
        .unwrap();

    let synced = reconciler.reconcile_all().await.unwrap();
    assert_eq!(synced, 1);

    let keys: Vec<String> = queue
        .list_repeatable()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.key)
        .collect();
    assert_eq!(keys, vec![repeatable_key(active.id)]);
}

#[tokio::test]
async fn reconcile_all_is_idempotent() {
    let (queue, reconciler, jobs) = setup().await;
    let owner = Uuid::new_v4();
    for url in ["https://example.com/a", "https://example.com/b"] {
        jobs.create(&http_job(owner, url)).await.unwrap();
    }

    assert_eq!(reconciler.reconcile_all().await.unwrap(), 2);
    let first: Vec<String> = queue
        .list_repeatable()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.key)
        .collect();

    assert_eq!(reconciler.reconcile_all().await.unwrap(), 2);
    let second: Vec<String> = queue
        .list_repeatable()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.key)
        .collect();
    assert_eq!(first, second);
}

#[tokio::test]
async fn run_now_enqueues_a_one_shot_delivery() {
    let (queue, reconciler, jobs) = setup().await;
    let job = http_job(Uuid::new_v4(), "https://example.com/hook");
    jobs.create(&job).await.unwrap();

    let delivery_id = reconciler.run_now(&job).await.unwrap();

    let due = queue.poll_due(chrono::Utc::now(), 10).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, delivery_id);
    assert_eq!(due[0].key, once_key(job.id));
    assert_eq!(due[0].payload.job_id(), Some(job.id));
    assert_eq!(due[0].max_attempts, 1);
}

#[tokio::test]
async fn name_only_update_keeps_the_existing_trigger() {
    let (queue, reconciler, jobs) = setup().await;
    let job = http_job(Uuid::new_v4(), "https://example.com/hook");
    jobs.create(&job).await.unwrap();
    reconciler.on_create(&job).await.unwrap();
    let before = queue.list_repeatable().await.unwrap();

    let mut renamed = job.clone();
    renamed.name = "renamed".to_string();
    jobs.update(&renamed).await.unwrap();
    reconciler.on_update(&job, &renamed).await.unwrap();

    let after = queue.list_repeatable().await.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].created_at, before[0].created_at);
    assert_eq!(after[0].next_fire, before[0].next_fire);

    let mut retargeted = renamed.clone();
    retargeted.target_url = Some("https://example.com/other".to_string());
    jobs.update(&retargeted).await.unwrap();
    reconciler.on_update(&renamed, &retargeted).await.unwrap();

    let replaced = queue.list_repeatable().await.unwrap();
    assert_eq!(replaced.len(), 1);
    assert!(replaced[0].created_at >= before[0].created_at);
    assert_eq!(
        replaced[0].payload,
        TriggerPayload::Dispatch(DispatchSnapshot::from_job(&retargeted))
    );
}
