//! Queue, runner and executor wired together the way the service runs them

mod common;

use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use common::{TargetServer, http_job, test_database, wait_until};
use cron_relay::{
    database::repositories::{CronJobSeaOrmRepository, ExecutionLogSeaOrmRepository},
    job_scheduling::{
        BackoffPolicy, InMemoryTriggerQueue, JobExecutor, JobQueueRunner, SchedulerReconciler,
        TriggerQueue,
    },
    models::ExecutionStatus,
    utils::{DispatchHttpClient, RateLimiter},
};

#[tokio::test]
async fn timed_out_job_is_attempted_once_per_retry_and_logged_once() {
    let target = TargetServer::start().await;
    let database = test_database().await;
    let jobs = CronJobSeaOrmRepository::new(database.connection());
    let logs = ExecutionLogSeaOrmRepository::new(database.connection());

    let queue = Arc::new(InMemoryTriggerQueue::new(
        "dispatch",
        3,
        BackoffPolicy::new(Duration::from_millis(50), Duration::from_millis(200)),
    ));
    let executor = JobExecutor::new(
        jobs.clone(),
        logs.clone(),
        DispatchHttpClient::new("cron-relay-test", 5000).unwrap(),
    );
    let runner = JobQueueRunner::new(
        "dispatch",
        queue.clone(),
        Arc::new(executor),
        4,
        RateLimiter::unlimited(),
        Duration::from_millis(20),
        Duration::from_secs(2),
    );
    let reconciler = SchedulerReconciler::new(queue.clone(), jobs.clone());

    let mut job = http_job(Uuid::new_v4(), &target.url("/slow"));
    job.max_retries = 2;
    job.timeout_ms = 1_000;
    jobs.create(&job).await.unwrap();
    reconciler.run_now(&job).await.unwrap();

    let token = CancellationToken::new();
    let run_token = token.clone();
    let handle = tokio::spawn(async move { runner.run(run_token).await });

    let settled = wait_until(Duration::from_secs(15), || async {
        let stats = queue.stats().await;
        stats.pending == 0 && stats.in_flight == 0 && stats.completed == 1
    })
    .await;
    token.cancel();
    handle.await.unwrap().unwrap();
    assert!(settled, "delivery never settled");

    assert_eq!(target.hits(), 3);

    let recorded = logs.recent_by_job(&job.id, 10).await.unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].status, ExecutionStatus::Timeout);

    let stats = queue.stats().await;
    assert_eq!((stats.retried, stats.completed, stats.exhausted), (2, 1, 0));
}
