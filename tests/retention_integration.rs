mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use common::{http_job, test_database};
use cron_relay::{
    database::repositories::{CronJobSeaOrmRepository, ExecutionLogSeaOrmRepository},
    job_scheduling::RetentionSweeper,
    models::{ExecutionStatus, NewExecutionLog},
};

fn log_finished_days_ago(job_id: Uuid, days: i64) -> NewExecutionLog {
    let finished_at = Utc::now() - Duration::days(days);
    NewExecutionLog {
        job_id,
        status: ExecutionStatus::Success,
        response_code: Some(200),
        response_body: Some("ok".to_string()),
        error_message: None,
        started_at: finished_at - Duration::milliseconds(120),
        finished_at,
    }
}

#[tokio::test]
async fn sweep_removes_only_logs_past_the_window() {
    let database = test_database().await;
    let jobs = CronJobSeaOrmRepository::new(database.connection());
    let logs = ExecutionLogSeaOrmRepository::new(database.connection());

    let job = http_job(Uuid::new_v4(), "https://example.com/hook");
    jobs.create(&job).await.unwrap();

    logs.create(log_finished_days_ago(job.id, 40)).await.unwrap();
    logs.create(log_finished_days_ago(job.id, 31)).await.unwrap();
    let kept = logs.create(log_finished_days_ago(job.id, 10)).await.unwrap();
    logs.create(log_finished_days_ago(job.id, 0)).await.unwrap();

    let sweeper = RetentionSweeper::new(logs.clone());
    let deleted = sweeper.sweep(30).await.unwrap();
    assert_eq!(deleted, 2);

    let remaining = logs.recent_by_job(&job.id, 10).await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().any(|log| log.id == kept.id));

    assert_eq!(sweeper.sweep(30).await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_a_job_cascades_to_its_logs() {
    let database = test_database().await;
    let jobs = CronJobSeaOrmRepository::new(database.connection());
    let logs = ExecutionLogSeaOrmRepository::new(database.connection());

    let job = http_job(Uuid::new_v4(), "https://example.com/hook");
    jobs.create(&job).await.unwrap();
    let log = logs.create(log_finished_days_ago(job.id, 1)).await.unwrap();

    assert!(jobs.delete(&job.id).await.unwrap());
    assert!(logs.find_by_id(&log.id).await.unwrap().is_none());
}
