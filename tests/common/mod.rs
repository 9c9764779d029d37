//! Shared fixtures for integration tests
#![allow(dead_code)]

use axum::{
    Router,
    body::Bytes,
    http::StatusCode,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use cron_relay::{
    config::{Config, DatabaseConfig},
    database::Database,
    models::{CronJob, CronJobCreateRequest, HttpMethod, TargetType},
};

/// Migrated in-memory SQLite database
pub async fn test_database() -> Database {
    let database = Database::new(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
    })
    .await
    .expect("in-memory database");
    database.migrate().await.expect("migrations");
    database
}

/// Default config with a fast poll loop
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.database.url = "sqlite::memory:".to_string();
    config.scheduler.poll_interval = Duration::from_millis(50);
    config.scheduler.backoff_base = Duration::from_millis(50);
    config.scheduler.backoff_max = Duration::from_millis(200);
    config.scheduler.shutdown_grace_period = Duration::from_secs(2);
    config
}

pub fn http_job(user_id: Uuid, url: &str) -> CronJob {
    http_request(url).into_job(user_id)
}

pub fn http_request(url: &str) -> CronJobCreateRequest {
    CronJobCreateRequest {
        name: "ping target".to_string(),
        cron_expression: "*/5 * * * *".to_string(),
        timezone: None,
        target_type: TargetType::Http,
        target_url: Some(url.to_string()),
        command: None,
        headers: None,
        http_method: Some(HttpMethod::Get),
        payload: None,
        retry_count: None,
        max_retries: Some(0),
        timeout_ms: Some(1_000),
    }
}

/// Local HTTP target that counts hits
pub struct TargetServer {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl TargetServer {
    pub async fn start() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let app = Router::new()
            .route("/ok", get(|| async { "pong" }))
            .route(
                "/fail",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "nope") }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .route("/big", get(|| async { "x".repeat(6_000) }))
            .route("/echo", post(|body: Bytes| async move { body }).get(|body: Bytes| async move {
                format!("get:{}", body.len())
            }))
            .layer(axum::middleware::from_fn(
                move |request: axum::extract::Request, next: axum::middleware::Next| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        next.run(request).await
                    }
                },
            ));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind target");
        let addr = listener.local_addr().expect("target addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// URL of a port nothing is listening on
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{addr}/gone")
}

/// Poll `check` until it returns true or `timeout` elapses
pub async fn wait_until<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    check().await
}
