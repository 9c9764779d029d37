//! Web layer module
//!
//! Thin handlers delegate to the service layer; responses share one
//! envelope and errors are mapped to status codes in `responses`.

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::database::Database;
use crate::database::repositories::{CronJobSeaOrmRepository, ExecutionLogSeaOrmRepository};
use crate::job_scheduling::JobSchedulingAPI;
use crate::services::{CronJobService, ExecutionLogService};

pub mod extractors;
pub mod handlers;
pub mod openapi;
pub mod responses;
pub mod utils;

pub use extractors::{OwnerId, Pagination, PaginationParams, RequestContext};
pub use responses::{ApiResponse, handle_error, handle_result};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub job_service: Arc<CronJobService>,
    pub execution_service: Arc<ExecutionLogService>,
    pub scheduling: JobSchedulingAPI,
}

impl AppState {
    /// Wire services and the scheduling subsystem on top of a migrated database
    pub fn new(database: &Database, config: &Config) -> Result<Self> {
        let scheduling = JobSchedulingAPI::new(database, config)?;
        let job_repo = CronJobSeaOrmRepository::new(database.connection());
        let log_repo = ExecutionLogSeaOrmRepository::new(database.connection());

        Ok(Self {
            job_service: Arc::new(CronJobService::new(
                job_repo.clone(),
                scheduling.reconciler(),
            )),
            execution_service: Arc::new(ExecutionLogService::new(job_repo, log_repo)),
            scheduling,
        })
    }
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &Config, state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        Ok(Self {
            app: Self::create_router(state),
            addr,
        })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health::health_check))
            .merge(Self::openapi_routes())
            .nest("/api/v1", Self::api_v1_routes())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    fn openapi_routes() -> Router<AppState> {
        use utoipa_swagger_ui::SwaggerUi;

        Router::new()
            .merge(SwaggerUi::new("/docs").url("/api/openapi.json", openapi::get_openapi_spec()))
    }

    /// API v1 routes
    fn api_v1_routes() -> Router<AppState> {
        Router::new()
            .route(
                "/jobs",
                get(handlers::jobs::list_jobs).post(handlers::jobs::create_job),
            )
            .route(
                "/jobs/{id}",
                get(handlers::jobs::get_job)
                    .put(handlers::jobs::update_job)
                    .delete(handlers::jobs::delete_job),
            )
            .route("/jobs/{id}/pause", post(handlers::jobs::pause_job))
            .route("/jobs/{id}/resume", post(handlers::jobs::resume_job))
            .route("/jobs/{id}/run", post(handlers::jobs::run_job_now))
            .route(
                "/jobs/{id}/executions",
                get(handlers::executions::list_job_executions),
            )
            .route("/jobs/{id}/stats", get(handlers::stats::job_statistics))
            .route(
                "/executions",
                get(handlers::executions::list_user_executions),
            )
            .route("/executions/{id}", get(handlers::executions::get_execution))
            .route("/stats", get(handlers::stats::user_statistics))
    }

    /// Serve with cancellation support and ready notification
    pub async fn serve_with_cancellation(
        self,
        ready_signal: tokio::sync::oneshot::Sender<Result<()>>,
        cancellation_token: CancellationToken,
    ) -> Result<()> {
        match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => {
                let _ = ready_signal.send(Ok(()));
                tracing::info!("Web server listening on {}", self.addr);

                let shutdown_signal = async move {
                    cancellation_token.cancelled().await;
                    tracing::info!(
                        "Web server received cancellation signal, shutting down gracefully"
                    );
                };

                axum::serve(listener, self.app)
                    .with_graceful_shutdown(shutdown_signal)
                    .await?;
                Ok(())
            }
            Err(bind_error) => {
                let bind_err_msg = format!("Failed to bind to {}: {}", self.addr, bind_error);
                let _ = ready_signal.send(Err(anyhow::anyhow!("{}", bind_err_msg)));
                Err(anyhow::anyhow!("{}", bind_err_msg))
            }
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}
