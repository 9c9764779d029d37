use anyhow::Result;
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cron_relay::{
    config::Config,
    database::Database,
    utils::ShutdownSignal,
    web::{AppState, WebServer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "cron-relay")]
#[command(version)]
#[command(about = "Cron job scheduling service that dispatches HTTP callbacks on a schedule")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = if cli.log_level == "trace" {
        format!("cron_relay={},tower_http=trace", cli.log_level)
    } else {
        format!("cron_relay={}", cli.log_level)
    };
    let json = cli.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    info!("Starting cron-relay v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }
    config.validate()?;

    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    let state = AppState::new(&database, &config)?;

    let synced = state.scheduling.reconcile_all().await?;
    info!("Startup sync scheduled {} active jobs", synced);

    let cancellation_token = CancellationToken::new();
    let runner_handles = state.scheduling.start(cancellation_token.clone()).await?;

    let server = WebServer::new(&config, state)?;
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
    let server_token = cancellation_token.clone();
    let server_handle =
        tokio::spawn(async move { server.serve_with_cancellation(ready_tx, server_token).await });

    match ready_rx.await {
        Ok(Ok(())) => info!("HTTP server ready"),
        Ok(Err(e)) => {
            cancellation_token.cancel();
            return Err(e);
        }
        Err(_) => {
            cancellation_token.cancel();
            anyhow::bail!("HTTP server exited before becoming ready");
        }
    }

    match ShutdownSignal::install() {
        Ok(mut shutdown) => {
            tokio::select! {
                _ = shutdown.recv() => {}
                _ = cancellation_token.cancelled() => {}
            }
        }
        Err(e) => {
            error!("Failed to install shutdown signal handlers: {}", e);
            cancellation_token.cancelled().await;
        }
    }
    cancellation_token.cancel();

    for handle in runner_handles {
        if let Err(e) = handle.await {
            error!("Runner task panicked: {}", e);
        }
    }
    match server_handle.await {
        Ok(Err(e)) => error!("HTTP server error: {}", e),
        Err(e) => error!("HTTP server task panicked: {}", e),
        Ok(Ok(())) => {}
    }

    info!("cron-relay stopped");
    Ok(())
}
