use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

/// Environment variables with this prefix override the config file,
/// e.g. `CRON_RELAY_WEB__PORT=9090`.
pub const ENV_PREFIX: &str = "CRON_RELAY_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Worker pool and trigger queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum simultaneous in-flight dispatches
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,
    /// Maximum dispatch starts per rate window
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: usize,
    #[serde(default = "default_rate_limit_window", with = "duration_serde::duration")]
    pub rate_limit_window: Duration,
    /// How often the runner polls the queue for due deliveries
    #[serde(default = "default_poll_interval", with = "duration_serde::duration")]
    pub poll_interval: Duration,
    /// Delivery attempts for triggers that carry no retry budget of their own
    #[serde(default = "default_queue_attempts")]
    pub default_attempts: u32,
    #[serde(default = "default_backoff_base", with = "duration_serde::duration")]
    pub backoff_base: Duration,
    #[serde(default = "default_backoff_max", with = "duration_serde::duration")]
    pub backoff_max: Duration,
    /// How long shutdown waits for in-flight dispatches before giving up
    #[serde(default = "default_shutdown_grace", with = "duration_serde::duration")]
    pub shutdown_grace_period: Duration,
}

/// Execution log retention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_retention_days")]
    pub days_to_keep: u32,
    #[serde(default = "default_retention_cron")]
    pub cron_expression: String,
    #[serde(default = "default_retention_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum characters of a response body kept in the execution log
    #[serde(default = "default_response_body_limit")]
    pub response_body_limit: usize,
    /// Script targets are never executed; this must stay false
    #[serde(default)]
    pub script_execution_enabled: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_true() -> bool {
    true
}

fn default_worker_concurrency() -> usize {
    DEFAULT_WORKER_CONCURRENCY
}

fn default_rate_limit_max() -> usize {
    DEFAULT_RATE_LIMIT_MAX
}

fn default_rate_limit_window() -> Duration {
    Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(DEFAULT_POLL_INTERVAL_MS)
}

fn default_queue_attempts() -> u32 {
    DEFAULT_QUEUE_ATTEMPTS
}

fn default_backoff_base() -> Duration {
    Duration::from_millis(DEFAULT_BACKOFF_BASE_MS)
}

fn default_backoff_max() -> Duration {
    Duration::from_secs(DEFAULT_BACKOFF_MAX_SECS)
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS)
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

fn default_retention_cron() -> String {
    DEFAULT_RETENTION_CRON.to_string()
}

fn default_retention_timezone() -> String {
    DEFAULT_RETENTION_TIMEZONE.to_string()
}

fn default_response_body_limit() -> usize {
    DEFAULT_RESPONSE_BODY_LIMIT
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: default_worker_concurrency(),
            rate_limit_max: default_rate_limit_max(),
            rate_limit_window: default_rate_limit_window(),
            poll_interval: default_poll_interval(),
            default_attempts: default_queue_attempts(),
            backoff_base: default_backoff_base(),
            backoff_max: default_backoff_max(),
            shutdown_grace_period: default_shutdown_grace(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            days_to_keep: default_retention_days(),
            cron_expression: default_retention_cron(),
            timezone: default_retention_timezone(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            response_body_limit: default_response_body_limit(),
            script_execution_enabled: false,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: Some(DEFAULT_MAX_CONNECTIONS),
            },
            web: WebConfig {
                host: default_host(),
                port: default_port(),
            },
            scheduler: SchedulerConfig::default(),
            retention: RetentionConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    /// Load the config file, layering `CRON_RELAY_*` environment variables on top.
    /// A default file is written when none exists.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let figment = if std::path::Path::new(config_file).exists() {
            Figment::from(Serialized::defaults(Self::default())).merge(Toml::file(config_file))
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Figment::from(Serialized::defaults(default_config))
        };

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.executor.script_execution_enabled {
            anyhow::bail!(
                "executor.script_execution_enabled is not supported: script targets have no sandbox"
            );
        }
        if self.scheduler.worker_concurrency == 0 {
            anyhow::bail!("scheduler.worker_concurrency must be at least 1");
        }
        if self.scheduler.rate_limit_max == 0 {
            anyhow::bail!("scheduler.rate_limit_max must be at least 1");
        }
        if self.scheduler.default_attempts == 0 {
            anyhow::bail!("scheduler.default_attempts must be at least 1");
        }
        if self.retention.enabled {
            crate::utils::cron_helper::validate_cron_expression(
                &self.retention.cron_expression,
                &self.retention.timezone,
            )
            .map_err(|e| anyhow::anyhow!("retention schedule: {e}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.worker_concurrency, 10);
        assert_eq!(config.scheduler.rate_limit_max, 100);
        assert_eq!(config.scheduler.shutdown_grace_period, Duration::from_secs(30));
        assert_eq!(config.retention.days_to_keep, 30);
        assert_eq!(config.executor.response_body_limit, 5000);
    }

    #[test]
    fn test_script_execution_is_rejected() {
        let mut config = Config::default();
        config.executor.script_execution_enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_writes_default_file_then_reads_it_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        let first = Config::load_from_file(path_str).unwrap();
        assert!(path.exists());
        assert_eq!(first.web.port, DEFAULT_PORT);

        std::fs::write(
            &path,
            r#"
[database]
url = "sqlite::memory:"

[web]
port = 9191

[scheduler]
backoff_base = "500ms"
"#,
        )
        .unwrap();

        let second = Config::load_from_file(path_str).unwrap();
        assert_eq!(second.web.port, 9191);
        assert_eq!(second.web.host, DEFAULT_HOST);
        assert_eq!(second.scheduler.backoff_base, Duration::from_millis(500));
        assert_eq!(second.scheduler.worker_concurrency, DEFAULT_WORKER_CONCURRENCY);
    }
}
