/// Configuration default values
///
/// All defaults live here so they can be changed in one place.
// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./cron-relay.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

// Scheduler defaults
pub const DEFAULT_WORKER_CONCURRENCY: usize = 10;
pub const DEFAULT_RATE_LIMIT_MAX: usize = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_QUEUE_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 2000;
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

// Retention defaults
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const DEFAULT_RETENTION_CRON: &str = "0 3 * * *";
pub const DEFAULT_RETENTION_TIMEZONE: &str = "UTC";

// Executor defaults
pub const DEFAULT_RESPONSE_BODY_LIMIT: usize = 5000;

// Job definition defaults and bounds
pub const DEFAULT_JOB_TIMEZONE: &str = "UTC";
pub const DEFAULT_JOB_TIMEOUT_MS: i32 = 30_000;
pub const MIN_JOB_TIMEOUT_MS: i32 = 1_000;
pub const MAX_JOB_TIMEOUT_MS: i32 = 300_000;
pub const DEFAULT_JOB_MAX_RETRIES: i32 = 3;
pub const MAX_JOB_RETRIES: i32 = 10;
pub const MAX_JOB_NAME_LENGTH: usize = 255;
pub const MAX_COMMAND_LENGTH: usize = 1000;

// Pagination
pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 100;
