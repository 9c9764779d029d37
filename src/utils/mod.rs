//! Shared utilities

pub mod cron_helper;
pub mod http_client;
pub mod rate_limiter;
pub mod shutdown;

pub use cron_helper::{CronError, CronSchedule};
pub use http_client::{DispatchHttpClient, HttpDispatchRequest, HttpDispatchResponse};
pub use rate_limiter::RateLimiter;
pub use shutdown::ShutdownSignal;
