//! SeaORM repository implementations
//!
//! This module provides repository implementations using SeaORM that work across
//! SQLite, PostgreSQL, and MySQL databases.

pub mod cron_job;
pub mod execution_log;

// Re-export for convenience
pub use cron_job::CronJobSeaOrmRepository;
pub use execution_log::{ExecutionLogSeaOrmRepository, StatusCounts};
