//! SeaORM entity definitions

pub mod prelude;

pub mod cron_jobs;
pub mod execution_logs;
