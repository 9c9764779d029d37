pub use super::cron_jobs::Entity as CronJobs;
pub use super::execution_logs::Entity as ExecutionLogs;
