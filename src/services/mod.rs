//! Service layer for business logic
//!
//! Services sit between the web handlers and the repositories. They own
//! ownership checks, validation and the hand-off to the scheduling
//! subsystem, and convert repository failures into `AppError`.

pub mod cron_job_service;
pub mod execution_log_service;

pub use cron_job_service::CronJobService;
pub use execution_log_service::ExecutionLogService;
