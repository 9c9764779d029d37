//! Job scheduling subsystem for cron-relay
//!
//! The system is built around these components:
//! - `TriggerQueue`: repeatable and one-shot triggers with redelivery
//! - `SchedulerReconciler`: keeps triggers in step with the stored jobs
//! - `JobQueueRunner`: bounded, rate-limited delivery execution
//! - `JobExecutor`: performs one attempt and records terminal outcomes
//! - `RetentionSweeper`: purges old execution logs

pub mod api;
pub mod job_executor;
pub mod job_queue_runner;
pub mod reconciler;
pub mod retention;
pub mod trigger_queue;
pub mod types;

pub use api::{JobSchedulingAPI, SchedulingHealthStatus};
pub use job_executor::{DeliveryHandler, JobExecutor};
pub use job_queue_runner::JobQueueRunner;
pub use reconciler::SchedulerReconciler;
pub use retention::RetentionSweeper;
pub use trigger_queue::{InMemoryTriggerQueue, TriggerQueue};
pub use types::*;
