//! Execution log domain model and statistics views

use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum ExecutionStatus {
    #[sea_orm(string_value = "SUCCESS")]
    Success,
    #[sea_orm(string_value = "FAILED")]
    Failed,
    /// Reserved; attempts are only written once finished
    #[sea_orm(string_value = "RUNNING")]
    Running,
    #[sea_orm(string_value = "TIMEOUT")]
    Timeout,
}

/// One immutable record of a single firing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExecutionLog {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: ExecutionStatus,
    pub response_code: Option<i32>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Finished attempt as produced by the executor
#[derive(Debug, Clone)]
pub struct NewExecutionLog {
    pub job_id: Uuid,
    pub status: ExecutionStatus,
    pub response_code: Option<i32>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl NewExecutionLog {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0)
    }
}

/// Query string for execution listings
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExecutionListQuery {
    /// Filter by attempt status
    pub status: Option<ExecutionStatus>,
}

/// Execution log joined with the name of its job
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExecutionWithJob {
    #[serde(flatten)]
    pub execution: ExecutionLog,
    pub job_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobStatistics {
    pub job_id: Uuid,
    pub total_executions: u64,
    pub success_count: u64,
    pub failed_count: u64,
    pub timeout_count: u64,
    /// Percentage of successful attempts, two decimals
    pub success_rate: f64,
    pub average_duration_ms: Option<i64>,
    pub recent_executions: Vec<ExecutionLog>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct JobCounts {
    pub total: u64,
    pub active: u64,
    pub paused: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ExecutionCounts {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserStatistics {
    pub jobs: JobCounts,
    pub executions: ExecutionCounts,
    pub recent_executions: Vec<ExecutionWithJob>,
}

/// Success percentage rounded to two decimals; 0 with no attempts
pub fn success_rate(successful: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = successful as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}
