//! Cron job domain model, request types and definition-time validation

use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::config::defaults::{
    DEFAULT_JOB_MAX_RETRIES, DEFAULT_JOB_TIMEOUT_MS, DEFAULT_JOB_TIMEZONE, MAX_COMMAND_LENGTH,
    MAX_JOB_NAME_LENGTH, MAX_JOB_RETRIES, MAX_JOB_TIMEOUT_MS, MIN_JOB_TIMEOUT_MS,
};
use crate::errors::{AppError, AppResult};
use crate::utils::cron_helper::CronSchedule;

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
pub enum JobStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "PAUSED")]
    Paused,
}

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
pub enum TargetType {
    #[sea_orm(string_value = "HTTP")]
    Http,
    #[sea_orm(string_value = "SCRIPT")]
    Script,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum HttpMethod {
    #[default]
    #[sea_orm(string_value = "GET")]
    Get,
    #[sea_orm(string_value = "POST")]
    Post,
    #[sea_orm(string_value = "PUT")]
    Put,
    #[sea_orm(string_value = "PATCH")]
    Patch,
    #[sea_orm(string_value = "DELETE")]
    Delete,
}

impl HttpMethod {
    /// Only these methods carry the job payload as a request body
    pub fn sends_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A user-owned recurring task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CronJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[schema(example = "*/5 * * * *")]
    pub cron_expression: String,
    #[schema(example = "UTC")]
    pub timezone: String,
    pub target_type: TargetType,
    pub target_url: Option<String>,
    pub command: Option<String>,
    pub headers: HashMap<String, String>,
    pub http_method: HttpMethod,
    #[schema(value_type = Option<Object>)]
    pub payload: Option<serde_json::Value>,
    pub status: JobStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub timeout_ms: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CronJob {
    pub fn is_active(&self) -> bool {
        self.status == JobStatus::Active
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(u64::try_from(self.timeout_ms).unwrap_or(0))
    }

    /// Check every definition-time rule for the job as a whole
    pub fn validate(&self) -> AppResult<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
        if name.chars().count() > MAX_JOB_NAME_LENGTH {
            return Err(AppError::validation(format!(
                "name must be at most {MAX_JOB_NAME_LENGTH} characters"
            )));
        }
        if !(MIN_JOB_TIMEOUT_MS..=MAX_JOB_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(AppError::validation(format!(
                "timeout_ms must be between {MIN_JOB_TIMEOUT_MS} and {MAX_JOB_TIMEOUT_MS}"
            )));
        }
        if !(0..=MAX_JOB_RETRIES).contains(&self.max_retries) {
            return Err(AppError::validation(format!(
                "max_retries must be between 0 and {MAX_JOB_RETRIES}"
            )));
        }
        if !(0..=MAX_JOB_RETRIES).contains(&self.retry_count) {
            return Err(AppError::validation(format!(
                "retry_count must be between 0 and {MAX_JOB_RETRIES}"
            )));
        }

        if let Some(url) = &self.target_url {
            validate_target_url(url)?;
        }

        match self.target_type {
            TargetType::Http => {
                if self.target_url.as_deref().is_none_or(str::is_empty) {
                    return Err(AppError::target_configuration(
                        "target_url is required for HTTP jobs",
                    ));
                }
            }
            TargetType::Script => {
                let command = self.command.as_deref().unwrap_or_default();
                if command.trim().is_empty() {
                    return Err(AppError::target_configuration(
                        "command is required for SCRIPT jobs",
                    ));
                }
                if command.chars().count() > MAX_COMMAND_LENGTH {
                    return Err(AppError::validation(format!(
                        "command must be at most {MAX_COMMAND_LENGTH} characters"
                    )));
                }
            }
        }

        CronSchedule::parse(&self.cron_expression, &self.timezone)?;
        Ok(())
    }

    /// Drop the address that does not belong to the target kind
    fn normalize_target(&mut self) {
        match self.target_type {
            TargetType::Http => self.command = None,
            TargetType::Script => self.target_url = None,
        }
    }
}

fn validate_target_url(raw: &str) -> AppResult<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| AppError::validation(format!("target_url is not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::validation(format!(
            "target_url must use http or https, got '{other}'"
        ))),
    }
}

/// Request body for creating a job
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CronJobCreateRequest {
    pub name: String,
    #[schema(example = "*/5 * * * *")]
    pub cron_expression: String,
    #[serde(default)]
    pub timezone: Option<String>,
    pub target_type: TargetType,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub http_method: Option<HttpMethod>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub retry_count: Option<i32>,
    #[serde(default)]
    pub max_retries: Option<i32>,
    #[serde(default, alias = "timeout")]
    pub timeout_ms: Option<i32>,
}

impl CronJobCreateRequest {
    /// Build a new ACTIVE job owned by `user_id`, applying defaults
    pub fn into_job(self, user_id: Uuid) -> CronJob {
        let now = Utc::now();
        let mut job = CronJob {
            id: Uuid::new_v4(),
            user_id,
            name: self.name.trim().to_string(),
            cron_expression: self.cron_expression.trim().to_string(),
            timezone: self
                .timezone
                .unwrap_or_else(|| DEFAULT_JOB_TIMEZONE.to_string()),
            target_type: self.target_type,
            target_url: self.target_url,
            command: self.command,
            headers: self.headers.unwrap_or_default(),
            http_method: self.http_method.unwrap_or_default(),
            payload: self.payload,
            status: JobStatus::Active,
            retry_count: self.retry_count.unwrap_or(0),
            max_retries: self.max_retries.unwrap_or(DEFAULT_JOB_MAX_RETRIES),
            timeout_ms: self.timeout_ms.unwrap_or(DEFAULT_JOB_TIMEOUT_MS),
            created_at: now,
            updated_at: now,
        };
        job.normalize_target();
        job
    }
}

/// Request body for updating a job; absent fields stay unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CronJobUpdateRequest {
    pub name: Option<String>,
    pub cron_expression: Option<String>,
    pub timezone: Option<String>,
    pub target_type: Option<TargetType>,
    /// `null` clears the URL
    #[serde(default, deserialize_with = "nullable_field", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, nullable)]
    pub target_url: Option<Option<String>>,
    /// `null` clears the command
    #[serde(default, deserialize_with = "nullable_field", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, nullable)]
    pub command: Option<Option<String>>,
    /// `null` removes every header
    #[serde(default, deserialize_with = "nullable_field", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>, nullable)]
    pub headers: Option<Option<HashMap<String, String>>>,
    pub http_method: Option<HttpMethod>,
    /// `null` removes the payload
    #[serde(default, deserialize_with = "nullable_field", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>, nullable)]
    pub payload: Option<Option<serde_json::Value>>,
    pub status: Option<JobStatus>,
    pub retry_count: Option<i32>,
    pub max_retries: Option<i32>,
    #[serde(alias = "timeout")]
    pub timeout_ms: Option<i32>,
}

impl CronJobUpdateRequest {
    /// Merge onto the current job without touching storage
    pub fn apply_to(&self, current: &CronJob) -> CronJob {
        let mut job = current.clone();
        if let Some(name) = &self.name {
            job.name = name.trim().to_string();
        }
        if let Some(expression) = &self.cron_expression {
            job.cron_expression = expression.trim().to_string();
        }
        if let Some(timezone) = &self.timezone {
            job.timezone = timezone.clone();
        }
        if let Some(target_type) = self.target_type {
            job.target_type = target_type;
        }
        if let Some(url) = &self.target_url {
            job.target_url = url.clone();
        }
        if let Some(command) = &self.command {
            job.command = command.clone();
        }
        if let Some(headers) = &self.headers {
            job.headers = headers.clone().unwrap_or_default();
        }
        if let Some(method) = self.http_method {
            job.http_method = method;
        }
        if let Some(payload) = &self.payload {
            job.payload = payload.clone();
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(retry_count) = self.retry_count {
            job.retry_count = retry_count;
        }
        if let Some(max_retries) = self.max_retries {
            job.max_retries = max_retries;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            job.timeout_ms = timeout_ms;
        }
        job.normalize_target();
        job.updated_at = Utc::now();
        job
    }
}

/// Present-but-null becomes `Some(None)`; an absent field stays `None` via `default`
fn nullable_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Query string for job listing
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct JobListQuery {
    /// Filter by status
    pub status: Option<JobStatus>,
}

/// Job plus its computed schedule information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CronJobResponse {
    #[serde(flatten)]
    pub job: CronJob,
    /// Next fire time, present only while the job is ACTIVE
    pub next_execution: Option<DateTime<Utc>>,
    /// Most recent scheduled fire time, present only while the job is ACTIVE
    pub last_scheduled_at: Option<DateTime<Utc>>,
    pub schedule_description: String,
}

impl CronJobResponse {
    pub fn from_job(job: CronJob, now: DateTime<Utc>) -> Self {
        let (next_execution, last_scheduled_at) = if job.is_active() {
            match CronSchedule::parse(&job.cron_expression, &job.timezone) {
                Ok(schedule) => (schedule.next_after(&now), schedule.previous_before(&now)),
                Err(_) => (None, None),
            }
        } else {
            (None, None)
        };
        let schedule_description =
            crate::utils::cron_helper::describe_cron_expression(&job.cron_expression);

        Self {
            job,
            next_execution,
            last_scheduled_at,
            schedule_description,
        }
    }
}

/// Acknowledgement of a queued immediate run
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunNowResponse {
    pub job_id: Uuid,
    pub delivery_id: Uuid,
    pub queued_at: DateTime<Utc>,
}
