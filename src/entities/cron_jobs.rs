use sea_orm::entity::prelude::*;

use crate::models::cron_job::{HttpMethod, JobStatus, TargetType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cron_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub cron_expression: String,
    pub timezone: String,
    pub target_type: TargetType,
    #[sea_orm(column_type = "Text", nullable)]
    pub target_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub command: Option<String>,
    /// Header name to value map
    pub headers: Json,
    pub http_method: HttpMethod,
    #[sea_orm(nullable)]
    pub payload: Option<Json>,
    pub status: JobStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub timeout_ms: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::execution_logs::Entity")]
    ExecutionLogs,
}

impl Related<super::execution_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExecutionLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
