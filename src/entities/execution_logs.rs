use sea_orm::entity::prelude::*;

use crate::models::execution_log::ExecutionStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "execution_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: ExecutionStatus,
    pub response_code: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub response_body: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,
    pub started_at: ChronoDateTimeUtc,
    pub finished_at: Option<ChronoDateTimeUtc>,
    pub duration_ms: Option<i64>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cron_jobs::Entity",
        from = "Column::JobId",
        to = "super::cron_jobs::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    CronJobs,
}

impl Related<super::cron_jobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CronJobs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
