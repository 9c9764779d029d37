//! Initial schema migration that works across SQLite, PostgreSQL, and MySQL
//!
//! Creates the job definition table and the append-only execution log table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_cron_jobs_table(manager).await?;
        self.create_execution_logs_table(manager).await?;
        self.create_indexes(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order to handle foreign key constraints
        manager
            .drop_table(Table::drop().table(ExecutionLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CronJobs::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    /// Create ID column with optimal type for each database
    fn create_id_column(
        &self,
        manager: &SchemaManager<'_>,
        column_name: impl sea_orm::Iden + 'static,
    ) -> ColumnDef {
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => ColumnDef::new(column_name)
                .uuid()
                .not_null()
                .primary_key()
                .to_owned(),
            _ => ColumnDef::new(column_name)
                .string()
                .not_null()
                .primary_key()
                .to_owned(),
        }
    }

    /// Create UUID reference column with optimal type for each database
    fn create_uuid_ref_column(
        &self,
        manager: &SchemaManager<'_>,
        column_name: impl sea_orm::Iden + 'static,
    ) -> ColumnDef {
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => {
                ColumnDef::new(column_name).uuid().not_null().to_owned()
            }
            _ => ColumnDef::new(column_name).string().not_null().to_owned(),
        }
    }

    fn create_timestamp_column(
        &self,
        manager: &SchemaManager<'_>,
        column_name: impl sea_orm::Iden + 'static,
    ) -> ColumnDef {
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => ColumnDef::new(column_name)
                .timestamp_with_time_zone()
                .not_null()
                .to_owned(),
            _ => ColumnDef::new(column_name).timestamp().not_null().to_owned(),
        }
    }

    fn create_nullable_timestamp_column(
        &self,
        manager: &SchemaManager<'_>,
        column_name: impl sea_orm::Iden + 'static,
    ) -> ColumnDef {
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres => ColumnDef::new(column_name)
                .timestamp_with_time_zone()
                .to_owned(),
            _ => ColumnDef::new(column_name).timestamp().to_owned(),
        }
    }

    async fn create_cron_jobs_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CronJobs::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, CronJobs::Id))
                    .col(self.create_uuid_ref_column(manager, CronJobs::UserId))
                    .col(ColumnDef::new(CronJobs::Name).string().not_null())
                    .col(ColumnDef::new(CronJobs::CronExpression).string().not_null())
                    .col(
                        ColumnDef::new(CronJobs::Timezone)
                            .string()
                            .not_null()
                            .default("UTC"),
                    )
                    .col(ColumnDef::new(CronJobs::TargetType).string().not_null())
                    .col(ColumnDef::new(CronJobs::TargetUrl).text())
                    .col(ColumnDef::new(CronJobs::Command).text())
                    .col(ColumnDef::new(CronJobs::Headers).json().not_null())
                    .col(
                        ColumnDef::new(CronJobs::HttpMethod)
                            .string()
                            .not_null()
                            .default("GET"),
                    )
                    .col(ColumnDef::new(CronJobs::Payload).json())
                    .col(
                        ColumnDef::new(CronJobs::Status)
                            .string()
                            .not_null()
                            .default("ACTIVE"),
                    )
                    .col(
                        ColumnDef::new(CronJobs::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CronJobs::MaxRetries)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(CronJobs::TimeoutMs)
                            .integer()
                            .not_null()
                            .default(30000),
                    )
                    .col(self.create_timestamp_column(manager, CronJobs::CreatedAt))
                    .col(self.create_timestamp_column(manager, CronJobs::UpdatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn create_execution_logs_table(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ExecutionLogs::Table)
                    .if_not_exists()
                    .col(self.create_id_column(manager, ExecutionLogs::Id))
                    .col(self.create_uuid_ref_column(manager, ExecutionLogs::JobId))
                    .col(ColumnDef::new(ExecutionLogs::Status).string().not_null())
                    .col(ColumnDef::new(ExecutionLogs::ResponseCode).integer())
                    .col(ColumnDef::new(ExecutionLogs::ResponseBody).text())
                    .col(ColumnDef::new(ExecutionLogs::ErrorMessage).text())
                    .col(self.create_timestamp_column(manager, ExecutionLogs::StartedAt))
                    .col(self.create_nullable_timestamp_column(manager, ExecutionLogs::FinishedAt))
                    .col(ColumnDef::new(ExecutionLogs::DurationMs).big_integer())
                    .col(self.create_timestamp_column(manager, ExecutionLogs::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_execution_logs_job_id")
                            .from(ExecutionLogs::Table, ExecutionLogs::JobId)
                            .to(CronJobs::Table, CronJobs::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_indexes(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        // Cron jobs indexes
        manager
            .create_index(
                Index::create()
                    .name("idx_cron_jobs_user_id_created_at")
                    .table(CronJobs::Table)
                    .col(CronJobs::UserId)
                    .col(CronJobs::CreatedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_cron_jobs_status")
                    .table(CronJobs::Table)
                    .col(CronJobs::Status)
                    .to_owned(),
            )
            .await?;

        // Execution logs indexes
        manager
            .create_index(
                Index::create()
                    .name("idx_execution_logs_job_id_started_at")
                    .table(ExecutionLogs::Table)
                    .col(ExecutionLogs::JobId)
                    .col(ExecutionLogs::StartedAt)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_execution_logs_created_at")
                    .table(ExecutionLogs::Table)
                    .col(ExecutionLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

// Table identifiers
#[derive(DeriveIden)]
enum CronJobs {
    Table,
    Id,
    UserId,
    Name,
    CronExpression,
    Timezone,
    TargetType,
    TargetUrl,
    Command,
    Headers,
    HttpMethod,
    Payload,
    Status,
    RetryCount,
    MaxRetries,
    TimeoutMs,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ExecutionLogs {
    Table,
    Id,
    JobId,
    Status,
    ResponseCode,
    ResponseBody,
    ErrorMessage,
    StartedAt,
    FinishedAt,
    DurationMs,
    CreatedAt,
}
