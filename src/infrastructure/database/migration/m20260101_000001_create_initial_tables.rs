//! Creates the catalog schema: entries, index_sessions, profiles, jobs, job_items.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Entries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Entries::Path).string().not_null().primary_key())
                    .col(ColumnDef::new(Entries::ParentPath).string())
                    .col(ColumnDef::new(Entries::Name).string().not_null())
                    .col(ColumnDef::new(Entries::IsDirectory).boolean().not_null())
                    .col(ColumnDef::new(Entries::Size).big_integer().not_null())
                    .col(
                        ColumnDef::new(Entries::ModifiedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Entries::Permissions).integer())
                    .col(
                        ColumnDef::new(Entries::Cached)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Entries::CachedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Entries::CacheJobId).uuid())
                    .col(ColumnDef::new(Entries::LastSeenSessionId).uuid().not_null())
                    .col(
                        ColumnDef::new(Entries::Metadata)
                            .json()
                            .not_null()
                            .default("{}"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_entries_parent_path")
                    .table(Entries::Table)
                    .col(Entries::ParentPath)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IndexSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IndexSessions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IndexSessions::RootPath).string().not_null())
                    .col(ColumnDef::new(IndexSessions::Status).string().not_null())
                    .col(
                        ColumnDef::new(IndexSessions::TotalFiles)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(IndexSessions::ProcessedFiles)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(IndexSessions::CurrentPath).string())
                    .col(
                        ColumnDef::new(IndexSessions::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IndexSessions::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(IndexSessions::ErrorMessage).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Profiles::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Profiles::Priority).integer().not_null())
                    .col(
                        ColumnDef::new(Profiles::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Profiles::WorkerCount).integer().not_null())
                    .col(
                        ColumnDef::new(Profiles::MaxConcurrentFiles)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Profiles::WorkerPollIntervalMs)
                            .integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Jobs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Jobs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Jobs::FilePaths).json().not_null())
                    .col(ColumnDef::new(Jobs::DirectoryPaths).json().not_null())
                    .col(ColumnDef::new(Jobs::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(Jobs::TotalFiles).big_integer().not_null())
                    .col(
                        ColumnDef::new(Jobs::CompletedFiles)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Jobs::FailedFiles)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Jobs::CompletedSizeBytes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Jobs::Status).string().not_null())
                    .col(ColumnDef::new(Jobs::WorkerId).string())
                    .col(
                        ColumnDef::new(Jobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Jobs::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Jobs::CompletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_jobs_created_at")
                    .table(Jobs::Table)
                    .col(Jobs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(JobItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JobItems::JobId).uuid().not_null())
                    .col(ColumnDef::new(JobItems::FilePath).string().not_null())
                    .col(ColumnDef::new(JobItems::Status).string().not_null())
                    .col(ColumnDef::new(JobItems::WorkerId).string())
                    .col(ColumnDef::new(JobItems::FileSizeBytes).big_integer())
                    .col(ColumnDef::new(JobItems::ErrorMessage).text())
                    .col(ColumnDef::new(JobItems::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(JobItems::CompletedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(JobItems::LeaseExpiresAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_items_job")
                            .from(JobItems::Table, JobItems::JobId)
                            .to(Jobs::Table, Jobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_job_items_job_status")
                    .table(JobItems::Table)
                    .col(JobItems::JobId)
                    .col(JobItems::Status)
                    .col(JobItems::Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Jobs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IndexSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Entries::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Entries {
    Table,
    Path,
    ParentPath,
    Name,
    IsDirectory,
    Size,
    ModifiedAt,
    Permissions,
    Cached,
    CachedAt,
    CacheJobId,
    LastSeenSessionId,
    Metadata,
}

#[derive(DeriveIden)]
enum IndexSessions {
    Table,
    Id,
    RootPath,
    Status,
    TotalFiles,
    ProcessedFiles,
    CurrentPath,
    StartedAt,
    CompletedAt,
    ErrorMessage,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    Name,
    Priority,
    IsDefault,
    WorkerCount,
    MaxConcurrentFiles,
    WorkerPollIntervalMs,
}

#[derive(DeriveIden)]
enum Jobs {
    Table,
    Id,
    FilePaths,
    DirectoryPaths,
    ProfileId,
    TotalFiles,
    CompletedFiles,
    FailedFiles,
    CompletedSizeBytes,
    Status,
    WorkerId,
    CreatedAt,
    StartedAt,
    CompletedAt,
}

#[derive(DeriveIden)]
enum JobItems {
    Table,
    Id,
    JobId,
    FilePath,
    Status,
    WorkerId,
    FileSizeBytes,
    ErrorMessage,
    StartedAt,
    CompletedAt,
    LeaseExpiresAt,
}
