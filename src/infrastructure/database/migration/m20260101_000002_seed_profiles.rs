//! Seeds the execution-template Profiles the Selector classifies into
//! (`spec.md` §4.C). `general` is the default profile resolved when no
//! explicit reference is given and classification falls through.

use sea_orm::Statement;
use sea_orm_migration::prelude::*;
use uuid::Uuid;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        for (name, priority, is_default, worker_count, max_concurrent_files, poll_interval_ms) in [
            ("general", 0, true, 4, 8, 1000),
            ("image-sequences", 10, false, 2, 16, 500),
            ("large-videos", 10, false, 2, 2, 1000),
            ("proxy-media", 10, false, 4, 8, 750),
            ("small-files", 10, false, 8, 32, 250),
        ] {
            db.execute(Statement::from_sql_and_values(
                manager.get_database_backend(),
                r#"INSERT INTO profiles
                    (id, name, priority, is_default, worker_count, max_concurrent_files, worker_poll_interval_ms)
                   VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
                [
                    Uuid::new_v4().into(),
                    name.into(),
                    priority.into(),
                    is_default.into(),
                    worker_count.into(),
                    max_concurrent_files.into(),
                    poll_interval_ms.into(),
                ],
            ))
            .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute(Statement::from_string(
            manager.get_database_backend(),
            "DELETE FROM profiles".to_owned(),
        ))
        .await?;
        Ok(())
    }
}
