//! Database infrastructure, built on SeaORM over PostgreSQL.
//!
//! Grounded on the teacher's `Database` wrapper
//! (`core-new/src/infrastructure/database/mod.rs`), adapted from a
//! SQLite-per-library connection to one pooled Postgres connection per
//! engine — `spec.md` §6 requires row-level locking, `SKIP LOCKED`,
//! recursive CTEs, and a JSON column type, none of which SQLite offers.

use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::info;

pub mod catalog;
pub mod entities;
pub mod migration;

/// Pooled connection to the catalog's backing store.
pub struct Database {
    conn: DatabaseConnection,
}

impl Database {
    /// Connect to `database_url` (a `postgres://...` connection string).
    pub async fn connect(database_url: &str) -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new(database_url.to_owned());
        opt.max_connections(20)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(60))
            .max_lifetime(Duration::from_secs(300))
            .sqlx_logging(false); // we use tracing instead

        let conn = SeaDatabase::connect(opt).await?;
        info!("connected to catalog database");
        Ok(Self { conn })
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<(), DbErr> {
        migration::Migrator::up(&self.conn, None).await?;
        info!("catalog schema migrations completed");
        Ok(())
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }
}
