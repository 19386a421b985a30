//! Shared fixtures for integration tests.
//!
//! Each test connects to a throwaway Postgres schema via `TEST_DATABASE_URL`
//! and runs migrations fresh, mirroring the teacher's per-test SQLite file in
//! `indexer_database_test.rs`/`indexer_integration_test.rs`, adapted to a
//! shared Postgres instance (tests must not run concurrently against the
//! same schema — `cargo test -- --test-threads=1`, as the teacher's own
//! database tests also require for its SQLite file locking).

use sea_orm::{Database, DatabaseConnection};
use teamcache_manager::infrastructure::database::catalog::CatalogStore;
use teamcache_manager::infrastructure::database::migration::Migrator;
use sea_orm_migration::MigratorTrait;

pub async fn test_db() -> DatabaseConnection {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a scratch Postgres database");
    let conn = Database::connect(&url).await.expect("connect to test database");
    Migrator::fresh(&conn).await.expect("run migrations");
    conn
}

pub async fn test_catalog() -> CatalogStore {
    CatalogStore::new(test_db().await)
}
