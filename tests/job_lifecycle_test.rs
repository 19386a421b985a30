mod common;

use std::time::Duration;
use teamcache_manager::config::EngineConfig;
use teamcache_manager::infrastructure::jobs::ProfileRef;
use teamcache_manager::Engine;

/// Builds an `Engine` against the shared test database, rooted at a fresh
/// temp directory so every path-allow-list check passes.
async fn test_engine(root: &std::path::Path) -> Engine {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a scratch Postgres database");
    let config = EngineConfig::with_root(root.to_path_buf());
    Engine::connect(config, &url).await.expect("engine connect")
}

async fn wait_for_terminal(engine: &Engine, id: uuid::Uuid) -> teamcache_manager::infrastructure::database::entities::job::Model {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = engine.get_job(id).await.unwrap();
        if matches!(job.status.as_str(), "completed" | "failed" | "cancelled") {
            return job;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("job {id} did not reach a terminal state in time (status={})", job.status);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test]
async fn cache_job_over_real_files_completes_and_warms_entries() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
    std::fs::write(tmp.path().join("b.txt"), b"world").unwrap();

    let engine = test_engine(tmp.path()).await;
    let a = tmp.path().join("a.txt").to_string_lossy().to_string();
    let b = tmp.path().join("b.txt").to_string_lossy().to_string();

    // Seed catalog rows directly: normally the Indexer would have created
    // these, but job creation only requires the Entry rows to exist when
    // expanding a directory selection, not for an explicit file list.
    let job = engine
        .create_cache_job(vec![a.clone(), b.clone()], vec![], ProfileRef::Auto)
        .await
        .unwrap();
    assert_eq!(job.total_files, 2);

    let finished = wait_for_terminal(&engine, job.id).await;
    assert_eq!(finished.status, "completed");
    assert_eq!(finished.completed_files, 2);
    assert_eq!(finished.failed_files, 0);

    engine.shutdown().await;
}

#[tokio::test]
async fn missing_file_fails_its_item_without_failing_siblings() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("present.txt"), b"data").unwrap();

    let engine = test_engine(tmp.path()).await;
    let present = tmp.path().join("present.txt").to_string_lossy().to_string();
    let missing = tmp.path().join("missing.txt").to_string_lossy().to_string();

    let job = engine
        .create_cache_job(vec![present, missing], vec![], ProfileRef::Name("general".to_string()))
        .await
        .unwrap();

    let finished = wait_for_terminal(&engine, job.id).await;
    assert_eq!(finished.status, "failed");
    assert_eq!(finished.completed_files, 1);
    assert_eq!(finished.failed_files, 1);

    engine.shutdown().await;
}

#[tokio::test]
async fn create_job_with_no_files_and_no_directories_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = test_engine(tmp.path()).await;

    let result = engine.create_cache_job(vec![], vec![], ProfileRef::Auto).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn path_outside_allowed_roots_is_denied() {
    let tmp = tempfile::tempdir().unwrap();
    let engine = test_engine(tmp.path()).await;

    let result = engine
        .create_cache_job(vec!["/etc/passwd".to_string()], vec![], ProfileRef::Auto)
        .await;
    assert!(matches!(result, Err(teamcache_manager::EngineError::PathDenied(_))));
}

#[tokio::test]
async fn pause_then_cancel_transitions_are_enforced() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
    let engine = test_engine(tmp.path()).await;
    let a = tmp.path().join("a.txt").to_string_lossy().to_string();

    let job = engine
        .create_cache_job(vec![a], vec![], ProfileRef::Name("general".to_string()))
        .await
        .unwrap();

    // Pausing a job that has not yet transitioned out of `pending` is invalid.
    let pause_result = engine.pause_job(job.id).await;
    assert!(pause_result.is_err());

    let cancelled = engine.cancel_job(job.id).await.unwrap();
    assert_eq!(cancelled.status, "cancelled");

    let cancel_again = engine.cancel_job(job.id).await;
    assert!(cancel_again.is_err());

    engine.shutdown().await;
}
