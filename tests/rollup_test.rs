mod common;

use chrono::Utc;
use teamcache_manager::infrastructure::database::catalog::NewEntry;
use teamcache_manager::infrastructure::jobs::rollup;

fn entry(path: &str, parent: &str, is_dir: bool, size: i64) -> NewEntry {
    NewEntry {
        path: path.to_owned(),
        parent_path: Some(parent.to_owned()),
        name: path.rsplit('/').next().unwrap().to_owned(),
        is_directory: is_dir,
        size,
        modified_at: Utc::now(),
        permissions: Some(0o644),
    }
}

#[tokio::test]
async fn empty_directory_is_never_persisted_as_cached() {
    let catalog = common::test_catalog().await;
    let session = catalog.create_index_session("/mnt/team").await.unwrap();
    catalog
        .upsert_entries(
            &[entry("/mnt/team/empty_dir", "/mnt/team", true, 0)],
            session.id,
        )
        .await
        .unwrap();

    let stats = rollup::validate(&catalog, "/mnt/team/empty_dir", 20).await.unwrap();
    // The literal §4.A formula: no descendants => should_be_cached is true.
    assert!(stats.should_be_cached);

    let (_, changed) = rollup::update_if_valid(&catalog, "/mnt/team/empty_dir", 20)
        .await
        .unwrap();
    assert!(!changed, "an empty directory starts uncached and must stay uncached");

    let children = catalog.find_children("/mnt/team").await.unwrap();
    let dir = children.iter().find(|c| c.path == "/mnt/team/empty_dir").unwrap();
    assert!(!dir.cached, "empty directories are never written as cached (spec §4.F convention)");
}

#[tokio::test]
async fn directory_becomes_cached_once_all_children_are_cached() {
    let catalog = common::test_catalog().await;
    let session = catalog.create_index_session("/mnt/team").await.unwrap();
    catalog
        .upsert_entries(
            &[
                entry("/mnt/team/proj", "/mnt/team", true, 0),
                entry("/mnt/team/proj/a.txt", "/mnt/team/proj", false, 10),
                entry("/mnt/team/proj/b.txt", "/mnt/team/proj", false, 10),
            ],
            session.id,
        )
        .await
        .unwrap();

    let stats = rollup::validate(&catalog, "/mnt/team/proj", 20).await.unwrap();
    assert_eq!(stats.total_files, 2);
    assert!(!stats.should_be_cached, "not all children cached yet");

    let profile = catalog.default_profile().await.unwrap().unwrap();
    let job = catalog
        .create_job(
            &["/mnt/team/proj/a.txt".to_string(), "/mnt/team/proj/b.txt".to_string()],
            &[],
            profile.id,
        )
        .await
        .unwrap();
    let items = catalog.get_job_items(job.id).await.unwrap();
    catalog.claim_pending_items(job.id, "worker-1", 10, 30_000).await.unwrap();
    for item in &items {
        catalog
            .complete_item(item.id, teamcache_manager::infrastructure::database::catalog::ItemOutcome::Completed, Some(10), None)
            .await
            .unwrap();
    }

    let (stats, changed) = rollup::update_if_valid(&catalog, "/mnt/team/proj", 20).await.unwrap();
    assert!(stats.should_be_cached);
    assert!(changed);

    let children = catalog.find_children("/mnt/team").await.unwrap();
    let proj = children.iter().find(|c| c.path == "/mnt/team/proj").unwrap();
    assert!(proj.cached);
}

#[tokio::test]
async fn one_failed_child_keeps_directory_uncached() {
    let catalog = common::test_catalog().await;
    let session = catalog.create_index_session("/mnt/team").await.unwrap();
    catalog
        .upsert_entries(
            &[
                entry("/mnt/team/proj", "/mnt/team", true, 0),
                entry("/mnt/team/proj/a.txt", "/mnt/team/proj", false, 10),
            ],
            session.id,
        )
        .await
        .unwrap();

    let profile = catalog.default_profile().await.unwrap().unwrap();
    let job = catalog
        .create_job(&["/mnt/team/proj/a.txt".to_string()], &[], profile.id)
        .await
        .unwrap();
    let items = catalog.get_job_items(job.id).await.unwrap();
    catalog.claim_pending_items(job.id, "worker-1", 10, 30_000).await.unwrap();
    catalog
        .complete_item(
            items[0].id,
            teamcache_manager::infrastructure::database::catalog::ItemOutcome::Failed,
            None,
            Some("permission denied".to_string()),
        )
        .await
        .unwrap();

    let (stats, changed) = rollup::update_if_valid(&catalog, "/mnt/team/proj", 20).await.unwrap();
    assert!(!stats.should_be_cached);
    assert!(!changed);
}
