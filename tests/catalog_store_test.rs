mod common;

use chrono::Utc;
use teamcache_manager::infrastructure::database::catalog::{FsObservation, ItemOutcome, NewEntry};

fn entry(path: &str, parent: Option<&str>, is_dir: bool, size: i64) -> NewEntry {
    NewEntry {
        path: path.to_owned(),
        parent_path: parent.map(str::to_owned),
        name: path.rsplit('/').next().unwrap_or(path).to_owned(),
        is_directory: is_dir,
        size,
        modified_at: Utc::now(),
        permissions: Some(0o644),
    }
}

#[tokio::test]
async fn upsert_then_find_children_orders_directories_first() {
    let catalog = common::test_catalog().await;
    let session = catalog.create_index_session("/mnt/team").await.unwrap();

    let batch = vec![
        entry("/mnt/team/b.txt", Some("/mnt/team"), false, 10),
        entry("/mnt/team/a_dir", Some("/mnt/team"), true, 0),
        entry("/mnt/team/a.txt", Some("/mnt/team"), false, 20),
    ];
    catalog.upsert_entries(&batch, session.id).await.unwrap();

    let children = catalog.find_children("/mnt/team").await.unwrap();
    let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["a_dir", "a.txt", "b.txt"]);
}

#[tokio::test]
async fn upsert_preserves_cached_flag_across_reindex() {
    let catalog = common::test_catalog().await;
    let session = catalog.create_index_session("/mnt/team").await.unwrap();

    catalog
        .upsert_entries(&[entry("/mnt/team/f.txt", Some("/mnt/team"), false, 10)], session.id)
        .await
        .unwrap();

    let job = catalog
        .create_job(&["/mnt/team/f.txt".to_string()], &[], catalog.default_profile().await.unwrap().unwrap().id)
        .await
        .unwrap();
    let items = catalog.get_job_items(job.id).await.unwrap();
    catalog
        .claim_pending_items(job.id, "worker-1", 10, 30_000)
        .await
        .unwrap();
    catalog
        .complete_item(items[0].id, ItemOutcome::Completed, Some(10), None)
        .await
        .unwrap();

    // Re-index the same path with a changed size; cached flag must survive.
    let second_session = catalog.create_index_session("/mnt/team").await.unwrap();
    catalog
        .upsert_entries(
            &[entry("/mnt/team/f.txt", Some("/mnt/team"), false, 99)],
            second_session.id,
        )
        .await
        .unwrap();

    let children = catalog.find_children("/mnt/team").await.unwrap();
    let f = children.iter().find(|c| c.path == "/mnt/team/f.txt").unwrap();
    assert!(f.cached, "cached flag must survive a re-index that only touches filesystem fields");
    assert_eq!(f.size, 99);
}

#[tokio::test]
async fn batch_needs_indexing_skips_unchanged_entries() {
    let catalog = common::test_catalog().await;
    let session = catalog.create_index_session("/mnt/team").await.unwrap();
    let modified_at = Utc::now();

    let mut e = entry("/mnt/team/f.txt", Some("/mnt/team"), false, 10);
    e.modified_at = modified_at;
    catalog.upsert_entries(&[e], session.id).await.unwrap();

    let unchanged = FsObservation {
        path: "/mnt/team/f.txt".to_string(),
        modified_at,
        size: 10,
    };
    let changed_size = FsObservation {
        path: "/mnt/team/f.txt".to_string(),
        modified_at,
        size: 999,
    };
    let brand_new = FsObservation {
        path: "/mnt/team/new.txt".to_string(),
        modified_at,
        size: 1,
    };

    let result = catalog
        .batch_needs_indexing(&[unchanged, changed_size.clone(), brand_new.clone()])
        .await
        .unwrap();

    let paths: Vec<&str> = result.iter().map(|o| o.path.as_str()).collect();
    assert_eq!(paths.len(), 2);
    assert!(paths.contains(&changed_size.path.as_str()));
    assert!(paths.contains(&brand_new.path.as_str()));
}

#[tokio::test]
async fn claim_pending_items_is_exclusive_across_concurrent_claimers() {
    let catalog = std::sync::Arc::new(common::test_catalog().await);
    let session = catalog.create_index_session("/mnt/team").await.unwrap();
    let batch: Vec<_> = (0..20)
        .map(|i| entry(&format!("/mnt/team/f{i}.txt"), Some("/mnt/team"), false, 1))
        .collect();
    catalog.upsert_entries(&batch, session.id).await.unwrap();

    let paths: Vec<String> = batch.iter().map(|e| e.path.clone()).collect();
    let profile = catalog.default_profile().await.unwrap().unwrap();
    let job = catalog.create_job(&paths, &[], profile.id).await.unwrap();

    let mut handles = Vec::new();
    for worker in 0..4 {
        let catalog = catalog.clone();
        let job_id = job.id;
        handles.push(tokio::spawn(async move {
            catalog
                .claim_pending_items(job_id, &format!("worker-{worker}"), 5, 30_000)
                .await
                .unwrap()
        }));
    }

    let mut all_claimed_ids = std::collections::HashSet::new();
    let mut total = 0;
    for h in handles {
        let claimed = h.await.unwrap();
        total += claimed.len();
        for item in claimed {
            assert!(all_claimed_ids.insert(item.id), "item {} claimed twice", item.id);
        }
    }
    assert_eq!(total, 20, "every item must be claimed exactly once across all workers");
}

#[tokio::test]
async fn release_expired_leases_requeues_stuck_running_items() {
    let catalog = common::test_catalog().await;
    let session = catalog.create_index_session("/mnt/team").await.unwrap();
    catalog
        .upsert_entries(&[entry("/mnt/team/f.txt", Some("/mnt/team"), false, 1)], session.id)
        .await
        .unwrap();
    let profile = catalog.default_profile().await.unwrap().unwrap();
    let job = catalog
        .create_job(&["/mnt/team/f.txt".to_string()], &[], profile.id)
        .await
        .unwrap();

    // Claim with a lease that has already expired.
    catalog
        .claim_pending_items(job.id, "dead-worker", 10, -1000)
        .await
        .unwrap();

    let released = catalog.release_expired_leases().await.unwrap();
    assert_eq!(released, 1);

    let items = catalog.get_job_items(job.id).await.unwrap();
    assert_eq!(items[0].status, "pending");
    assert!(items[0].worker_id.is_none());
}

#[tokio::test]
async fn ancestor_paths_walks_up_without_repeating() {
    let ancestors =
        teamcache_manager::infrastructure::database::catalog::CatalogStore::ancestor_paths(
            "/mnt/team/project/sub/file.txt",
        );
    assert_eq!(
        ancestors,
        vec![
            "/mnt/team/project/sub".to_string(),
            "/mnt/team/project".to_string(),
            "/mnt/team".to_string(),
            "/".to_string(),
        ]
    );
}
