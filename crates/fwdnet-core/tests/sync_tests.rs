//! Integration tests for the incremental NQE catalog sync.
//!
//! These drive `CatalogSync` against in-memory repositories and check the
//! change detection, failure tolerance, merge and cancellation behavior.

mod common;

use common::{numbered_catalog, shared, summary, FakeNqeApi, RecordingReporter};
use fwdnet_core::{
    CancellationToken, CatalogSync, FwdError, PriorCommitCache, Repository, RepositoryOutcome,
    SyncOptions,
};
use std::collections::HashSet;
use std::sync::Arc;

fn cache(entries: &[(&str, &str)]) -> PriorCommitCache {
    entries
        .iter()
        .map(|(path, commit)| (path.to_string(), commit.to_string()))
        .collect()
}

#[tokio::test]
async fn test_unchanged_entries_are_skipped() {
    let api = shared(FakeNqeApi::new().with_catalog(
        Repository::Org,
        vec![summary("/x", "c1", "QX"), summary("/y", "c2", "QY")],
    ));
    let sync = CatalogSync::from_client(api.clone());
    let prior = cache(&[("/x", "c1")]);

    let result = sync
        .sync_repository(Repository::Org, Some(&prior), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.skipped_count, 1);
    assert_eq!(result.fetched_count, 1);
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].path, "/y");
    assert_eq!(result.items[0].query_id, "QY");
    assert_eq!(api.fetched_paths(Repository::Org), vec!["/y".to_string()]);
}

#[tokio::test]
async fn test_changed_commit_is_refetched_at_new_commit() {
    let api = shared(
        FakeNqeApi::new().with_catalog(Repository::Fwd, vec![summary("/x", "c2", "QX")]),
    );
    let sync = CatalogSync::from_client(api.clone());
    let prior = cache(&[("/x", "c1")]);

    let result = sync
        .sync_repository(Repository::Fwd, Some(&prior), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.fetched_count, 1);
    assert_eq!(result.skipped_count, 0);
    assert_eq!(
        api.fetched(),
        vec![(Repository::Fwd, "c2".to_string(), "/x".to_string())]
    );
}

#[tokio::test]
async fn test_missing_or_empty_cache_fetches_everything() {
    let api = shared(FakeNqeApi::new().with_catalog(Repository::Org, numbered_catalog(5)));
    let sync = CatalogSync::from_client(api.clone());
    let cancel = CancellationToken::new();

    let without = sync
        .sync_repository(Repository::Org, None, &cancel)
        .await
        .unwrap();
    let empty = PriorCommitCache::new();
    let with_empty = sync
        .sync_repository(Repository::Org, Some(&empty), &cancel)
        .await
        .unwrap();

    assert_eq!(without.fetched_count, 5);
    assert_eq!(with_empty.fetched_count, 5);
    assert_eq!(without.skipped_count + with_empty.skipped_count, 0);
    assert_eq!(api.detail_calls(), 10);
}

#[tokio::test]
async fn test_item_failures_are_counted_not_fatal() {
    let api = shared(
        FakeNqeApi::new()
            .with_catalog(
                Repository::Org,
                vec![
                    summary("/a", "c1", "QA"),
                    summary("/b", "c1", "QB"),
                    summary("/c", "c1", "QC"),
                ],
            )
            .with_failing_path("/b"),
    );
    let reporter = Arc::new(RecordingReporter::default());
    let sync = CatalogSync::from_client(api.clone()).with_reporter(reporter.clone());

    let result = sync
        .sync_repository(Repository::Org, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.fetched_count, 2);
    assert_eq!(result.failed_count, 1);
    let example = result.first_failure_example.unwrap();
    assert!(example.starts_with("/b: "));
    assert!(example.contains("404"));
    assert_eq!(
        *reporter.item_failures.lock().unwrap(),
        vec![(Repository::Org, "/b".to_string())]
    );

    // Catalog order is preserved for the successes
    let paths: Vec<_> = result.items.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, vec!["/a", "/c"]);
}

#[tokio::test]
async fn test_missing_commit_id_is_backfilled_from_catalog() {
    let api = shared(
        FakeNqeApi::new()
            .with_catalog(Repository::Fwd, vec![summary("/a", "c9", "QA")])
            .with_blank_commit_ids(),
    );
    let sync = CatalogSync::from_client(api);

    let report = sync
        .sync_all_repositories(None, &CancellationToken::new())
        .await
        .unwrap();

    let detail = report.catalog.get("QA").unwrap();
    assert_eq!(detail.last_commit.id, "c9");
    assert_eq!(report.next_commit_cache(None), cache(&[("/a", "c9")]));
}

#[tokio::test]
async fn test_org_takes_precedence_in_merge() {
    let api = shared(
        FakeNqeApi::new()
            .with_catalog(
                Repository::Org,
                vec![summary("/org/shared", "o1", "Q_SHARED"), summary("/org/only", "o1", "Q_ORG")],
            )
            .with_catalog(
                Repository::Fwd,
                vec![summary("/fwd/shared", "f1", "Q_SHARED"), summary("/fwd/only", "f1", "Q_FWD")],
            ),
    );
    let sync = CatalogSync::from_client(api);

    let report = sync
        .sync_all_repositories(None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.catalog.len(), 3);
    let shared_entry = report.catalog.get("Q_SHARED").unwrap();
    assert_eq!(shared_entry.repository, Repository::Org);
    assert_eq!(shared_entry.path, "/org/shared");
    assert_eq!(report.catalog.get("Q_FWD").unwrap().repository, Repository::Fwd);
    assert_eq!(report.catalog.get("Q_ORG").unwrap().repository, Repository::Org);
}

#[tokio::test]
async fn test_one_repository_failure_degrades() {
    let api = shared(
        FakeNqeApi::new()
            .with_catalog(Repository::Fwd, vec![summary("/a", "c1", "QA")])
            .with_catalog_error(Repository::Org, 403),
    );
    let reporter = Arc::new(RecordingReporter::default());
    let sync = CatalogSync::from_client(api).with_reporter(reporter.clone());

    let report = sync
        .sync_all_repositories(None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.catalog.len(), 1);
    assert!(report.org.is_failed());
    assert!(matches!(report.fwd, RepositoryOutcome::Synced { fetched: 1, .. }));
    assert_eq!(
        *reporter.repository_failures.lock().unwrap(),
        vec![Repository::Org]
    );
}

#[tokio::test]
async fn test_both_repository_failures_error() {
    let api = shared(
        FakeNqeApi::new()
            .with_catalog_error(Repository::Org, 403)
            .with_catalog_error(Repository::Fwd, 401),
    );
    let sync = CatalogSync::from_client(api);

    let err = sync
        .sync_all_repositories(None, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        FwdError::AllRepositoriesFailed { org, fwd } => {
            assert!(org.contains("403"));
            assert!(fwd.contains("401"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_cancellation_mid_sync_stops_fetching() {
    let cancel = CancellationToken::new();
    let api = shared(
        FakeNqeApi::new()
            .with_catalog(Repository::Org, numbered_catalog(200))
            .cancel_after(50, cancel.clone()),
    );
    let sync = CatalogSync::from_client(api.clone());

    let err = sync
        .sync_repository(Repository::Org, None, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(api.detail_calls(), 50);
}

#[tokio::test]
async fn test_cancellation_fails_whole_sync() {
    let cancel = CancellationToken::new();
    let api = shared(
        FakeNqeApi::new()
            .with_catalog(Repository::Org, numbered_catalog(200))
            .with_catalog(Repository::Fwd, numbered_catalog(200))
            .cancel_after(10, cancel.clone()),
    );
    let sync = CatalogSync::from_client(api.clone());

    let err = sync.sync_all_repositories(None, &cancel).await.unwrap_err();

    assert!(matches!(err, FwdError::Cancelled));
    assert!(api.detail_calls() < 400);
}

#[tokio::test]
async fn test_already_cancelled_makes_no_calls() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let api = shared(FakeNqeApi::new().with_catalog(Repository::Org, numbered_catalog(3)));
    let sync = CatalogSync::from_client(api.clone());

    let err = sync.sync_all_repositories(None, &cancel).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(api.detail_calls(), 0);
}

#[tokio::test]
async fn test_progress_reported_every_interval() {
    let api = shared(FakeNqeApi::new().with_catalog(Repository::Fwd, numbered_catalog(250)));
    let reporter = Arc::new(RecordingReporter::default());
    let sync = CatalogSync::from_client(api).with_reporter(reporter.clone());

    sync.sync_repository(Repository::Fwd, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        *reporter.progress.lock().unwrap(),
        vec![(Repository::Fwd, 100, 250), (Repository::Fwd, 200, 250)]
    );
    assert_eq!(
        *reporter.finished.lock().unwrap(),
        vec![(Repository::Fwd, 250, 0, 0)]
    );
}

#[tokio::test]
async fn test_concurrent_fetch_matches_sequential() {
    let catalog = numbered_catalog(40);
    let build = || {
        shared(
            FakeNqeApi::new()
                .with_catalog(Repository::Org, catalog.clone())
                .with_failing_path("/q/0007")
                .with_failing_path("/q/0031"),
        )
    };
    let cancel = CancellationToken::new();

    let sequential = CatalogSync::from_client(build())
        .sync_repository(Repository::Org, None, &cancel)
        .await
        .unwrap();
    let concurrent = CatalogSync::from_client(build())
        .with_options(SyncOptions {
            concurrency: 8,
            ..SyncOptions::default()
        })
        .sync_repository(Repository::Org, None, &cancel)
        .await
        .unwrap();

    assert_eq!(sequential.fetched_count, concurrent.fetched_count);
    assert_eq!(sequential.failed_count, 2);
    assert_eq!(concurrent.failed_count, 2);

    let ids = |items: &[fwdnet_core::QueryDetail]| -> HashSet<String> {
        items.iter().map(|d| d.query_id.clone()).collect()
    };
    assert_eq!(ids(&sequential.items), ids(&concurrent.items));
}

#[tokio::test]
async fn test_second_sync_with_next_commit_cache_skips_everything() {
    let api = shared(
        FakeNqeApi::new()
            .with_catalog(Repository::Org, numbered_catalog(3))
            .with_catalog(Repository::Fwd, vec![summary("/fwd/a", "f1", "QF")]),
    );
    let sync = CatalogSync::from_client(api.clone());
    let cancel = CancellationToken::new();

    let first = sync.sync_all_repositories(None, &cancel).await.unwrap();
    let index = first.next_commit_cache(None);
    let second = sync
        .sync_all_repositories(Some(&index), &cancel)
        .await
        .unwrap();

    assert_eq!(api.detail_calls(), 4);
    assert!(second.catalog.is_empty());
    assert!(matches!(
        second.org,
        RepositoryOutcome::Synced { fetched: 0, skipped: 3, .. }
    ));
}

#[tokio::test]
async fn test_repeated_syncs_skip_shadowed_and_skipped_entries() {
    // Both repositories hold Q1, so the fwd copy never reaches the catalog
    let api = shared(
        FakeNqeApi::new()
            .with_catalog(
                Repository::Org,
                vec![summary("/org/q", "o1", "Q1"), summary("/org/x", "o1", "QX")],
            )
            .with_catalog(
                Repository::Fwd,
                vec![summary("/fwd/q", "f1", "Q1"), summary("/fwd/y", "f1", "QY")],
            ),
    );
    let sync = CatalogSync::from_client(api.clone());
    let cancel = CancellationToken::new();

    let first = sync.sync_all_repositories(None, &cancel).await.unwrap();
    assert_eq!(first.catalog.len(), 3);
    assert_eq!(api.detail_calls(), 4);
    let first_cache = first.next_commit_cache(None);
    assert_eq!(first_cache.get("/fwd/q").map(String::as_str), Some("f1"));

    let second = sync
        .sync_all_repositories(Some(&first_cache), &cancel)
        .await
        .unwrap();
    let second_cache = second.next_commit_cache(Some(&first_cache));
    assert_eq!(second_cache, first_cache);

    let third = sync
        .sync_all_repositories(Some(&second_cache), &cancel)
        .await
        .unwrap();

    assert_eq!(api.detail_calls(), 4);
    assert!(third.catalog.is_empty());
    for outcome in [&third.org, &third.fwd] {
        assert!(matches!(
            outcome,
            RepositoryOutcome::Synced { fetched: 0, skipped: 2, failed: 0, .. }
        ));
    }
    assert_eq!(third.next_commit_cache(Some(&second_cache)), first_cache);
}

#[tokio::test]
async fn test_next_commit_cache_records_only_changed_entries_over_prior() {
    let api = shared(FakeNqeApi::new().with_catalog(
        Repository::Org,
        vec![summary("/a", "c1", "QA"), summary("/b", "c3", "QB")],
    ));
    let sync = CatalogSync::from_client(api.clone());
    let prior = cache(&[("/a", "c1"), ("/b", "c2")]);

    let report = sync
        .sync_all_repositories(Some(&prior), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(api.detail_calls(), 1);
    assert_eq!(report.fetched_commits, cache(&[("/b", "c3")]));
    assert_eq!(
        report.next_commit_cache(Some(&prior)),
        cache(&[("/a", "c1"), ("/b", "c3")])
    );
}

#[tokio::test]
async fn test_repeated_catalog_entries_count_as_skipped() {
    let catalog = vec![
        summary("/a", "c1", "QA"),
        summary("/a", "c1", "QA"),
        summary("/b", "c2", "QB"),
    ];
    let api = shared(FakeNqeApi::new().with_catalog(Repository::Org, catalog.clone()));
    let sync = CatalogSync::from_client(api.clone());

    let result = sync
        .sync_repository(Repository::Org, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(api.detail_calls(), 2);
    assert_eq!(result.fetched_count, 2);
    assert_eq!(result.skipped_count, 1);
    assert_eq!(
        result.fetched_count + result.skipped_count + result.failed_count,
        catalog.len()
    );
}
