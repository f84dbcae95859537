//! Shared in-memory Forward API doubles for the sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use fwdnet_core::{
    CancellationToken, CatalogClient, CommitInfo, DetailClient, FwdError, QueryDetail,
    QuerySummary, Repository, Result, SyncReporter, SyncResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Catalog entry helper.
pub fn summary(path: &str, commit: &str, query_id: &str) -> QuerySummary {
    QuerySummary {
        path: path.to_string(),
        last_commit_id: commit.to_string(),
        query_id: query_id.to_string(),
        source_code_sha: String::new(),
    }
}

/// `count` catalog entries `/q/0000..` with query IDs `Q0000..` at commit `c1`.
pub fn numbered_catalog(count: usize) -> Vec<QuerySummary> {
    (0..count)
        .map(|i| summary(&format!("/q/{:04}", i), "c1", &format!("Q{:04}", i)))
        .collect()
}

/// In-memory NQE repositories.
///
/// Details echo the requested path; entries listed in `failing_paths`
/// answer with a 404 rejection, and a catalog error can be injected per
/// repository.
#[derive(Default)]
pub struct FakeNqeApi {
    catalogs: HashMap<Repository, Vec<QuerySummary>>,
    catalog_errors: HashMap<Repository, u16>,
    failing_paths: HashSet<String>,
    blank_commit_ids: bool,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
    detail_calls: AtomicUsize,
    fetched: Mutex<Vec<(Repository, String, String)>>,
}

impl FakeNqeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, repository: Repository, entries: Vec<QuerySummary>) -> Self {
        self.catalogs.insert(repository, entries);
        self
    }

    pub fn with_catalog_error(mut self, repository: Repository, status: u16) -> Self {
        self.catalog_errors.insert(repository, status);
        self
    }

    pub fn with_failing_path(mut self, path: &str) -> Self {
        self.failing_paths.insert(path.to_string());
        self
    }

    /// Details come back without a last commit ID.
    pub fn with_blank_commit_ids(mut self) -> Self {
        self.blank_commit_ids = true;
        self
    }

    /// Cancel `token` once the n-th detail fetch has completed.
    pub fn cancel_after(self, calls: usize, token: CancellationToken) -> Self {
        *self.cancel_after.lock().unwrap() = Some((calls, token));
        self
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    /// `(repository, commit, path)` of every detail fetch, in call order.
    pub fn fetched(&self) -> Vec<(Repository, String, String)> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn fetched_paths(&self, repository: Repository) -> Vec<String> {
        self.fetched()
            .into_iter()
            .filter(|(repo, _, _)| *repo == repository)
            .map(|(_, _, path)| path)
            .collect()
    }
}

#[async_trait]
impl CatalogClient for FakeNqeApi {
    async fn fetch_catalog(
        &self,
        repository: Repository,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuerySummary>> {
        cancel.check()?;
        if let Some(status) = self.catalog_errors.get(&repository) {
            return Err(FwdError::ClientRejected {
                status: *status,
                method: "GET".to_string(),
                path: format!("/api/nqe/repos/{}/commits/head/queries", repository),
                body: String::new(),
            });
        }
        Ok(self.catalogs.get(&repository).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl DetailClient for FakeNqeApi {
    async fn fetch_detail(
        &self,
        commit_id: &str,
        path: &str,
        repository: Repository,
        cancel: &CancellationToken,
    ) -> Result<QueryDetail> {
        cancel.check()?;
        let calls = self.detail_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.fetched
            .lock()
            .unwrap()
            .push((repository, commit_id.to_string(), path.to_string()));

        if let Some((limit, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if calls >= *limit {
                token.cancel();
            }
        }

        if self.failing_paths.contains(path) {
            return Err(FwdError::ClientRejected {
                status: 404,
                method: "GET".to_string(),
                path: format!("/api/nqe/repos/{}/commits/{}/queries", repository, commit_id),
                body: "query not found".to_string(),
            });
        }

        Ok(QueryDetail {
            query_id: format!("server-{}", path),
            path: path.to_string(),
            source_code: format!("// {}", path),
            intent: String::new(),
            description: String::new(),
            source_code_sha: String::new(),
            commit_count: 1,
            last_commit: CommitInfo {
                id: if self.blank_commit_ids {
                    String::new()
                } else {
                    commit_id.to_string()
                },
                ..CommitInfo::default()
            },
            first_commit: CommitInfo::default(),
            repository,
        })
    }
}

/// Reporter that records progress checkpoints and failures.
#[derive(Default)]
pub struct RecordingReporter {
    pub progress: Mutex<Vec<(Repository, usize, usize)>>,
    pub item_failures: Mutex<Vec<(Repository, String)>>,
    pub repository_failures: Mutex<Vec<Repository>>,
    pub finished: Mutex<Vec<(Repository, usize, usize, usize)>>,
}

impl SyncReporter for RecordingReporter {
    fn progress(&self, repository: Repository, processed: usize, total: usize) {
        self.progress.lock().unwrap().push((repository, processed, total));
    }

    fn item_failed(&self, repository: Repository, path: &str, _error: &FwdError) {
        self.item_failures
            .lock()
            .unwrap()
            .push((repository, path.to_string()));
    }

    fn repository_failed(&self, repository: Repository, _error: &FwdError) {
        self.repository_failures.lock().unwrap().push(repository);
    }

    fn repository_finished(&self, result: &SyncResult) {
        self.finished.lock().unwrap().push((
            result.repository,
            result.fetched_count,
            result.skipped_count,
            result.failed_count,
        ));
    }
}

pub fn shared(api: FakeNqeApi) -> Arc<FakeNqeApi> {
    Arc::new(api)
}
