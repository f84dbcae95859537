//! NQE catalog data model and per-endpoint wire structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One of the two remote query repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repository {
    /// Queries authored inside the customer organization.
    Org,
    /// Queries shipped by Forward.
    Fwd,
}

impl Repository {
    pub const ALL: [Repository; 2] = [Repository::Org, Repository::Fwd];

    pub fn as_str(&self) -> &'static str {
        match self {
            Repository::Org => "org",
            Repository::Fwd => "fwd",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "org" => Some(Repository::Org),
            "fwd" => Some(Repository::Fwd),
            _ => None,
        }
    }
}

impl std::fmt::Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog entry without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySummary {
    pub path: String,
    #[serde(alias = "lastCommitID")]
    pub last_commit_id: String,
    #[serde(alias = "queryID")]
    pub query_id: String,
    #[serde(default)]
    pub source_code_sha: String,
}

/// One commit touching a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommitInfo {
    pub id: String,
    pub author_email: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "committedAt", alias = "committedAtEpochMillis")]
    pub committed_at_epoch_millis: i64,
    pub title: String,
    pub body: String,
}

impl CommitInfo {
    /// Commit time as a UTC timestamp, if the epoch value is representable.
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.committed_at_epoch_millis)
    }
}

/// Full record for one query, tagged with the repository it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDetail {
    pub query_id: String,
    pub path: String,
    pub source_code: String,
    pub intent: String,
    pub description: String,
    pub source_code_sha: String,
    pub commit_count: u32,
    pub last_commit: CommitInfo,
    pub first_commit: CommitInfo,
    pub repository: Repository,
}

/// Commit-ID cache owned by the caller: `path → commit ID`.
pub type PriorCommitCache = HashMap<String, String>;

/// Body of `GET /api/nqe/repos/{repo}/commits/head/queries`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatalogEnvelope {
    #[serde(default)]
    pub queries: Option<Vec<QuerySummary>>,
    #[serde(default)]
    #[allow(dead_code)]
    pub access_settings: Option<Vec<serde_json::Value>>,
}

/// Body of `GET /api/nqe/repos/{repo}/commits/{commit}/queries?path=`.
///
/// Carries no repository field; the fetcher tags the decoded record.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct QueryDetailResponse {
    #[serde(alias = "queryID")]
    pub query_id: String,
    pub path: String,
    pub source_code: String,
    pub intent: Option<String>,
    pub description: Option<String>,
    pub source_code_sha: String,
    pub commit_count: u32,
    pub last_commit: Option<CommitInfo>,
    pub first_commit: Option<CommitInfo>,
}

impl QueryDetailResponse {
    pub(crate) fn into_detail(self, repository: Repository) -> QueryDetail {
        QueryDetail {
            query_id: self.query_id,
            path: self.path,
            source_code: self.source_code,
            intent: self.intent.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            source_code_sha: self.source_code_sha,
            commit_count: self.commit_count,
            last_commit: self.last_commit.unwrap_or_default(),
            first_commit: self.first_commit.unwrap_or_default(),
            repository,
        }
    }
}

/// Outcome of syncing one repository.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub repository: Repository,
    pub items: Vec<QueryDetail>,
    pub fetched_count: usize,
    pub skipped_count: usize,
    pub failed_count: usize,
    pub first_failure_example: Option<String>,
}

impl SyncResult {
    pub fn empty(repository: Repository) -> Self {
        Self {
            repository,
            items: Vec::new(),
            fetched_count: 0,
            skipped_count: 0,
            failed_count: 0,
            first_failure_example: None,
        }
    }
}

/// Deduplicated catalog keyed by query ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MergedCatalog {
    entries: HashMap<String, QueryDetail>,
}

impl MergedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, query_id: &str) -> Option<&QueryDetail> {
        self.entries.get(query_id)
    }

    pub fn values(&self) -> impl Iterator<Item = &QueryDetail> {
        self.entries.values()
    }

    pub fn into_inner(self) -> HashMap<String, QueryDetail> {
        self.entries
    }

    /// Insert or replace the entry for `detail.query_id`.
    pub(crate) fn upsert(&mut self, detail: QueryDetail) {
        self.entries.insert(detail.query_id.clone(), detail);
    }
}

/// Per-repository line of a [`SyncReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepositoryOutcome {
    Synced {
        fetched: usize,
        skipped: usize,
        failed: usize,
        first_failure_example: Option<String>,
    },
    /// The catalog could not be listed; the repository contributed nothing.
    Failed { error: String },
}

impl RepositoryOutcome {
    pub(crate) fn from_result(result: &SyncResult) -> Self {
        RepositoryOutcome::Synced {
            fetched: result.fetched_count,
            skipped: result.skipped_count,
            failed: result.failed_count,
            first_failure_example: result.first_failure_example.clone(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, RepositoryOutcome::Failed { .. })
    }
}

/// `path → last commit ID` of every fetched item of both repositories,
/// including fwd entries shadowed by org in the merged catalog.
pub(crate) fn fetched_commits(org: &SyncResult, fwd: &SyncResult) -> PriorCommitCache {
    fwd.items
        .iter()
        .chain(org.items.iter())
        .map(|detail| (detail.path.clone(), detail.last_commit.id.clone()))
        .collect()
}

/// Best-effort result of syncing both repositories.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub catalog: MergedCatalog,
    pub org: RepositoryOutcome,
    pub fwd: RepositoryOutcome,
    /// Commits of everything fetched this pass, before the merge.
    #[serde(skip)]
    pub fetched_commits: PriorCommitCache,
}

impl SyncReport {
    /// The cache to pass into the next sync: `prior` with every fetched
    /// entry laid over it. Skipped entries keep their cached commit.
    pub fn next_commit_cache(&self, prior: Option<&PriorCommitCache>) -> PriorCommitCache {
        let mut next = prior.cloned().unwrap_or_default();
        next.extend(
            self.fetched_commits
                .iter()
                .map(|(path, commit)| (path.clone(), commit.clone())),
        );
        next
    }
}
