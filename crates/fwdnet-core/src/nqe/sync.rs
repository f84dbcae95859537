//! Incremental, commit-aware sync of the NQE query catalogs.
//!
//! # Algorithm (per repository)
//!
//! 1. **Scan**: list the catalog at head (fatal on failure)
//! 2. **Detect**: drop entries whose cached commit matches
//! 3. **Fetch**: fetch each remaining detail in catalog order; per-item
//!    failures are counted and skipped, cancellation aborts the whole sync
//! 4. **Finalize**: align IDs with the catalog and backfill missing commit IDs
//!
//! Both repositories are synced concurrently by
//! [`CatalogSync::sync_all_repositories`] and merged with org precedence.

use super::client::{CatalogClient, DetailClient};
use super::detect::partition;
use super::merge::CatalogMerger;
use super::types::{PriorCommitCache, QueryDetail, QuerySummary, Repository, SyncReport, SyncResult};
use crate::cancel::CancellationToken;
use crate::config::SyncConfig;
use crate::error::{FwdError, Result};
use crate::report::{DynReporter, SyncReporter, TracingReporter};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Tuning for a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Emit a progress report (and re-check cancellation) every N processed entries.
    pub progress_interval: usize,
    /// Detail fetches in flight per repository. 1 keeps strict catalog order.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            progress_interval: SyncConfig::PROGRESS_INTERVAL,
            concurrency: 1,
        }
    }
}

/// Drives scanner, change detector and detail fetcher for the NQE repositories.
pub struct CatalogSync {
    catalog: Arc<dyn CatalogClient>,
    details: Arc<dyn DetailClient>,
    reporter: DynReporter,
    options: SyncOptions,
}

impl CatalogSync {
    pub fn new(catalog: Arc<dyn CatalogClient>, details: Arc<dyn DetailClient>) -> Self {
        Self {
            catalog,
            details,
            reporter: Arc::new(TracingReporter),
            options: SyncOptions::default(),
        }
    }

    /// Use one client for both catalog listing and detail fetches.
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: CatalogClient + DetailClient + 'static,
    {
        Self::new(client.clone(), client)
    }

    pub fn with_reporter(mut self, reporter: DynReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Sync both repositories and merge them, org taking precedence.
    ///
    /// A repository whose catalog cannot be listed contributes nothing; the
    /// call fails only when both do, or when `cancel` fires.
    pub async fn sync_all_repositories(
        &self,
        prior: Option<&PriorCommitCache>,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let (org, fwd) = tokio::join!(
            self.sync_repository(Repository::Org, prior, cancel),
            self.sync_repository(Repository::Fwd, prior, cancel),
        );
        CatalogMerger::new(self.reporter.clone()).merge_outcomes(org, fwd)
    }

    /// Sync one repository against the caller's commit cache.
    pub async fn sync_repository(
        &self,
        repository: Repository,
        prior: Option<&PriorCommitCache>,
        cancel: &CancellationToken,
    ) -> Result<SyncResult> {
        cancel.check()?;

        let catalog = self.catalog.fetch_catalog(repository, cancel).await?;
        let partition = partition(&catalog, prior);
        self.reporter.catalog_scanned(
            repository,
            catalog.len(),
            partition.to_fetch.len(),
            partition.skipped_count,
        );

        let mut tally = Tally::new(repository, partition.skipped_count, partition.to_fetch.len());
        if self.options.concurrency <= 1 {
            self.fetch_in_order(repository, &partition.to_fetch, &mut tally, cancel)
                .await?;
        } else {
            self.fetch_buffered(repository, &partition.to_fetch, &mut tally, cancel)
                .await?;
        }

        let result = tally.finish();
        self.reporter.repository_finished(&result);
        Ok(result)
    }

    async fn fetch_in_order(
        &self,
        repository: Repository,
        to_fetch: &[QuerySummary],
        tally: &mut Tally,
        cancel: &CancellationToken,
    ) -> Result<()> {
        for summary in to_fetch {
            cancel.check()?;
            let outcome = self
                .details
                .fetch_detail(&summary.last_commit_id, &summary.path, repository, cancel)
                .await;
            tally.record(summary, outcome, self.reporter.as_ref())?;
            self.checkpoint(tally, cancel)?;
        }
        Ok(())
    }

    /// Bounded fan-out. Returning early drops the stream, which abandons the
    /// fetches still in flight and stops pulling new entries.
    async fn fetch_buffered(
        &self,
        repository: Repository,
        to_fetch: &[QuerySummary],
        tally: &mut Tally,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let details = &self.details;
        let mut completions = stream::iter(to_fetch)
            .map(|summary| async move {
                if let Err(e) = cancel.check() {
                    return (summary, Err(FwdError::from(e)));
                }
                let outcome = details
                    .fetch_detail(&summary.last_commit_id, &summary.path, repository, cancel)
                    .await;
                (summary, outcome)
            })
            .buffer_unordered(self.options.concurrency)
            .boxed();

        while let Some((summary, outcome)) = completions.next().await {
            tally.record(summary, outcome, self.reporter.as_ref())?;
            self.checkpoint(tally, cancel)?;
        }
        Ok(())
    }

    fn checkpoint(&self, tally: &Tally, cancel: &CancellationToken) -> Result<()> {
        let interval = self.options.progress_interval;
        if interval > 0 && tally.processed % interval == 0 {
            cancel.check()?;
            self.reporter
                .progress(tally.repository, tally.processed, tally.total);
        }
        Ok(())
    }
}

/// Running counters for one repository sync.
struct Tally {
    repository: Repository,
    items: Vec<QueryDetail>,
    skipped_count: usize,
    failed_count: usize,
    first_failure_example: Option<String>,
    processed: usize,
    total: usize,
}

impl Tally {
    fn new(repository: Repository, skipped_count: usize, total: usize) -> Self {
        Self {
            repository,
            items: Vec::with_capacity(total),
            skipped_count,
            failed_count: 0,
            first_failure_example: None,
            processed: 0,
            total,
        }
    }

    /// Fold one fetch outcome in. Only cancellation is propagated.
    fn record(
        &mut self,
        summary: &QuerySummary,
        outcome: Result<QueryDetail>,
        reporter: &dyn SyncReporter,
    ) -> Result<()> {
        match outcome {
            Ok(detail) => self.items.push(finalize(detail, summary)),
            Err(FwdError::Cancelled) => return Err(FwdError::Cancelled),
            Err(e) => {
                reporter.item_failed(self.repository, &summary.path, &e);
                self.failed_count += 1;
                if self.first_failure_example.is_none() {
                    self.first_failure_example = Some(format!("{}: {}", summary.path, e));
                }
            }
        }
        self.processed += 1;
        Ok(())
    }

    fn finish(self) -> SyncResult {
        SyncResult {
            repository: self.repository,
            fetched_count: self.items.len(),
            items: self.items,
            skipped_count: self.skipped_count,
            failed_count: self.failed_count,
            first_failure_example: self.first_failure_example,
        }
    }
}

/// The catalog is authoritative for identity; the detail may omit its commit ID.
fn finalize(mut detail: QueryDetail, summary: &QuerySummary) -> QueryDetail {
    detail.query_id = summary.query_id.clone();
    detail.path = summary.path.clone();
    if detail.last_commit.id.is_empty() {
        detail.last_commit.id = summary.last_commit_id.clone();
    }
    detail
}
