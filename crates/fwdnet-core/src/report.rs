//! Reporting capability passed into the executor, sync engine and merger.
//!
//! Components never reach for a global logger for their lifecycle events;
//! they call the [`SyncReporter`] they were constructed with. The default
//! [`TracingReporter`] forwards everything to `tracing`, and tests inject
//! recording implementations to assert on what was reported.

use crate::error::FwdError;
use crate::nqe::{Repository, SyncResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Receives lifecycle events from a sync. All methods default to no-ops.
pub trait SyncReporter: Send + Sync {
    /// A retryable failure occurred and the executor is about to back off.
    fn retry_scheduled(
        &self,
        _request: &str,
        _attempt: u32,
        _max_attempts: u32,
        _delay: Duration,
        _error: &FwdError,
    ) {
    }

    /// A repository catalog was listed and partitioned.
    fn catalog_scanned(&self, _repository: Repository, _total: usize, _to_fetch: usize, _skipped: usize) {}

    /// Periodic progress through the detail fetches of one repository.
    fn progress(&self, _repository: Repository, _processed: usize, _total: usize) {}

    /// A single detail fetch failed and was skipped.
    fn item_failed(&self, _repository: Repository, _path: &str, _error: &FwdError) {}

    /// A whole repository failed and contributes nothing to the merge.
    fn repository_failed(&self, _repository: Repository, _error: &FwdError) {}

    /// A repository sync completed.
    fn repository_finished(&self, _result: &SyncResult) {}
}

/// Shared reporter handle.
pub type DynReporter = Arc<dyn SyncReporter>;

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl SyncReporter for NoopReporter {}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl SyncReporter for TracingReporter {
    fn retry_scheduled(
        &self,
        request: &str,
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
        error: &FwdError,
    ) {
        warn!(
            "Attempt {}/{} for {} failed: {}. Retrying in {:?}",
            attempt, max_attempts, request, error, delay
        );
    }

    fn catalog_scanned(&self, repository: Repository, total: usize, to_fetch: usize, skipped: usize) {
        info!(
            repository = %repository,
            total,
            to_fetch,
            skipped,
            "NQE catalog scanned"
        );
    }

    fn progress(&self, repository: Repository, processed: usize, total: usize) {
        info!(repository = %repository, processed, total, "NQE detail fetch progress");
    }

    fn item_failed(&self, repository: Repository, path: &str, error: &FwdError) {
        debug!(repository = %repository, path, "Skipping query detail: {}", error);
    }

    fn repository_failed(&self, repository: Repository, error: &FwdError) {
        warn!(repository = %repository, "Repository sync failed, continuing without it: {}", error);
    }

    fn repository_finished(&self, result: &SyncResult) {
        info!(
            repository = %result.repository,
            fetched = result.fetched_count,
            skipped = result.skipped_count,
            failed = result.failed_count,
            "NQE repository sync complete"
        );
        if let Some(example) = &result.first_failure_example {
            warn!(repository = %result.repository, "First detail failure: {}", example);
        }
    }
}
