//! Merge of the org and fwd sync results into one catalog.
//!
//! Entries are keyed by query ID. fwd entries are seeded first and org
//! entries overlay them, so org always wins a conflict no matter which sync
//! finished first.

use super::types::{
    fetched_commits, MergedCatalog, Repository, RepositoryOutcome, SyncReport, SyncResult,
};
use crate::error::{FwdError, Result};
use crate::report::DynReporter;

/// Merge two repository results, org taking precedence on query ID conflicts.
pub fn merge_all(org: SyncResult, fwd: SyncResult) -> MergedCatalog {
    let mut catalog = MergedCatalog::new();
    for mut detail in fwd.items {
        detail.repository = Repository::Fwd;
        catalog.upsert(detail);
    }
    for mut detail in org.items {
        detail.repository = Repository::Org;
        catalog.upsert(detail);
    }
    catalog
}

/// Applies the degrade-gracefully policy around [`merge_all`].
pub struct CatalogMerger {
    reporter: DynReporter,
}

impl CatalogMerger {
    pub fn new(reporter: DynReporter) -> Self {
        Self { reporter }
    }

    /// Merge per-repository outcomes.
    ///
    /// Cancellation on either side cancels the merge. A single failed
    /// repository contributes an empty result; two failures are an error.
    pub fn merge_outcomes(
        &self,
        org: Result<SyncResult>,
        fwd: Result<SyncResult>,
    ) -> Result<SyncReport> {
        if matches!(org, Err(FwdError::Cancelled)) || matches!(fwd, Err(FwdError::Cancelled)) {
            return Err(FwdError::Cancelled);
        }

        match (org, fwd) {
            (Err(org_err), Err(fwd_err)) => {
                self.reporter.repository_failed(Repository::Org, &org_err);
                self.reporter.repository_failed(Repository::Fwd, &fwd_err);
                Err(FwdError::AllRepositoriesFailed {
                    org: org_err.to_string(),
                    fwd: fwd_err.to_string(),
                })
            }
            (org, fwd) => {
                let (org, org_outcome) = self.settle(Repository::Org, org);
                let (fwd, fwd_outcome) = self.settle(Repository::Fwd, fwd);
                let fetched_commits = fetched_commits(&org, &fwd);
                Ok(SyncReport {
                    catalog: merge_all(org, fwd),
                    org: org_outcome,
                    fwd: fwd_outcome,
                    fetched_commits,
                })
            }
        }
    }

    fn settle(
        &self,
        repository: Repository,
        outcome: Result<SyncResult>,
    ) -> (SyncResult, RepositoryOutcome) {
        match outcome {
            Ok(result) => {
                let summary = RepositoryOutcome::from_result(&result);
                (result, summary)
            }
            Err(e) => {
                self.reporter.repository_failed(repository, &e);
                (
                    SyncResult::empty(repository),
                    RepositoryOutcome::Failed {
                        error: e.to_string(),
                    },
                )
            }
        }
    }
}
