//! Change detection against the caller's commit-ID cache.

use super::types::{PriorCommitCache, QuerySummary};
use std::collections::HashSet;
use tracing::debug;

/// Catalog split into entries that need a detail fetch and a skip count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Entries to fetch, in catalog order.
    pub to_fetch: Vec<QuerySummary>,
    /// Entries whose cached commit matches the catalog, plus repeats of a
    /// `(path, commit)` pair already queued.
    pub skipped_count: usize,
}

/// Split `catalog` into changed and unchanged entries.
///
/// Without a cache every entry is fetched. With one, an entry is skipped only
/// when its path is cached at exactly the catalog's last commit ID; unknown
/// paths are always fetched. A repeated `(path, commit)` pair in the listing
/// is fetched once and its repeats count as skipped, so `to_fetch.len() +
/// skipped_count == catalog.len()`.
pub fn partition(catalog: &[QuerySummary], prior: Option<&PriorCommitCache>) -> Partition {
    let mut to_fetch = Vec::with_capacity(catalog.len());
    let mut skipped_count = 0;
    let mut seen: HashSet<(&str, &str)> = HashSet::with_capacity(catalog.len());

    for summary in catalog {
        let unchanged = prior
            .and_then(|cache| cache.get(&summary.path))
            .is_some_and(|commit| *commit == summary.last_commit_id);
        if unchanged {
            skipped_count += 1;
            continue;
        }
        if !seen.insert((summary.path.as_str(), summary.last_commit_id.as_str())) {
            debug!("Duplicate catalog entry for {} at {}", summary.path, summary.last_commit_id);
            skipped_count += 1;
            continue;
        }
        to_fetch.push(summary.clone());
    }

    Partition {
        to_fetch,
        skipped_count,
    }
}
