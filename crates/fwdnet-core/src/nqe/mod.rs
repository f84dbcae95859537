//! NQE query catalog synchronization.
//!
//! # Module Organization
//!
//! - [`types`] - Catalog data model and wire structures
//! - [`client`] - Catalog listing and detail fetch capabilities
//! - [`detect`] - Change detection against the caller's commit cache
//! - [`sync`] - Per-repository orchestration and the two-repository entry point
//! - [`merge`] - Org-over-fwd merge and degrade policy

pub mod client;
pub mod detect;
pub mod merge;
pub mod sync;
pub mod types;

pub use client::{CatalogClient, DetailClient};
pub use detect::{partition, Partition};
pub use merge::{merge_all, CatalogMerger};
pub use sync::{CatalogSync, SyncOptions};
pub use types::{
    CommitInfo, MergedCatalog, PriorCommitCache, QueryDetail, QuerySummary, Repository,
    RepositoryOutcome, SyncReport, SyncResult,
};
