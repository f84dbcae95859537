//! fwdnet Core - Headless client and NQE catalog sync engine for the Forward
//! Networks API.
//!
//! This crate provides a retrying request executor, an incremental
//! commit-aware sync of the `org` and `fwd` NQE query repositories, and plain
//! network/snapshot/location operations. It can be used programmatically
//! without the RPC layer in `fwdnet-rpc`.
//!
//! # Example
//!
//! ```rust,ignore
//! use fwdnet_core::{CancellationToken, CatalogSync, ForwardClient, ForwardConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> fwdnet_core::Result<()> {
//!     let config = ForwardConfig::load(None)?;
//!     let client = Arc::new(ForwardClient::new(&config)?);
//!     let sync = CatalogSync::from_client(client);
//!
//!     let report = sync
//!         .sync_all_repositories(None, &CancellationToken::new())
//!         .await?;
//!     println!("Synced {} queries", report.catalog.len());
//!
//!     // Feed this back on the next run to skip unchanged queries
//!     let cache = report.next_commit_cache(None);
//!     println!("Cached {} commits", cache.len());
//!
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod client;
pub mod config;
pub mod crud;
pub mod error;
pub mod network;
pub mod nqe;
pub mod report;

// Re-export commonly used types
pub use cancel::{CancellationToken, CancelledError};
pub use client::ForwardClient;
pub use config::{ForwardConfig, SyncConfig};
pub use crud::{
    CrudClient, Device, Location, LocationPatch, Network, NewLocation, NqeQueryRequest,
    NqeQueryResult, NqeQuerySource, Snapshot,
};
pub use error::{FwdError, Result};
pub use network::{RequestExecutor, RetryConfig};
pub use nqe::{
    merge_all, CatalogClient, CatalogMerger, CatalogSync, CommitInfo, DetailClient,
    MergedCatalog, PriorCommitCache, QueryDetail, QuerySummary, Repository, RepositoryOutcome,
    SyncOptions, SyncReport, SyncResult,
};
pub use report::{DynReporter, NoopReporter, SyncReporter, TracingReporter};
