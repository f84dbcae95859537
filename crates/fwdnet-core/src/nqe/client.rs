//! Catalog and detail capabilities, and their Forward API implementations.

use super::types::{CatalogEnvelope, QueryDetail, QueryDetailResponse, QuerySummary, Repository};
use crate::cancel::CancellationToken;
use crate::client::ForwardClient;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::network::RequestDescriptor;
use async_trait::async_trait;
use tracing::debug;

/// Lists the query catalog of a repository at its head commit.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch_catalog(
        &self,
        repository: Repository,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuerySummary>>;
}

/// Fetches the full record of one query at one commit.
#[async_trait]
pub trait DetailClient: Send + Sync {
    async fn fetch_detail(
        &self,
        commit_id: &str,
        path: &str,
        repository: Repository,
        cancel: &CancellationToken,
    ) -> Result<QueryDetail>;
}

pub(crate) fn catalog_request(repository: Repository) -> RequestDescriptor {
    RequestDescriptor::get(format!(
        "/api/nqe/repos/{}/commits/head/queries",
        repository
    ))
}

pub(crate) fn detail_request(commit_id: &str, path: &str, repository: Repository) -> RequestDescriptor {
    RequestDescriptor::get(format!(
        "/api/nqe/repos/{}/commits/{}/queries",
        repository,
        urlencoding::encode(commit_id)
    ))
    .with_query("path", path)
}

#[async_trait]
impl CatalogClient for ForwardClient {
    async fn fetch_catalog(
        &self,
        repository: Repository,
        cancel: &CancellationToken,
    ) -> Result<Vec<QuerySummary>> {
        let envelope: CatalogEnvelope = self
            .executor()
            .execute_json(
                &catalog_request(repository),
                SyncConfig::CATALOG_MAX_RETRIES,
                cancel,
            )
            .await?;
        let queries = envelope.queries.unwrap_or_default();
        debug!("Listed {} queries in {} repository", queries.len(), repository);
        Ok(queries)
    }
}

#[async_trait]
impl DetailClient for ForwardClient {
    async fn fetch_detail(
        &self,
        commit_id: &str,
        path: &str,
        repository: Repository,
        cancel: &CancellationToken,
    ) -> Result<QueryDetail> {
        let response: QueryDetailResponse = self
            .executor()
            .execute_json(
                &detail_request(commit_id, path, repository),
                SyncConfig::DETAIL_MAX_RETRIES,
                cancel,
            )
            .await?;
        Ok(response.into_detail(repository))
    }
}
