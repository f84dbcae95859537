//! NQE catalog sync and query handlers.

use super::{get_str_param, get_typed_param, get_u64_param, require_str_param};
use crate::server::AppState;
use fwdnet_core::{
    CancellationToken, CatalogClient, CrudClient, DetailClient, FwdError, NqeQueryRequest,
    NqeQuerySource, PriorCommitCache, Repository, Result,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// Registry entry for a running sync; unregisters on drop, including when
/// the request future is abandoned.
struct ActiveSync<'a> {
    state: &'a AppState,
    sync_id: String,
    watcher: JoinHandle<()>,
}

impl Drop for ActiveSync<'_> {
    fn drop(&mut self) {
        self.watcher.abort();
        self.state.finish_sync(&self.sync_id);
    }
}

/// Cancel `token` on server shutdown or once `timeout` elapses.
async fn cancel_on(shutdown: CancellationToken, token: CancellationToken, timeout: Option<Duration>) {
    let deadline = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = deadline => {
            info!("Sync deadline of {:?} reached", timeout);
        }
    }
    token.cancel();
}

fn parse_repository(params: &Value) -> Result<Repository> {
    let raw = require_str_param(params, "repository", "repository")?;
    Repository::from_str(&raw).ok_or_else(|| FwdError::InvalidParams {
        message: format!("Unknown repository '{}' (expected org or fwd)", raw),
    })
}

pub async fn sync_nqe_catalog(state: &AppState, params: &Value) -> Result<Value> {
    let prior: Option<PriorCommitCache> =
        get_typed_param(params, "prior_commits", "priorCommits")?;
    let timeout = get_u64_param(params, "timeout_secs", "timeoutSecs")?.map(Duration::from_secs);
    let sync_id = match get_str_param(params, "sync_id", "syncId") {
        Some(id) => id.to_string(),
        None => state.generate_sync_id(),
    };

    let token = state
        .register_sync(&sync_id)
        .ok_or_else(|| FwdError::InvalidParams {
            message: format!("Sync {} is already running", sync_id),
        })?;
    let _active = ActiveSync {
        state,
        sync_id: sync_id.clone(),
        watcher: tokio::spawn(cancel_on(state.shutdown.clone(), token.clone(), timeout)),
    };

    info!(
        "Starting NQE catalog sync {} ({} cached commits)",
        sync_id,
        prior.as_ref().map_or(0, |p| p.len())
    );
    let report = state
        .sync
        .sync_all_repositories(prior.as_ref(), &token)
        .await?;
    info!("Sync {} finished with {} queries", sync_id, report.catalog.len());

    let commit_index = report.next_commit_cache(prior.as_ref());
    Ok(json!({
        "sync_id": sync_id,
        "catalog": report.catalog,
        "org": report.org,
        "fwd": report.fwd,
        "commit_index": commit_index,
    }))
}

pub async fn cancel_sync(state: &AppState, params: &Value) -> Result<Value> {
    let sync_id = require_str_param(params, "sync_id", "syncId")?;
    if !state.cancel_sync(&sync_id) {
        return Err(FwdError::InvalidParams {
            message: format!("No running sync with ID {}", sync_id),
        });
    }
    info!("Cancellation requested for sync {}", sync_id);
    Ok(json!({"sync_id": sync_id, "cancelled": true}))
}

pub async fn list_nqe_catalog(state: &AppState, params: &Value) -> Result<Value> {
    let repository = parse_repository(params)?;
    let queries = state
        .client
        .fetch_catalog(repository, &state.shutdown)
        .await?;
    Ok(json!({
        "repository": repository,
        "count": queries.len(),
        "queries": queries,
    }))
}

pub async fn get_nqe_query(state: &AppState, params: &Value) -> Result<Value> {
    let repository = parse_repository(params)?;
    let commit_id = require_str_param(params, "commit_id", "commitId")?;
    let path = require_str_param(params, "path", "path")?;
    let detail = state
        .client
        .fetch_detail(&commit_id, &path, repository, &state.shutdown)
        .await?;
    Ok(serde_json::to_value(detail)?)
}

pub async fn run_nqe_query(state: &AppState, params: &Value) -> Result<Value> {
    let network_id = require_str_param(params, "network_id", "networkId")?;
    let source = match (
        get_str_param(params, "query", "query"),
        get_str_param(params, "query_id", "queryId"),
    ) {
        (Some(query), None) => NqeQuerySource::Inline(query.to_string()),
        (None, Some(query_id)) => NqeQuerySource::Stored(query_id.to_string()),
        _ => {
            return Err(FwdError::InvalidParams {
                message: "Exactly one of query or query_id is required".to_string(),
            })
        }
    };
    let parameters: HashMap<String, Value> =
        get_typed_param(params, "parameters", "parameters")?.unwrap_or_default();

    let request = NqeQueryRequest {
        network_id,
        snapshot_id: get_str_param(params, "snapshot_id", "snapshotId").map(String::from),
        source,
        parameters,
    };
    let result = state.client.run_nqe_query(&request, &state.shutdown).await?;
    Ok(serde_json::to_value(result)?)
}
