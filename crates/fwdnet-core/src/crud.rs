//! Plain network, snapshot, device and location operations, plus ad-hoc NQE
//! query execution.
//!
//! These are single request/response wrappers over the same executor the
//! sync engine uses; each endpoint has its own typed request and response
//! structures. The only open-ended map is [`NqeQueryRequest::parameters`].

use crate::cancel::CancellationToken;
use crate::client::ForwardClient;
use crate::config::SyncConfig;
use crate::error::{FwdError, Result};
use crate::network::RequestDescriptor;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A modeled network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// A collected snapshot of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_trigger: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at_millis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotList {
    #[serde(default)]
    snapshots: Vec<Snapshot>,
}

/// A device in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_ips: Option<Vec<String>>,
}

/// A physical location devices can be assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_division: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Body of `POST /api/networks/{id}/locations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLocation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_division: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Body of `PATCH /api/networks/{id}/locations/{locationId}`. Unset fields
/// are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_division: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl LocationPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Either inline NQE source or a stored query ID.
#[derive(Debug, Clone, PartialEq)]
pub enum NqeQuerySource {
    Inline(String),
    Stored(String),
}

/// Ad-hoc NQE execution against a network snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct NqeQueryRequest {
    pub network_id: String,
    /// Latest processed snapshot when unset.
    pub snapshot_id: Option<String>,
    pub source: NqeQuerySource,
    /// Query-defined parameters; values are opaque JSON.
    pub parameters: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NqeQueryBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    query_id: Option<&'a str>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    parameters: &'a HashMap<String, serde_json::Value>,
}

/// Rows returned by an NQE execution. Row shape is defined by the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NqeQueryResult {
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

/// Network, snapshot, device and location operations.
#[async_trait]
pub trait CrudClient: Send + Sync {
    async fn list_networks(&self, cancel: &CancellationToken) -> Result<Vec<Network>>;

    async fn create_network(&self, name: &str, cancel: &CancellationToken) -> Result<Network>;

    async fn delete_network(&self, network_id: &str, cancel: &CancellationToken) -> Result<()>;

    async fn list_snapshots(&self, network_id: &str, cancel: &CancellationToken) -> Result<Vec<Snapshot>>;

    async fn latest_processed_snapshot(
        &self,
        network_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Snapshot>;

    async fn list_devices(
        &self,
        network_id: &str,
        snapshot_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Device>>;

    async fn list_locations(&self, network_id: &str, cancel: &CancellationToken) -> Result<Vec<Location>>;

    async fn create_location(
        &self,
        network_id: &str,
        location: &NewLocation,
        cancel: &CancellationToken,
    ) -> Result<Location>;

    async fn update_location(
        &self,
        network_id: &str,
        location_id: &str,
        patch: &LocationPatch,
        cancel: &CancellationToken,
    ) -> Result<Location>;

    async fn delete_location(
        &self,
        network_id: &str,
        location_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;

    async fn run_nqe_query(
        &self,
        request: &NqeQueryRequest,
        cancel: &CancellationToken,
    ) -> Result<NqeQueryResult>;
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(FwdError::InvalidParams {
            message: format!("{} must not be empty", field),
        });
    }
    Ok(())
}

#[async_trait]
impl CrudClient for ForwardClient {
    async fn list_networks(&self, cancel: &CancellationToken) -> Result<Vec<Network>> {
        let request = RequestDescriptor::get("/api/networks");
        self.executor()
            .execute_json(&request, SyncConfig::CRUD_MAX_RETRIES, cancel)
            .await
    }

    async fn create_network(&self, name: &str, cancel: &CancellationToken) -> Result<Network> {
        require("name", name)?;
        let request = RequestDescriptor::post("/api/networks").with_query("name", name);
        self.executor()
            .execute_json(&request, SyncConfig::CRUD_MAX_RETRIES, cancel)
            .await
    }

    async fn delete_network(&self, network_id: &str, cancel: &CancellationToken) -> Result<()> {
        require("network_id", network_id)?;
        let request = RequestDescriptor::delete(format!("/api/networks/{}", segment(network_id)));
        self.executor()
            .execute(&request, SyncConfig::CRUD_MAX_RETRIES, cancel)
            .await?;
        Ok(())
    }

    async fn list_snapshots(&self, network_id: &str, cancel: &CancellationToken) -> Result<Vec<Snapshot>> {
        require("network_id", network_id)?;
        let request =
            RequestDescriptor::get(format!("/api/networks/{}/snapshots", segment(network_id)));
        let list: SnapshotList = self
            .executor()
            .execute_json(&request, SyncConfig::CRUD_MAX_RETRIES, cancel)
            .await?;
        Ok(list.snapshots)
    }

    async fn latest_processed_snapshot(
        &self,
        network_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Snapshot> {
        require("network_id", network_id)?;
        let request = RequestDescriptor::get(format!(
            "/api/networks/{}/snapshots/latestProcessed",
            segment(network_id)
        ));
        self.executor()
            .execute_json(&request, SyncConfig::CRUD_MAX_RETRIES, cancel)
            .await
    }

    async fn list_devices(
        &self,
        network_id: &str,
        snapshot_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Device>> {
        let path = match snapshot_id {
            Some(snapshot_id) => {
                require("snapshot_id", snapshot_id)?;
                format!("/api/snapshots/{}/devices", segment(snapshot_id))
            }
            None => {
                require("network_id", network_id)?;
                format!("/api/networks/{}/devices", segment(network_id))
            }
        };
        self.executor()
            .execute_json(&RequestDescriptor::get(path), SyncConfig::CRUD_MAX_RETRIES, cancel)
            .await
    }

    async fn list_locations(&self, network_id: &str, cancel: &CancellationToken) -> Result<Vec<Location>> {
        require("network_id", network_id)?;
        let request =
            RequestDescriptor::get(format!("/api/networks/{}/locations", segment(network_id)));
        self.executor()
            .execute_json(&request, SyncConfig::CRUD_MAX_RETRIES, cancel)
            .await
    }

    async fn create_location(
        &self,
        network_id: &str,
        location: &NewLocation,
        cancel: &CancellationToken,
    ) -> Result<Location> {
        require("network_id", network_id)?;
        require("name", &location.name)?;
        let request =
            RequestDescriptor::post(format!("/api/networks/{}/locations", segment(network_id)))
                .with_json(location)?;
        self.executor()
            .execute_json(&request, SyncConfig::CRUD_MAX_RETRIES, cancel)
            .await
    }

    async fn update_location(
        &self,
        network_id: &str,
        location_id: &str,
        patch: &LocationPatch,
        cancel: &CancellationToken,
    ) -> Result<Location> {
        require("network_id", network_id)?;
        require("location_id", location_id)?;
        if patch.is_empty() {
            return Err(FwdError::InvalidParams {
                message: "Location update has no fields to change".to_string(),
            });
        }
        let request = RequestDescriptor::patch(format!(
            "/api/networks/{}/locations/{}",
            segment(network_id),
            segment(location_id)
        ))
        .with_json(patch)?;
        self.executor()
            .execute_json(&request, SyncConfig::CRUD_MAX_RETRIES, cancel)
            .await
    }

    async fn delete_location(
        &self,
        network_id: &str,
        location_id: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        require("network_id", network_id)?;
        require("location_id", location_id)?;
        let request = RequestDescriptor::delete(format!(
            "/api/networks/{}/locations/{}",
            segment(network_id),
            segment(location_id)
        ));
        self.executor()
            .execute(&request, SyncConfig::CRUD_MAX_RETRIES, cancel)
            .await?;
        Ok(())
    }

    async fn run_nqe_query(
        &self,
        request: &NqeQueryRequest,
        cancel: &CancellationToken,
    ) -> Result<NqeQueryResult> {
        require("network_id", &request.network_id)?;
        let (query, query_id) = match &request.source {
            NqeQuerySource::Inline(query) => {
                require("query", query)?;
                (Some(query.as_str()), None)
            }
            NqeQuerySource::Stored(query_id) => {
                require("query_id", query_id)?;
                (None, Some(query_id.as_str()))
            }
        };

        let mut descriptor =
            RequestDescriptor::post("/api/nqe").with_query("networkId", request.network_id.as_str());
        if let Some(snapshot_id) = &request.snapshot_id {
            descriptor = descriptor.with_query("snapshotId", snapshot_id.as_str());
        }
        let descriptor = descriptor.with_json(&NqeQueryBody {
            query,
            query_id,
            parameters: &request.parameters,
        })?;

        self.executor()
            .execute_json(&descriptor, SyncConfig::CRUD_MAX_RETRIES, cancel)
            .await
    }
}
