//! Network, snapshot, device and location handlers.

use super::{get_f64_param, get_str_param, require_str_param};
use crate::server::AppState;
use fwdnet_core::{CrudClient, LocationPatch, NewLocation, Result};
use serde_json::{json, Value};

fn optional_string(params: &Value, snake: &str, camel: &str) -> Option<String> {
    get_str_param(params, snake, camel).map(String::from)
}

pub async fn list_networks(state: &AppState, _params: &Value) -> Result<Value> {
    let networks = state.client.list_networks(&state.shutdown).await?;
    Ok(serde_json::to_value(networks)?)
}

pub async fn create_network(state: &AppState, params: &Value) -> Result<Value> {
    let name = require_str_param(params, "name", "name")?;
    let network = state.client.create_network(&name, &state.shutdown).await?;
    Ok(serde_json::to_value(network)?)
}

pub async fn delete_network(state: &AppState, params: &Value) -> Result<Value> {
    let network_id = require_str_param(params, "network_id", "networkId")?;
    state
        .client
        .delete_network(&network_id, &state.shutdown)
        .await?;
    Ok(json!({"deleted": true, "network_id": network_id}))
}

pub async fn list_snapshots(state: &AppState, params: &Value) -> Result<Value> {
    let network_id = require_str_param(params, "network_id", "networkId")?;
    let snapshots = state
        .client
        .list_snapshots(&network_id, &state.shutdown)
        .await?;
    Ok(serde_json::to_value(snapshots)?)
}

pub async fn latest_snapshot(state: &AppState, params: &Value) -> Result<Value> {
    let network_id = require_str_param(params, "network_id", "networkId")?;
    let snapshot = state
        .client
        .latest_processed_snapshot(&network_id, &state.shutdown)
        .await?;
    Ok(serde_json::to_value(snapshot)?)
}

pub async fn list_devices(state: &AppState, params: &Value) -> Result<Value> {
    let network_id = require_str_param(params, "network_id", "networkId")?;
    let snapshot_id = get_str_param(params, "snapshot_id", "snapshotId");
    let devices = state
        .client
        .list_devices(&network_id, snapshot_id, &state.shutdown)
        .await?;
    Ok(serde_json::to_value(devices)?)
}

pub async fn list_locations(state: &AppState, params: &Value) -> Result<Value> {
    let network_id = require_str_param(params, "network_id", "networkId")?;
    let locations = state
        .client
        .list_locations(&network_id, &state.shutdown)
        .await?;
    Ok(serde_json::to_value(locations)?)
}

pub async fn create_location(state: &AppState, params: &Value) -> Result<Value> {
    let network_id = require_str_param(params, "network_id", "networkId")?;
    let location = NewLocation {
        name: require_str_param(params, "name", "name")?,
        lat: get_f64_param(params, "lat", "lat")?,
        lng: get_f64_param(params, "lng", "lng")?,
        city: optional_string(params, "city", "city"),
        admin_division: optional_string(params, "admin_division", "adminDivision"),
        country: optional_string(params, "country", "country"),
    };
    let created = state
        .client
        .create_location(&network_id, &location, &state.shutdown)
        .await?;
    Ok(serde_json::to_value(created)?)
}

pub async fn update_location(state: &AppState, params: &Value) -> Result<Value> {
    let network_id = require_str_param(params, "network_id", "networkId")?;
    let location_id = require_str_param(params, "location_id", "locationId")?;
    let patch = LocationPatch {
        name: optional_string(params, "name", "name"),
        lat: get_f64_param(params, "lat", "lat")?,
        lng: get_f64_param(params, "lng", "lng")?,
        city: optional_string(params, "city", "city"),
        admin_division: optional_string(params, "admin_division", "adminDivision"),
        country: optional_string(params, "country", "country"),
    };
    let updated = state
        .client
        .update_location(&network_id, &location_id, &patch, &state.shutdown)
        .await?;
    Ok(serde_json::to_value(updated)?)
}

pub async fn delete_location(state: &AppState, params: &Value) -> Result<Value> {
    let network_id = require_str_param(params, "network_id", "networkId")?;
    let location_id = require_str_param(params, "location_id", "locationId")?;
    state
        .client
        .delete_location(&network_id, &location_id, &state.shutdown)
        .await?;
    Ok(json!({"deleted": true, "location_id": location_id}))
}
