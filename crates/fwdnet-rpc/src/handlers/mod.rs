//! JSON-RPC request handlers, split by domain.

mod networks;
mod nqe;
mod tools;

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use fwdnet_core::{FwdError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Standard JSON-RPC code for an unknown method.
const METHOD_NOT_FOUND: i32 = -32601;

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }

    /// Error response carrying the HTTP status of a remote rejection, if any.
    fn from_error(id: Option<Value>, err: &FwdError) -> Self {
        let mut response = Self::error(id, err.to_rpc_error_code(), err.to_string());
        if let (Some(error), Some(status)) = (response.error.as_mut(), err.status_code()) {
            error.data = Some(json!({"http_status": status}));
        }
        response
    }
}

// ============================================================================
// Parameter extraction helpers
// ============================================================================

fn lookup<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a Value> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .filter(|v| !v.is_null())
}

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    lookup(params, snake, camel).and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
pub(crate) fn require_str_param(params: &Value, snake: &str, camel: &str) -> Result<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| FwdError::InvalidParams {
            message: format!("Missing required parameter: {}", snake),
        })
}

/// Extract an optional f64 parameter; present but non-numeric is an error.
pub(crate) fn get_f64_param(params: &Value, snake: &str, camel: &str) -> Result<Option<f64>> {
    match lookup(params, snake, camel) {
        None => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| FwdError::InvalidParams {
            message: format!("Parameter {} must be a number", snake),
        }),
    }
}

/// Extract an optional u64 parameter; present but not a non-negative integer is an error.
pub(crate) fn get_u64_param(params: &Value, snake: &str, camel: &str) -> Result<Option<u64>> {
    match lookup(params, snake, camel) {
        None => Ok(None),
        Some(v) => v.as_u64().map(Some).ok_or_else(|| FwdError::InvalidParams {
            message: format!("Parameter {} must be a non-negative integer", snake),
        }),
    }
}

/// Deserialize an optional structured parameter.
pub(crate) fn get_typed_param<T: serde::de::DeserializeOwned>(
    params: &Value,
    snake: &str,
    camel: &str,
) -> Result<Option<T>> {
    match lookup(params, snake, camel) {
        None => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| FwdError::InvalidParams {
                message: format!("Parameter {} is malformed: {}", snake, e),
            }),
    }
}

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    debug!("RPC call: {}", method);

    if tools::find(method).is_none() {
        warn!("Method not found: {}", method);
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", method),
            )),
        );
    }

    match dispatch_method(&state, method, &params).await {
        Ok(value) => (StatusCode::OK, Json(JsonRpcResponse::success(id, value))),
        Err(e) => {
            error!("RPC error for {}: {}", method, e);
            (StatusCode::OK, Json(JsonRpcResponse::from_error(id, &e)))
        }
    }
}

// ============================================================================
// Method dispatcher
// ============================================================================

/// Dispatch a method call to the appropriate domain handler.
async fn dispatch_method(state: &AppState, method: &str, params: &Value) -> Result<Value> {
    match method {
        // Meta
        "health_check" => Ok(json!({"status": "ok"})),
        "list_tools" => Ok(tools::list_tools()),

        // NQE catalog
        "sync_nqe_catalog" => nqe::sync_nqe_catalog(state, params).await,
        "cancel_sync" => nqe::cancel_sync(state, params).await,
        "list_nqe_catalog" => nqe::list_nqe_catalog(state, params).await,
        "get_nqe_query" => nqe::get_nqe_query(state, params).await,
        "run_nqe_query" => nqe::run_nqe_query(state, params).await,

        // Networks, snapshots and devices
        "list_networks" => networks::list_networks(state, params).await,
        "create_network" => networks::create_network(state, params).await,
        "delete_network" => networks::delete_network(state, params).await,
        "list_snapshots" => networks::list_snapshots(state, params).await,
        "latest_snapshot" => networks::latest_snapshot(state, params).await,
        "list_devices" => networks::list_devices(state, params).await,

        // Locations
        "list_locations" => networks::list_locations(state, params).await,
        "create_location" => networks::create_location(state, params).await,
        "update_location" => networks::update_location(state, params).await,
        "delete_location" => networks::delete_location(state, params).await,

        _ => Err(FwdError::InvalidParams {
            message: format!("Method not found: {}", method),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
