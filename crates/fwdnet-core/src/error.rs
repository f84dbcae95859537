//! Error types for the Forward API client and NQE sync engine.
//!
//! Network failures are classified at the point a response is received so the
//! retry loop, the sync engine and the RPC layer can each decide what to do
//! without re-inspecting status codes.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for fwdnet.
#[derive(Debug, Error)]
pub enum FwdError {
    #[error("Operation was cancelled")]
    Cancelled,

    /// Non-retryable rejection (4xx other than 429, or any unexpected status).
    #[error("{method} {path} rejected with HTTP {status}{}", body_detail(.status, .body))]
    ClientRejected {
        status: u16,
        method: String,
        path: String,
        body: String,
    },

    /// Server-side or throttling failure (5xx or 429).
    #[error("{method} {path} failed with HTTP {status}{}", body_detail(.status, .body))]
    RetryableServer {
        status: u16,
        method: String,
        path: String,
        body: String,
    },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    #[error("Request failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: Box<FwdError>,
    },

    #[error("All repositories failed to sync (org: {org}; fwd: {fwd})")]
    AllRepositoriesFailed { org: String, fwd: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for fwdnet operations.
pub type Result<T> = std::result::Result<T, FwdError>;

/// Bodies of 400 responses may echo request payloads, so they stay out of
/// the rendered message.
fn body_detail(status: &u16, body: &str) -> String {
    const PREVIEW_LIMIT: usize = 512;

    if *status == 400 || body.is_empty() {
        return String::new();
    }
    let preview: String = body.chars().take(PREVIEW_LIMIT).collect();
    if preview.len() < body.len() {
        format!(": {}...", preview)
    } else {
        format!(": {}", preview)
    }
}

impl From<std::io::Error> for FwdError {
    fn from(err: std::io::Error) -> Self {
        FwdError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for FwdError {
    fn from(err: serde_json::Error) -> Self {
        FwdError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl FwdError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        FwdError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create a decode error for a response body.
    pub fn decode(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        FwdError::Decode {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// Check if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FwdError::RetryableServer { .. } | FwdError::Transport { .. }
        )
    }

    /// Check if this error came from cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FwdError::Cancelled)
    }

    /// HTTP status of the failing response, looking through retry wrapping.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FwdError::ClientRejected { status, .. } | FwdError::RetryableServer { status, .. } => {
                Some(*status)
            }
            FwdError::RetriesExhausted { last_error, .. } => last_error.status_code(),
            _ => None,
        }
    }

    /// Raw response body of the failing response, looking through retry wrapping.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            FwdError::ClientRejected { body, .. } | FwdError::RetryableServer { body, .. } => {
                Some(body.as_str())
            }
            FwdError::RetriesExhausted { last_error, .. } => last_error.response_body(),
            _ => None,
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Custom error codes (application-defined, -32000 to -32099):
    /// - -32000: Network/connectivity error
    /// - -32001: Remote rejected the request
    /// - -32004: Cancelled
    /// - -32005: Configuration error
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            FwdError::RetryableServer { .. }
            | FwdError::Transport { .. }
            | FwdError::RetriesExhausted { .. }
            | FwdError::AllRepositoriesFailed { .. } => -32000,

            FwdError::ClientRejected { .. } => -32001,

            FwdError::Cancelled => -32004,

            FwdError::Config { .. } => -32005,

            FwdError::InvalidParams { .. } => -32602,

            _ => -32603,
        }
    }
}
