//! HTTP transport for the Forward API.
//!
//! [`Transport`] is the seam between the retrying executor and the wire: it
//! sends exactly one request and reports the raw status and body, leaving all
//! classification to the caller. [`HttpTransport`] is the reqwest-backed
//! implementation with TLS options and basic-auth injection.

use crate::config::{ForwardConfig, SyncConfig};
use crate::error::{FwdError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method};
use serde::Serialize;
use tracing::debug;

/// Everything needed to issue one API request, relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    /// Absolute API path, e.g. `/api/networks`.
    pub path: String,
    /// Query parameters, encoded when the URL is built.
    pub query: Vec<(String, String)>,
    /// JSON body, sent with `Content-Type: application/json`.
    pub body: Option<serde_json::Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a typed JSON body.
    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Path plus encoded query string, as it appears on the wire.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

/// Raw outcome of a request that reached the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a single request. Errors mean the request never produced a response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse>;
}

/// reqwest-backed transport with basic auth on every request.
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport from validated connection settings.
    pub fn new(config: &ForwardConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(SyncConfig::USER_AGENT)
            .danger_accept_invalid_certs(config.insecure_skip_verify);

        if let Some(ca_path) = &config.ca_cert_path {
            let pem = std::fs::read(ca_path).map_err(|e| FwdError::io_with_path(e, ca_path))?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| FwdError::Config {
                message: format!("Invalid CA certificate {}: {}", ca_path.display(), e),
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(|e| FwdError::Config {
            message: format!("Failed to create HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    /// Full URL for a request.
    pub fn url_for(&self, request: &RequestDescriptor) -> Result<url::Url> {
        let raw = format!("{}{}", self.base_url, request.path_and_query());
        url::Url::parse(&raw).map_err(|e| FwdError::Config {
            message: format!("Invalid request URL {}: {}", raw, e),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        let url = self.url_for(request)?;
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .basic_auth(&self.api_key, Some(&self.api_secret));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| FwdError::Transport {
            message: format!("{} {} failed: {}", request.method, request.path, e),
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| FwdError::Transport {
            message: format!(
                "{} {} body read failed: {}",
                request.method, request.path, e
            ),
        })?;

        Ok(RawResponse { status, body })
    }
}
