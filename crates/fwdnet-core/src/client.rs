//! Concrete Forward API client.
//!
//! [`ForwardClient`] owns the retrying executor and implements the focused
//! capability traits: [`CatalogClient`](crate::nqe::CatalogClient),
//! [`DetailClient`](crate::nqe::DetailClient) and
//! [`CrudClient`](crate::crud::CrudClient).

use crate::config::ForwardConfig;
use crate::error::Result;
use crate::network::{HttpTransport, RequestExecutor, RetryConfig, Transport};
use crate::report::DynReporter;
use std::sync::Arc;

/// Forward API client sharing one transport and retry policy across capabilities.
#[derive(Clone)]
pub struct ForwardClient {
    executor: RequestExecutor,
}

impl std::fmt::Debug for ForwardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardClient")
            .field("retry", self.executor.retry_config())
            .finish()
    }
}

impl ForwardClient {
    /// Create a client talking HTTP(S) to the configured instance.
    pub fn new(config: &ForwardConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Create a client on top of any transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            executor: RequestExecutor::new(transport),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.executor = self.executor.with_retry_config(retry);
        self
    }

    pub fn with_reporter(mut self, reporter: DynReporter) -> Self {
        self.executor = self.executor.with_reporter(reporter);
        self
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }
}
