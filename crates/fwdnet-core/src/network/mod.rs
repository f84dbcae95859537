//! Network plumbing shared by every Forward API call.
//!
//! This module provides:
//! - The [`Transport`] seam and its reqwest implementation
//! - The retrying [`RequestExecutor`] with error classification and backoff

mod retry;
mod transport;

pub use retry::{RequestExecutor, RetryConfig};
pub use transport::{HttpTransport, RawResponse, RequestDescriptor, Transport};
