//! Retrying request executor with exponential backoff.
//!
//! [`RequestExecutor`] wraps a [`Transport`] with:
//! - Error classification (2xx success, 5xx/429 retryable, other statuses rejected)
//! - Exponential backoff capped at [`RetryConfig::max_delay`], optional jitter
//! - Cancellation checks before every attempt, during sends and during sleeps

use super::transport::{RawResponse, RequestDescriptor, Transport};
use crate::cancel::CancellationToken;
use crate::config::SyncConfig;
use crate::error::{FwdError, Result};
use crate::report::{DynReporter, TracingReporter};
use bytes::Bytes;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff policy. The retry budget is chosen per call.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Exponential base (typically 2.0 for doubling).
    pub exponential_base: f64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay: SyncConfig::RETRY_BASE_DELAY,
            max_delay: SyncConfig::RETRY_MAX_DELAY,
            exponential_base: 2.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate the delay after a failed attempt (0-indexed).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let multiplier = self.exponential_base.powi(attempt.min(i32::MAX as u32) as i32);
        let delay_secs = self.base_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());

        let final_secs = if self.jitter {
            // Factor in [0.5, 1.5) keeps the mean delay without near-zero waits
            let jitter_factor = rand::rng().random_range(0.5..1.5);
            (capped_secs * jitter_factor).min(self.max_delay.as_secs_f64())
        } else {
            capped_secs
        };

        Duration::from_secs_f64(final_secs)
    }
}

/// Executes requests against a [`Transport`] with retry and classification.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    retry: RetryConfig,
    reporter: DynReporter,
}

impl RequestExecutor {
    /// Create an executor with the default backoff policy and tracing reporter.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            retry: RetryConfig::default(),
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_reporter(mut self, reporter: DynReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Send `request`, retrying up to `max_retries` times after the first try.
    ///
    /// Returns the body of the first 2xx response. Rejections end the loop
    /// immediately; retryable failures that outlast the budget come back as
    /// [`FwdError::RetriesExhausted`]. Cancellation always yields
    /// [`FwdError::Cancelled`].
    pub async fn execute(
        &self,
        request: &RequestDescriptor,
        max_retries: u32,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        let max_attempts = max_retries.saturating_add(1);
        let mut attempt: u32 = 0;

        loop {
            cancel.check()?;

            let outcome = cancel
                .run_until_cancelled(self.transport.send(request))
                .await?;

            let error = match outcome {
                Ok(response) if response.is_success() => {
                    if attempt > 0 {
                        debug!(
                            "{} {} succeeded after {} attempts",
                            request.method,
                            request.path,
                            attempt + 1
                        );
                    }
                    return Ok(response.body);
                }
                Ok(response) => classify(request, response),
                Err(e) => e,
            };

            if !error.is_retryable() {
                log_rejection(request, &error);
                return Err(error);
            }

            if attempt >= max_retries {
                warn!(
                    "All {} attempts for {} {} exhausted. Last error: {}",
                    max_attempts, request.method, request.path, error
                );
                return Err(FwdError::RetriesExhausted {
                    attempts: max_attempts,
                    last_error: Box::new(error),
                });
            }

            let delay = self.retry.calculate_delay(attempt);
            self.reporter.retry_scheduled(
                &format!("{} {}", request.method, request.path),
                attempt + 1,
                max_attempts,
                delay,
                &error,
            );
            cancel.sleep(delay).await?;
            attempt += 1;
        }
    }

    /// [`execute`](Self::execute) and decode the body as JSON.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
        max_retries: u32,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let body = self.execute(request, max_retries, cancel).await?;
        serde_json::from_slice(&body).map_err(|e| {
            FwdError::decode(format!("{} {}", request.method, request.path), e)
        })
    }
}

/// Map a non-2xx response to its error class.
fn classify(request: &RequestDescriptor, response: RawResponse) -> FwdError {
    let status = response.status;
    let method = request.method.to_string();
    let path = request.path_and_query();
    let body = String::from_utf8_lossy(&response.body).into_owned();

    if status == 429 || status >= 500 {
        FwdError::RetryableServer {
            status,
            method,
            path,
            body,
        }
    } else {
        FwdError::ClientRejected {
            status,
            method,
            path,
            body,
        }
    }
}

fn log_rejection(request: &RequestDescriptor, error: &FwdError) {
    match error {
        FwdError::ClientRejected { status: 400, body, .. } => {
            warn!(
                method = %request.method,
                url = %request.path_and_query(),
                body_bytes = body.len(),
                "Request rejected with HTTP 400"
            );
        }
        FwdError::ClientRejected { .. } => {
            warn!("{}", error);
        }
        _ => {
            warn!("{} {} failed: {}", request.method, request.path, error);
        }
    }
}
