//! Cooperative cancellation token shared by every layer of a sync.
//!
//! A single token is created by the caller and threaded through the sync
//! engine, the request executor and the backoff sleeps. Cancelling any clone
//! is observed by all clones, both by polling (`is_cancelled` / `check`) and
//! by awaiting (`cancelled`), so sleeps and in-flight requests can be
//! interrupted instead of running to completion.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cancellation token for cooperative cancellation of async operations.
///
/// # Example
///
/// ```
/// use fwdnet_core::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// let token_clone = token.clone();
///
/// token_clone.cancel();
/// assert!(token.is_cancelled());
/// assert!(token.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    /// Create a new, live token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every task awaiting [`cancelled`](Self::cancelled).
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Return `Err(CancelledError)` if cancellation has been requested.
    pub fn check(&self) -> Result<(), CancelledError> {
        if self.is_cancelled() {
            Err(CancelledError)
        } else {
            Ok(())
        }
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            // Register before re-checking the flag so a concurrent `cancel()`
            // between the check and the await is not lost.
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Sleep for `duration`, returning early with an error if cancelled.
    pub async fn sleep(&self, duration: Duration) -> Result<(), CancelledError> {
        self.run_until_cancelled(tokio::time::sleep(duration)).await
    }

    /// Drive `future` to completion unless the token is cancelled first.
    ///
    /// A token that is already cancelled never polls the future.
    pub async fn run_until_cancelled<F>(&self, future: F) -> Result<F::Output, CancelledError>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(CancelledError),
            output = future => Ok(output),
        }
    }
}

/// Error returned when an operation is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelledError;

impl std::fmt::Display for CancelledError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation was cancelled")
    }
}

impl std::error::Error for CancelledError {}

impl From<CancelledError> for crate::error::FwdError {
    fn from(_: CancelledError) -> Self {
        crate::error::FwdError::Cancelled
    }
}
