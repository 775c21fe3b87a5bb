//! Cancellation of user-interactive waits
//!
//! Only the biometric flow is cancellable: a user dismissal or a shutdown
//! that arrives mid-wait trips the token and the wait ends with
//! `SecretError::Cancelled`.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

use crate::error::{SecretError, SecretResult};

#[derive(Default)]
struct TokenState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Token for cancelling a pending interactive wait
///
/// Clones share state: cancelling one cancels all.
#[derive(Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    /// Creates a new, untripped token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels all waits using this token
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    /// Checks if the token has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the token is cancelled
    pub async fn cancelled(&self) {
        loop {
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel is not missed
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Runs a future until it completes or the token is cancelled
    ///
    /// # Errors
    /// Returns `SecretError::Cancelled` if the token trips first, including
    /// when it was already tripped before the call.
    pub async fn run_until_cancelled<F, T>(&self, what: &str, future: F) -> SecretResult<T>
    where
        F: Future<Output = SecretResult<T>>,
    {
        if self.is_cancelled() {
            return Err(SecretError::Cancelled(format!("{what} cancelled")));
        }

        tokio::select! {
            result = future => {
                if self.is_cancelled() {
                    return Err(SecretError::Cancelled(format!("{what} cancelled")));
                }
                result
            }
            () = self.cancelled() => Err(SecretError::Cancelled(format!("{what} cancelled"))),
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
