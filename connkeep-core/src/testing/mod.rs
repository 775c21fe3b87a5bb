//! Scripted collaborators for tests and headless hosts
//!
//! These stand in for the biometric sensor and the secret entry dialog so
//! the owner-side flow can be driven without a desktop session.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::SecretResult;
use crate::models::WindowHandle;
use crate::secret::{BiometricOutcome, BiometricVerifier, PromptRequest, SecretPrompter};
use crate::sync::lock_or_recover;

/// Biometric verifier that reports a preset outcome
#[derive(Debug)]
pub struct ScriptedBiometrics {
    outcome: Mutex<BiometricOutcome>,
    calls: AtomicUsize,
    hang: AtomicBool,
}

impl ScriptedBiometrics {
    /// Creates a verifier reporting `outcome` for every check
    #[must_use]
    pub fn new(outcome: BiometricOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            calls: AtomicUsize::new(0),
            hang: AtomicBool::new(false),
        }
    }

    /// Changes the reported outcome
    pub fn set_outcome(&self, outcome: BiometricOutcome) {
        *lock_or_recover(&self.outcome) = outcome;
    }

    /// Makes every later check wait until cancelled
    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    /// Number of checks started
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BiometricVerifier for ScriptedBiometrics {
    async fn verify(&self, _owner: WindowHandle, _prompt: &str) -> SecretResult<BiometricOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(*lock_or_recover(&self.outcome))
    }
}

/// Secret prompter that answers from a queue
///
/// An empty queue answers as a dismissed dialog.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Option<String>>>,
    requests: Mutex<Vec<PromptRequest>>,
}

impl ScriptedPrompter {
    /// Creates a prompter with no queued answers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next answer; `None` dismisses the dialog
    pub fn push(&self, answer: Option<&str>) {
        lock_or_recover(&self.answers).push_back(answer.map(str::to_string));
    }

    /// Requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<PromptRequest> {
        lock_or_recover(&self.requests).clone()
    }
}

impl SecretPrompter for ScriptedPrompter {
    fn prompt(&self, request: &PromptRequest) -> SecretResult<Option<SecretString>> {
        lock_or_recover(&self.requests).push(request.clone());
        Ok(lock_or_recover(&self.answers)
            .pop_front()
            .flatten()
            .map(SecretString::from))
    }
}
