//! Reauthentication gate
//!
//! Decides whether a fresh biometric proof of presence must precede
//! releasing a stored secret, and tracks when each connection was last
//! verified. Timestamps live for the process lifetime and are mutated only
//! by the owning thread.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::{SecretError, SecretResult};
use crate::models::{ConnectionId, WindowHandle};
use crate::sync::lock_or_recover;

/// Monotonic time source
pub trait Clock: Send + Sync {
    /// Returns the current instant
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when advanced
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Moves the clock forward
    pub fn advance(&self, by: Duration) {
        *lock_or_recover(&self.offset) += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *lock_or_recover(&self.offset)
    }
}

/// Reauthentication policy read once per secret retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReauthPolicy {
    /// Skip every reauthentication check
    pub bypass_reauth: bool,
    /// How long a verification is trusted; zero means never trusted
    pub timeout_ms: u64,
}

impl ReauthPolicy {
    /// Builds a policy from a timeout in minutes
    #[must_use]
    pub const fn from_minutes(bypass_reauth: bool, timeout_minutes: u32) -> Self {
        Self {
            bypass_reauth,
            timeout_ms: timeout_minutes as u64 * 60_000,
        }
    }
}

/// Tracks biometric verifications per connection
pub struct ReauthGate {
    verified_at: HashMap<ConnectionId, Instant>,
    clock: Arc<dyn Clock>,
}

impl ReauthGate {
    /// Creates a gate using the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates a gate reading time from the given clock
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            verified_at: HashMap::new(),
            clock,
        }
    }

    /// Returns true if a fresh verification is required
    ///
    /// A zero timeout always requires one: zero means a prior verification
    /// is never trusted, not that it never expires.
    #[must_use]
    pub fn should_prompt(
        &self,
        connection_id: &ConnectionId,
        require_reauth: bool,
        bypass_all: bool,
        timeout_ms: u64,
    ) -> bool {
        if !require_reauth || bypass_all {
            return false;
        }
        if timeout_ms == 0 {
            return true;
        }
        match self.verified_at.get(connection_id) {
            Some(at) => {
                let elapsed = self.clock.now().saturating_duration_since(*at);
                elapsed >= Duration::from_millis(timeout_ms)
            }
            None => true,
        }
    }

    /// Convenience form of [`Self::should_prompt`] taking a policy
    #[must_use]
    pub fn should_prompt_with(
        &self,
        connection_id: &ConnectionId,
        require_reauth: bool,
        policy: ReauthPolicy,
    ) -> bool {
        self.should_prompt(
            connection_id,
            require_reauth,
            policy.bypass_reauth,
            policy.timeout_ms,
        )
    }

    /// Records a successful verification
    ///
    /// Call only after the biometric collaborator reported success. Nothing
    /// is recorded under a zero timeout.
    pub fn record_verified(&mut self, connection_id: &ConnectionId, timeout_ms: u64) {
        if timeout_ms == 0 {
            return;
        }
        self.verified_at
            .insert(connection_id.clone(), self.clock.now());
    }

    /// Drops the verification record of a connection
    pub fn forget(&mut self, connection_id: &ConnectionId) {
        self.verified_at.remove(connection_id);
    }

    /// Instant of the last successful verification, if any
    #[must_use]
    pub fn last_verified(&self, connection_id: &ConnectionId) -> Option<Instant> {
        self.verified_at.get(connection_id).copied()
    }
}

impl Default for ReauthGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReauthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReauthGate")
            .field("tracked", &self.verified_at.len())
            .finish_non_exhaustive()
    }
}

/// Outcome reported by the biometric collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricOutcome {
    /// The user's identity was verified
    Verified,
    /// Biometric sign-in is not set up for this user
    NotConfigured,
    /// No biometric device is present
    DeviceAbsent,
    /// Biometrics are disabled by system policy
    DisabledByPolicy,
    /// The user dismissed the prompt
    Cancelled,
}

impl BiometricOutcome {
    /// Returns true for [`Self::Verified`]
    #[must_use]
    pub const fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }

    /// Maps the outcome onto the error taxonomy
    ///
    /// # Errors
    /// Every outcome except `Verified` becomes an error: `Cancelled` maps to
    /// `SecretError::Cancelled`, the rest to `SecretError::Unsupported` with
    /// a distinct reason.
    pub fn into_result(self) -> SecretResult<()> {
        match self {
            Self::Verified => Ok(()),
            Self::NotConfigured => Err(SecretError::Unsupported(
                "biometric sign-in is not configured".to_string(),
            )),
            Self::DeviceAbsent => Err(SecretError::Unsupported(
                "no biometric device is available".to_string(),
            )),
            Self::DisabledByPolicy => Err(SecretError::Unsupported(
                "biometric verification is disabled by policy".to_string(),
            )),
            Self::Cancelled => Err(SecretError::Cancelled(
                "identity verification dismissed".to_string(),
            )),
        }
    }
}

/// External biometric verification mechanism
///
/// The wait is user-interactive and unbounded; the caller races it against
/// a [`super::CancellationToken`].
#[async_trait]
pub trait BiometricVerifier: Send + Sync {
    /// Asks the user to prove presence
    async fn verify(&self, owner: WindowHandle, prompt: &str) -> SecretResult<BiometricOutcome>;
}

/// Verifier for systems without biometric hardware
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBiometrics;

#[async_trait]
impl BiometricVerifier for NoBiometrics {
    async fn verify(&self, _owner: WindowHandle, _prompt: &str) -> SecretResult<BiometricOutcome> {
        Ok(BiometricOutcome::DeviceAbsent)
    }
}
