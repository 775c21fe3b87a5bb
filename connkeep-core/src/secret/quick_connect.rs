//! Ephemeral Quick Connect profile and its secrets
//!
//! Quick Connect is the single, never-persisted profile used for one-off
//! connections. Its secrets never reach the durable store. The store is
//! reachable from any thread: one mutex guards the profile and both secret
//! slots, so every individual field write is atomic, but a profile update
//! followed by a secret update is not a joint transaction.

use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{SecretError, SecretResult};
use crate::models::{ConnectionId, ConnectionProfile, QUICK_CONNECT_NAME, SecretKind};
use crate::sync::lock_or_recover;

#[derive(Default)]
struct QuickConnectState {
    profile: Option<ConnectionProfile>,
    password: Option<SecretString>,
    passphrase: Option<SecretString>,
}

impl QuickConnectState {
    const fn slot(&self, kind: SecretKind) -> &Option<SecretString> {
        match kind {
            SecretKind::Password => &self.password,
            SecretKind::SshKeyPassphrase => &self.passphrase,
        }
    }

    fn slot_mut(&mut self, kind: SecretKind) -> &mut Option<SecretString> {
        match kind {
            SecretKind::Password => &mut self.password,
            SecretKind::SshKeyPassphrase => &mut self.passphrase,
        }
    }
}

/// Forces the reserved identity onto a profile
fn force_reserved_identity(profile: &mut ConnectionProfile) {
    profile.id = ConnectionId::quick_connect();
    profile.name = QUICK_CONNECT_NAME.to_string();
}

/// Holder of the Quick Connect profile and secrets
#[derive(Default)]
pub struct QuickConnectStore {
    state: Mutex<QuickConnectState>,
}

impl QuickConnectStore {
    /// Creates an uninitialized store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the profile on first use
    ///
    /// The first call fixes the reserved id and name and the plugin; later
    /// calls are no-ops even with a different plugin hint.
    pub fn ensure_initialized(&self, preferred_plugin_id: &str) {
        let mut state = lock_or_recover(&self.state);
        if state.profile.is_some() {
            return;
        }
        let mut profile = ConnectionProfile::with_id(
            ConnectionId::quick_connect(),
            QUICK_CONNECT_NAME,
            preferred_plugin_id,
        );
        force_reserved_identity(&mut profile);
        tracing::debug!(plugin_id = %preferred_plugin_id, "Quick Connect profile initialized");
        state.profile = Some(profile);
    }

    /// Returns true once the profile has been created
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        lock_or_recover(&self.state).profile.is_some()
    }

    /// Returns a copy of the profile
    ///
    /// # Errors
    /// Returns `SecretError::NotReady` before [`Self::ensure_initialized`].
    pub fn profile(&self) -> SecretResult<ConnectionProfile> {
        lock_or_recover(&self.state).profile.clone().ok_or_else(|| {
            SecretError::NotReady("Quick Connect profile is not initialized".to_string())
        })
    }

    /// Replaces the profile, forcing the reserved id and name onto it
    pub fn set_profile(&self, mut profile: ConnectionProfile) {
        force_reserved_identity(&mut profile);
        lock_or_recover(&self.state).profile = Some(profile);
    }

    /// Returns an owned copy of a secret
    ///
    /// # Errors
    /// Returns `SecretError::NotFound` if no secret of that kind is held.
    pub fn secret(&self, kind: SecretKind) -> SecretResult<SecretString> {
        lock_or_recover(&self.state)
            .slot(kind)
            .clone()
            .ok_or_else(|| SecretError::NotFound(format!("no Quick Connect {}", kind.label())))
    }

    /// Stores a secret; an empty secret clears the slot
    ///
    /// The replaced secret is wiped when dropped.
    pub fn set_secret(&self, kind: SecretKind, secret: SecretString) {
        let mut state = lock_or_recover(&self.state);
        let slot = state.slot_mut(kind);
        *slot = if secret.expose_secret().is_empty() {
            None
        } else {
            Some(secret)
        };
    }

    /// Wipes a secret slot
    pub fn clear_secret(&self, kind: SecretKind) {
        lock_or_recover(&self.state).slot_mut(kind).take();
    }

    /// Returns true if a secret of that kind is held
    #[must_use]
    pub fn has_secret(&self, kind: SecretKind) -> bool {
        lock_or_recover(&self.state).slot(kind).is_some()
    }

    /// Wipes both secrets and forgets the profile
    pub fn reset(&self) {
        let mut state = lock_or_recover(&self.state);
        *state = QuickConnectState::default();
    }
}

impl std::fmt::Debug for QuickConnectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock_or_recover(&self.state);
        f.debug_struct("QuickConnectStore")
            .field("initialized", &state.profile.is_some())
            .field("has_password", &state.password.is_some())
            .field("has_passphrase", &state.passphrase.is_some())
            .finish()
    }
}
