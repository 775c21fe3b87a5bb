//! Per-process session cache of decrypted secrets
//!
//! Any lookup of a connection secret consults this cache before the durable
//! store or the reauthentication flow, so a secret obtained once per
//! session serves every later access. Only the owning thread touches it.

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use zeroize::{Zeroize, Zeroizing};

use crate::models::{ConnectionId, SecretKind};

/// Composite cache key
pub type SecretKey = (ConnectionId, SecretKind);

/// One cached secret slot
///
/// A cleared slot stays in the map as a wiped tombstone: `present` is false
/// and the buffer holds no bytes.
#[derive(Default)]
pub struct SessionCacheEntry {
    present: bool,
    secret: Zeroizing<String>,
}

impl SessionCacheEntry {
    /// Returns true if the slot holds a secret
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.present
    }

    /// Returns true if the backing buffer retains no secret bytes
    #[must_use]
    pub fn is_wiped(&self) -> bool {
        self.secret.is_empty()
    }

    /// Overwrites the buffer and marks the slot absent
    fn wipe(&mut self) {
        self.secret.zeroize();
        self.present = false;
    }

    /// Replaces the secret, wiping the previous buffer first
    fn replace(&mut self, secret: &str) {
        self.secret.zeroize();
        // Grow while empty so no partial copy of the new secret is left behind
        self.secret.reserve(secret.len());
        self.secret.push_str(secret);
        self.present = true;
    }
}

impl std::fmt::Debug for SessionCacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCacheEntry")
            .field("present", &self.present)
            .finish_non_exhaustive()
    }
}

/// Session cache keyed by `(connection, kind)`
#[derive(Debug, Default)]
pub struct SessionSecretCache {
    entries: HashMap<SecretKey, SessionCacheEntry>,
}

impl SessionSecretCache {
    /// Creates an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an owned copy of a cached secret
    ///
    /// The copy is independent of the cached buffer and is wiped when the
    /// caller drops it.
    #[must_use]
    pub fn get(&self, connection_id: &ConnectionId, kind: SecretKind) -> Option<SecretString> {
        self.entries
            .get(&(connection_id.clone(), kind))
            .filter(|entry| entry.present)
            .map(|entry| SecretString::from(entry.secret.as_str().to_string()))
    }

    /// Stores a secret, wiping whatever the slot held before
    ///
    /// An empty secret clears the slot.
    pub fn set(&mut self, connection_id: &ConnectionId, kind: SecretKind, secret: &SecretString) {
        let exposed = secret.expose_secret();
        if exposed.is_empty() {
            self.clear(connection_id, kind);
            return;
        }
        self.entries
            .entry((connection_id.clone(), kind))
            .or_default()
            .replace(exposed);
    }

    /// Wipes one slot
    pub fn clear(&mut self, connection_id: &ConnectionId, kind: SecretKind) {
        if let Some(entry) = self.entries.get_mut(&(connection_id.clone(), kind)) {
            entry.wipe();
        }
    }

    /// Wipes every kind cached for a connection
    pub fn clear_connection(&mut self, connection_id: &ConnectionId) {
        for kind in SecretKind::ALL {
            self.clear(connection_id, kind);
        }
    }

    /// Wipes every slot
    ///
    /// Called once at shutdown.
    pub fn clear_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.wipe();
        }
        tracing::debug!(slots = self.entries.len(), "Session cache wiped");
    }

    /// Returns true if a secret is cached for the slot
    #[must_use]
    pub fn contains(&self, connection_id: &ConnectionId, kind: SecretKind) -> bool {
        self.entries
            .get(&(connection_id.clone(), kind))
            .is_some_and(SessionCacheEntry::is_present)
    }

    /// Inspects a slot, including wiped tombstones
    #[must_use]
    pub fn entry(&self, connection_id: &ConnectionId, kind: SecretKind) -> Option<&SessionCacheEntry> {
        self.entries.get(&(connection_id.clone(), kind))
    }

    /// Iterates over every slot, including wiped tombstones
    pub fn entries(&self) -> impl Iterator<Item = (&SecretKey, &SessionCacheEntry)> {
        self.entries.iter()
    }

    /// Number of slots currently holding a secret
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().filter(|e| e.present).count()
    }

    /// Returns true if no slot holds a secret
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for SessionSecretCache {
    fn drop(&mut self) {
        self.clear_all();
    }
}
