//! External key/value secret vault interface
//!
//! A vault stores opaque blobs by key and knows nothing about blob
//! contents. [`super::PersistentSecretStore`] layers validation on top.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::{SecretError, SecretResult};
use crate::sync::lock_or_recover;

/// One raw entry held by a vault
pub struct VaultEntry {
    /// Account name stored next to the secret
    pub username: String,
    /// Encoded secret blob, wiped on drop
    pub blob: Zeroizing<Vec<u8>>,
}

impl VaultEntry {
    /// Creates an entry
    #[must_use]
    pub fn new(username: impl Into<String>, blob: Vec<u8>) -> Self {
        Self {
            username: username.into(),
            blob: Zeroizing::new(blob),
        }
    }
}

impl Clone for VaultEntry {
    fn clone(&self) -> Self {
        Self {
            username: self.username.clone(),
            blob: Zeroizing::new(self.blob.to_vec()),
        }
    }
}

impl std::fmt::Debug for VaultEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultEntry")
            .field("username", &self.username)
            .field("blob", &format_args!("[{} bytes]", self.blob.len()))
            .finish()
    }
}

/// Encrypted-at-rest key/value store for secret blobs
#[async_trait]
pub trait SecretVault: Send + Sync {
    /// Stores an entry, replacing any existing entry under the key
    async fn put(&self, key: &str, entry: VaultEntry) -> SecretResult<()>;

    /// Reads an entry; `Ok(None)` when the key is absent
    async fn get(&self, key: &str) -> SecretResult<Option<VaultEntry>>;

    /// Removes an entry; `Ok(false)` when the key was absent
    async fn remove(&self, key: &str) -> SecretResult<bool>;

    /// Returns true if an entry exists, without reading the blob
    async fn contains(&self, key: &str) -> SecretResult<bool>;

    /// Checks if the vault can be used on this system
    async fn is_available(&self) -> bool {
        true
    }

    /// Short identifier used in logs
    fn backend_id(&self) -> &'static str;
}

/// In-process vault
///
/// Used by tests and by hosts without a system keyring. Replaced and
/// removed blobs are zeroized.
#[derive(Default)]
pub struct MemoryVault {
    entries: Mutex<HashMap<String, VaultEntry>>,
    put_calls: AtomicUsize,
    read_only: AtomicBool,
}

impl MemoryVault {
    /// Creates an empty vault
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a raw blob without any validation
    ///
    /// Lets callers seed entries exactly as another writer left them,
    /// including corrupt ones.
    pub fn insert_raw(&self, key: impl Into<String>, username: &str, blob: Vec<u8>) {
        lock_or_recover(&self.entries).insert(key.into(), VaultEntry::new(username, blob));
    }

    /// Returns a copy of the raw blob stored under a key
    #[must_use]
    pub fn raw_blob(&self, key: &str) -> Option<Vec<u8>> {
        lock_or_recover(&self.entries)
            .get(key)
            .map(|entry| entry.blob.to_vec())
    }

    /// Number of entries currently stored
    #[must_use]
    pub fn len(&self) -> usize {
        lock_or_recover(&self.entries).len()
    }

    /// Returns true if no entries are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `put` calls received, including rejected ones
    #[must_use]
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Makes every subsequent `put` fail with an I/O error
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }
}

#[async_trait]
impl SecretVault for MemoryVault {
    async fn put(&self, key: &str, entry: VaultEntry) -> SecretResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.read_only.load(Ordering::SeqCst) {
            return Err(SecretError::Unexpected(format!(
                "memory vault is read-only, cannot write {key}"
            )));
        }
        // The displaced entry drops here and its blob is zeroized
        lock_or_recover(&self.entries).insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> SecretResult<Option<VaultEntry>> {
        Ok(lock_or_recover(&self.entries).get(key).cloned())
    }

    async fn remove(&self, key: &str) -> SecretResult<bool> {
        Ok(lock_or_recover(&self.entries).remove(key).is_some())
    }

    async fn contains(&self, key: &str) -> SecretResult<bool> {
        Ok(lock_or_recover(&self.entries).contains_key(key))
    }

    fn backend_id(&self) -> &'static str {
        "memory"
    }
}
