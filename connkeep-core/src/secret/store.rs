//! Validating adapter over the external secret vault
//!
//! The adapter enforces two rules the vault itself cannot know about:
//! empty secrets are never persisted, and corrupt blobs are never returned
//! as a successful load.
//!
//! Blob format: the secret's UTF-8 bytes followed by exactly one NUL.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::error::{SecretError, SecretResult};

use super::target::SecretTarget;
use super::vault::{SecretVault, VaultEntry};

/// Username and secret read back from the durable store
#[derive(Debug, Clone)]
pub struct StoredSecret {
    /// Account name saved with the secret
    pub username: String,
    /// The secret itself
    pub secret: SecretString,
}

impl StoredSecret {
    /// Exposes the secret for use
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

/// Encodes a secret as a NUL-terminated blob
#[must_use]
pub fn encode_blob(secret: &str) -> Zeroizing<Vec<u8>> {
    let mut blob = Zeroizing::new(Vec::with_capacity(secret.len() + 1));
    blob.extend_from_slice(secret.as_bytes());
    blob.push(0);
    blob
}

/// Decodes a NUL-terminated blob
///
/// # Errors
/// Returns `SecretError::InvalidData` if the blob lacks its terminator,
/// contains an interior NUL, is not UTF-8, or decodes to an empty secret.
pub fn decode_blob(blob: &[u8]) -> SecretResult<SecretString> {
    let Some((&0, body)) = blob.split_last() else {
        return Err(SecretError::InvalidData(
            "stored blob is not NUL-terminated".to_string(),
        ));
    };
    if body.contains(&0) {
        return Err(SecretError::InvalidData(
            "stored blob contains an interior NUL".to_string(),
        ));
    }
    let text = std::str::from_utf8(body)
        .map_err(|e| SecretError::InvalidData(format!("stored blob is not UTF-8: {e}")))?;
    if text.is_empty() {
        return Err(SecretError::InvalidData(
            "stored blob decodes to an empty secret".to_string(),
        ));
    }
    Ok(SecretString::from(text.to_string()))
}

/// Durable secret store adapter
#[derive(Clone)]
pub struct PersistentSecretStore {
    vault: Arc<dyn SecretVault>,
}

impl PersistentSecretStore {
    /// Wraps a vault
    #[must_use]
    pub fn new(vault: Arc<dyn SecretVault>) -> Self {
        Self { vault }
    }

    /// Identifier of the underlying vault
    #[must_use]
    pub fn backend_id(&self) -> &'static str {
        self.vault.backend_id()
    }

    /// Checks if the underlying vault can be used
    pub async fn is_available(&self) -> bool {
        self.vault.is_available().await
    }

    /// Saves a secret under a target
    ///
    /// # Errors
    /// Returns `SecretError::InvalidArgument` for an empty secret or one
    /// containing NUL, without touching the vault; otherwise relays the
    /// vault's error.
    #[instrument(name = "secret.store", skip(self, username, secret), fields(target = %target, backend = self.backend_id()))]
    pub async fn save(
        &self,
        target: &SecretTarget,
        username: &str,
        secret: &SecretString,
    ) -> SecretResult<()> {
        let exposed = secret.expose_secret();
        if exposed.is_empty() {
            return Err(SecretError::InvalidArgument(format!(
                "refusing to persist an empty secret for {target}; delete it instead"
            )));
        }
        if exposed.contains('\0') {
            return Err(SecretError::InvalidArgument(format!(
                "secret for {target} contains a NUL character"
            )));
        }

        let blob = encode_blob(exposed);
        let entry = VaultEntry {
            username: username.to_string(),
            blob,
        };
        self.vault.put(target.as_str(), entry).await?;
        debug!("Secret saved");
        Ok(())
    }

    /// Loads the username and secret stored under a target
    ///
    /// # Errors
    /// Returns `SecretError::NotFound` when nothing is stored and
    /// `SecretError::InvalidData` when the stored blob is corrupt.
    #[instrument(skip(self), fields(target = %target, backend = self.backend_id()))]
    pub async fn load(&self, target: &SecretTarget) -> SecretResult<StoredSecret> {
        let entry = self
            .vault
            .get(target.as_str())
            .await?
            .ok_or_else(|| SecretError::NotFound(format!("no secret stored for {target}")))?;

        let secret = decode_blob(&entry.blob)?;
        Ok(StoredSecret {
            username: entry.username.clone(),
            secret,
        })
    }

    /// Deletes the secret stored under a target
    ///
    /// # Errors
    /// Returns `SecretError::NotFound` when nothing was stored. Callers
    /// that only want the secret gone should use [`Self::delete_if_present`].
    #[instrument(name = "secret.delete", skip(self), fields(target = %target, backend = self.backend_id()))]
    pub async fn delete(&self, target: &SecretTarget) -> SecretResult<()> {
        if self.vault.remove(target.as_str()).await? {
            debug!("Secret deleted");
            Ok(())
        } else {
            Err(SecretError::NotFound(format!(
                "no secret stored for {target}"
            )))
        }
    }

    /// Deletes the secret under a target, treating NotFound as success
    ///
    /// # Errors
    /// Relays any failure other than NotFound.
    pub async fn delete_if_present(&self, target: &SecretTarget) -> SecretResult<()> {
        match self.delete(target).await {
            Err(SecretError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    /// Returns true if a secret is stored under a target, without decoding it
    ///
    /// # Errors
    /// Relays vault failures.
    pub async fn exists(&self, target: &SecretTarget) -> SecretResult<bool> {
        self.vault.contains(target.as_str()).await
    }
}

impl std::fmt::Debug for PersistentSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentSecretStore")
            .field("backend", &self.backend_id())
            .finish()
    }
}
