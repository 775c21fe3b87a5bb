//! System keyring vault via `secret-tool` (libsecret Secret Service API)
//!
//! Works with GNOME Keyring, KDE Wallet and any other Secret Service
//! provider. Each target is stored as two keyring items distinguished by a
//! `field` attribute: the hex-encoded secret blob and the account name.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use zeroize::Zeroizing;

use crate::error::{SecretError, SecretResult};

use super::vault::{SecretVault, VaultEntry};

/// Application identifier used as the `application` attribute in keyring entries
const APP_ID: &str = "connkeep";

/// `field` attribute value of the item holding the secret blob
const FIELD_SECRET: &str = "secret";

/// `field` attribute value of the item holding the account name
const FIELD_USERNAME: &str = "username";

/// Checks whether `secret-tool` binary is available on the system.
pub async fn is_secret_tool_available() -> bool {
    Command::new("secret-tool")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Vault backed by the desktop keyring
#[derive(Debug, Clone, Default)]
pub struct KeyringVault;

impl KeyringVault {
    /// Creates a keyring vault
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Stores one item under `key`/`field`
    async fn store_item(&self, key: &str, field: &str, value: &[u8]) -> SecretResult<()> {
        let label = format!("ConnKeep {field} for {key}");
        let mut child = Command::new("secret-tool")
            .args([
                "store", "--label", &label, "application", APP_ID, "key", key, "field", field,
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SecretError::Unexpected(format!(
                    "Failed to spawn secret-tool: {e}. Install libsecret-tools."
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(value)
                .await
                .map_err(|e| SecretError::Unexpected(format!("Failed to write secret: {e}")))?;
            // Close stdin so secret-tool sees EOF
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SecretError::Unexpected(format!("Failed to wait for secret-tool: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SecretError::Unexpected(format!(
                "secret-tool store failed: {stderr}"
            )));
        }

        Ok(())
    }

    /// Looks up one item; `Ok(None)` when it does not exist
    async fn lookup_item(&self, key: &str, field: &str) -> SecretResult<Option<Zeroizing<String>>> {
        let output = Command::new("secret-tool")
            .args(["lookup", "application", APP_ID, "key", key, "field", field])
            .output()
            .await
            .map_err(|e| SecretError::Unexpected(format!("Failed to run secret-tool: {e}")))?;

        let stdout = Zeroizing::new(output.stdout);
        if !output.status.success() {
            return match lookup_failure(output.status.code(), &output.stderr) {
                Some(err) => Err(err),
                None => Ok(None),
            };
        }

        let value = Zeroizing::new(strip_line_end(&String::from_utf8_lossy(&stdout)).to_string());
        if value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    /// Clears one item
    async fn clear_item(&self, key: &str, field: &str) -> SecretResult<()> {
        let output = Command::new("secret-tool")
            .args(["clear", "application", APP_ID, "key", key, "field", field])
            .output()
            .await
            .map_err(|e| SecretError::Unexpected(format!("Failed to run secret-tool: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SecretError::Unexpected(format!(
                "secret-tool clear failed: {stderr}"
            )));
        }

        Ok(())
    }
}

/// Classifies a failed `secret-tool lookup`; `None` means the item is absent
///
/// `secret-tool` exits with status 1 and prints nothing when no item
/// matches. Anything else (a locked collection, no D-Bus session, a daemon
/// error) is a store failure.
fn lookup_failure(code: Option<i32>, stderr: &[u8]) -> Option<SecretError> {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if code == Some(1) && stderr.is_empty() {
        return None;
    }
    let detail = if stderr.is_empty() {
        code.map_or_else(|| "terminated by signal".to_string(), |c| format!("exit status {c}"))
    } else {
        stderr.to_string()
    };
    Some(SecretError::Unexpected(format!(
        "secret-tool lookup failed: {detail}"
    )))
}

/// Drops the single line terminator `secret-tool` may print after a value
fn strip_line_end(value: &str) -> &str {
    let value = value.strip_suffix('\n').unwrap_or(value);
    value.strip_suffix('\r').unwrap_or(value)
}

#[async_trait]
impl SecretVault for KeyringVault {
    async fn put(&self, key: &str, entry: VaultEntry) -> SecretResult<()> {
        let encoded = Zeroizing::new(hex::encode(entry.blob.as_slice()));
        self.store_item(key, FIELD_SECRET, encoded.as_bytes()).await?;
        self.store_item(key, FIELD_USERNAME, entry.username.as_bytes())
            .await
    }

    async fn get(&self, key: &str) -> SecretResult<Option<VaultEntry>> {
        let Some(encoded) = self.lookup_item(key, FIELD_SECRET).await? else {
            return Ok(None);
        };

        let blob = hex::decode(encoded.as_str())
            .map_err(|e| SecretError::InvalidData(format!("keyring item for {key}: {e}")))?;

        let username = self
            .lookup_item(key, FIELD_USERNAME)
            .await?
            .map(|u| u.to_string())
            .unwrap_or_default();

        Ok(Some(VaultEntry::new(username, blob)))
    }

    async fn remove(&self, key: &str) -> SecretResult<bool> {
        if !self.contains(key).await? {
            return Ok(false);
        }
        self.clear_item(key, FIELD_SECRET).await?;
        // A missing username item is not worth failing the delete for
        if let Err(e) = self.clear_item(key, FIELD_USERNAME).await {
            tracing::debug!(error = %e, "Username item was not cleared");
        }
        Ok(true)
    }

    async fn contains(&self, key: &str) -> SecretResult<bool> {
        Ok(self.lookup_item(key, FIELD_SECRET).await?.is_some())
    }

    async fn is_available(&self) -> bool {
        is_secret_tool_available().await
    }

    fn backend_id(&self) -> &'static str {
        "keyring"
    }
}
