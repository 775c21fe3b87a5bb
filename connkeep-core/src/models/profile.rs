//! Connection profile fields read and written by secret management
//!
//! Profiles are owned and persisted elsewhere in the application; this
//! module only models the fields the secret subsystem touches.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SecretKind;

/// Reserved identifier of the Quick Connect profile (the nil UUID)
pub const QUICK_CONNECT_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Display name forced onto the Quick Connect profile
pub const QUICK_CONNECT_NAME: &str = "Quick Connect";

/// Opaque identifier of a connection profile
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Creates an identifier from any string
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a fresh random identifier for a new profile
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the reserved Quick Connect identifier
    #[must_use]
    pub fn quick_connect() -> Self {
        Self(QUICK_CONNECT_ID.to_string())
    }

    /// Returns true if this is the reserved Quick Connect identifier
    #[must_use]
    pub fn is_quick_connect(&self) -> bool {
        self.0 == QUICK_CONNECT_ID
    }

    /// Returns true if the identifier is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

/// How a connection authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Username and password
    #[default]
    Password,
    /// No credentials
    Anonymous,
    /// SSH private key, optionally protected by a passphrase
    SshKey,
}

impl AuthMode {
    /// Secret kind edited by the connection editor's secret field
    ///
    /// Returns `None` for anonymous connections, which have no secret.
    #[must_use]
    pub const fn secret_kind(self) -> Option<SecretKind> {
        match self {
            Self::Password => Some(SecretKind::Password),
            Self::SshKey => Some(SecretKind::SshKeyPassphrase),
            Self::Anonymous => None,
        }
    }
}

/// Connection profile fields used by secret management
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Unique identifier
    pub id: ConnectionId,
    /// Display name
    pub name: String,
    /// Identifier of the filesystem plugin serving this connection
    pub plugin_id: String,
    /// Account name saved alongside the secret
    #[serde(default)]
    pub username: String,
    /// Authentication mode
    #[serde(default)]
    pub auth_mode: AuthMode,
    /// Whether secrets are persisted to the durable store
    #[serde(default)]
    pub save_password: bool,
    /// Whether a fresh identity check must precede releasing a stored secret
    #[serde(default)]
    pub require_reauth: bool,
}

impl ConnectionProfile {
    /// Creates a password-authenticated profile with a fresh identifier
    #[must_use]
    pub fn new(name: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self::with_id(ConnectionId::new_random(), name, plugin_id)
    }

    /// Creates a password-authenticated profile with the given identifier
    #[must_use]
    pub fn with_id(
        id: impl Into<ConnectionId>,
        name: impl Into<String>,
        plugin_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            plugin_id: plugin_id.into(),
            username: String::new(),
            auth_mode: AuthMode::Password,
            save_password: false,
            require_reauth: false,
        }
    }

    /// Sets the account name
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Sets the authentication mode
    #[must_use]
    pub const fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Sets the save-password flag
    #[must_use]
    pub const fn with_save_password(mut self, save_password: bool) -> Self {
        self.save_password = save_password;
        self
    }

    /// Sets the require-reauthentication flag
    #[must_use]
    pub const fn with_require_reauth(mut self, require_reauth: bool) -> Self {
        self.require_reauth = require_reauth;
        self
    }

    /// Returns true if this is the Quick Connect profile
    #[must_use]
    pub fn is_quick_connect(&self) -> bool {
        self.id.is_quick_connect()
    }
}
