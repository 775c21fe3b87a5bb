//! Core data types shared by the secret management components

mod profile;

pub use profile::{
    AuthMode, ConnectionId, ConnectionProfile, QUICK_CONNECT_ID, QUICK_CONNECT_NAME,
};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of secret stored for a connection
///
/// At most one secret of each kind is stored per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretKind {
    /// Login password
    Password,
    /// Passphrase protecting an SSH private key
    SshKeyPassphrase,
}

impl SecretKind {
    /// All secret kinds, in storage order
    pub const ALL: [Self; 2] = [Self::Password, Self::SshKeyPassphrase];

    /// Suffix used in durable store target keys
    #[must_use]
    pub const fn target_suffix(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::SshKeyPassphrase => "sshKeyPassphrase",
        }
    }

    /// Human-readable label for prompts
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::SshKeyPassphrase => "SSH key passphrase",
        }
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target_suffix())
    }
}

impl std::str::FromStr for SecretKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "password" => Ok(Self::Password),
            "passphrase" | "sshkeypassphrase" | "ssh-key-passphrase" | "ssh_key_passphrase" => {
                Ok(Self::SshKeyPassphrase)
            }
            _ => Err(format!("unknown secret kind: {s}")),
        }
    }
}

/// Opaque handle of the window that owns a dialog or biometric prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WindowHandle(pub u64);

impl WindowHandle {
    /// Handle used when no parent window exists
    pub const NONE: Self = Self(0);

    /// Returns true if this refers to no window
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}
