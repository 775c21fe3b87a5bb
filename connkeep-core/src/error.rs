//! Error types for `ConnKeep` secret management
//!
//! Every store, biometric and dispatch failure is reported as a
//! [`SecretError`] and relayed to the caller unchanged.

use thiserror::Error;

use crate::models::ConnectionId;

/// Errors produced by secret storage, retrieval and dispatch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecretError {
    /// Empty connection id, empty target, or an otherwise malformed request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No secret is stored, or the profile is unknown
    #[error("Not found: {0}")]
    NotFound(String),

    /// The stored blob is corrupt, unparsable, or decodes to an empty secret
    #[error("Stored secret is invalid: {0}")]
    InvalidData(String),

    /// The owning thread or the owner window is not available
    #[error("Secret service not ready: {0}")]
    NotReady(String),

    /// The user dismissed a secret or biometric prompt
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// No biometric hardware, or biometrics disabled by policy
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Store I/O failure or any other unexpected failure
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl SecretError {
    /// Returns true for NotFound
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for Cancelled
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns true for NotReady
    #[must_use]
    pub const fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }

    /// Returns true when the caller should ask the user for the secret again
    ///
    /// Corrupt entries behave like missing ones.
    #[must_use]
    pub const fn should_reprompt(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidData(_))
    }

    /// Returns true when no alert should be shown to the user
    ///
    /// Dismissing a prompt is a silent no-op.
    #[must_use]
    pub const fn is_silent(&self) -> bool {
        self.is_cancelled()
    }

    /// Formats the message shown in an alert for this error
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(_) | Self::InvalidData(_) => {
                "No saved credential is available for this connection.".to_string()
            }
            Self::NotReady(_) => {
                "The credential service is not available right now. Try again.".to_string()
            }
            Self::Unsupported(reason) => format!("Identity verification unavailable: {reason}"),
            other => other.to_string(),
        }
    }
}

/// Result type for secret operations
pub type SecretResult<T> = Result<T, SecretError>;

/// Failure of a bulk commit pass
///
/// The pass stops at the first failing connection; earlier connections
/// stay committed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommitError {
    /// Applying the outcome for one connection failed
    #[error("Failed to commit credentials for connection {connection_id}: {source}")]
    Connection {
        /// Connection whose commit failed
        connection_id: ConnectionId,
        /// Underlying failure
        #[source]
        source: SecretError,
    },

    /// The pass never reached the owning thread
    #[error("Commit could not run: {0}")]
    Dispatch(#[from] SecretError),
}

impl CommitError {
    /// Connection whose commit failed, if the pass ran
    #[must_use]
    pub const fn connection_id(&self) -> Option<&ConnectionId> {
        match self {
            Self::Connection { connection_id, .. } => Some(connection_id),
            Self::Dispatch(_) => None,
        }
    }

    /// Underlying secret error
    #[must_use]
    pub const fn secret_error(&self) -> &SecretError {
        match self {
            Self::Connection { source, .. } | Self::Dispatch(source) => source,
        }
    }
}

/// Errors that can occur while loading or saving settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the settings file
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed
    #[error("Failed to parse settings: {0}")]
    Parse(String),

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(String),

    /// No configuration directory could be determined
    #[error("Configuration directory not found")]
    NoConfigDir,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
