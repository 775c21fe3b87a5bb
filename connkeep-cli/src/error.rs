//! CLI error types and exit codes.

use connkeep_core::{CommitError, ConfigError, SecretError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, store, or other failures
    pub const GENERAL_ERROR: i32 = 1;
    /// No secret is saved for the connection
    pub const NOT_FOUND: i32 = 2;
    /// The user dismissed a prompt
    pub const CANCELLED: i32 = 3;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Settings could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Secret operation failed
    #[error("{0}")]
    Secret(#[from] SecretError),

    /// Commit pass failed
    #[error("{0}")]
    Commit(#[from] CommitError),
}

impl CliError {
    fn secret_error(&self) -> Option<&SecretError> {
        match self {
            Self::Secret(e) => Some(e),
            Self::Commit(e) => Some(e.secret_error()),
            Self::Config(_) => None,
        }
    }

    /// Returns true when nothing should be printed
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.secret_error().is_some_and(SecretError::is_silent)
    }

    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error
    /// - 2: No saved secret, or the saved one is unreadable
    /// - 3: Prompt dismissed
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.secret_error() {
            Some(SecretError::NotFound(_) | SecretError::InvalidData(_)) => exit_codes::NOT_FOUND,
            Some(SecretError::Cancelled(_)) => exit_codes::CANCELLED,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}
