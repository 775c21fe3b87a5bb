//! Shared utility functions used across command modules.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use connkeep_core::config::{default_settings_path, settings_path_in};
use connkeep_core::secret::{KeyringVault, MemoryVault, NoBiometrics, SecretVault, StaticProfiles};
use connkeep_core::{AppContext, AuthMode, ConnectionProfile, SecretKind, SecretSettings};

use crate::error::CliError;
use crate::prompt::TerminalPrompter;

/// Options shared by every command
pub struct SessionOptions {
    /// Custom configuration directory
    pub config_dir: Option<PathBuf>,
    /// Use an in-memory vault instead of the keyring
    pub memory: bool,
    /// Loaded settings
    pub settings: SecretSettings,
}

/// Settings file for the optional custom config directory
pub fn settings_path(config_dir: Option<&Path>) -> Result<PathBuf, CliError> {
    match config_dir {
        Some(dir) => Ok(settings_path_in(dir)),
        None => Ok(default_settings_path()?),
    }
}

/// Loads settings from the optional custom config directory
pub fn load_settings(config_dir: Option<&Path>) -> Result<SecretSettings, CliError> {
    Ok(SecretSettings::load(&settings_path(config_dir)?)?)
}

/// Profile describing the connection a command works on
///
/// The CLI has no profile store; the profile is built from arguments and
/// always saves secrets.
pub fn profile_for(
    connection: &str,
    kind: SecretKind,
    name: Option<&str>,
    user: Option<&str>,
) -> ConnectionProfile {
    let auth_mode = match kind {
        SecretKind::Password => AuthMode::Password,
        SecretKind::SshKeyPassphrase => AuthMode::SshKey,
    };
    ConnectionProfile::with_id(connection, name.unwrap_or(connection), "cli")
        .with_username(user.unwrap_or_default())
        .with_auth_mode(auth_mode)
        .with_save_password(true)
}

/// Starts the secret owner thread for one connection profile
pub fn open_session(
    options: &SessionOptions,
    profile: ConnectionProfile,
    prompter: TerminalPrompter,
) -> Result<AppContext, CliError> {
    let vault: Arc<dyn SecretVault> = if options.memory {
        tracing::debug!("Using in-memory vault");
        Arc::new(MemoryVault::new())
    } else {
        Arc::new(KeyringVault::new())
    };
    let profiles: StaticProfiles = std::iter::once(profile).collect();

    Ok(AppContext::start(
        vault,
        Arc::new(profiles),
        options.settings.clone(),
        Arc::new(NoBiometrics),
        Arc::new(prompter),
    )?)
}
