//! Secret policy settings

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::secret::{PolicySource, ReauthPolicy};
use crate::sync::{read_or_recover, write_or_recover};
use crate::tracing::TracingLevel;

/// Directory name under the user's configuration directory
const CONFIG_DIR_NAME: &str = "connkeep";

/// Settings file name
const SETTINGS_FILE_NAME: &str = "secrets.toml";

/// Default trust window after a biometric verification
const DEFAULT_REAUTH_TIMEOUT_MINUTES: u32 = 5;

const fn default_reauth_timeout_minutes() -> u32 {
    DEFAULT_REAUTH_TIMEOUT_MINUTES
}

/// User settings for secret management
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSettings {
    /// Skip biometric reauthentication for every connection
    #[serde(default)]
    pub bypass_reauth: bool,
    /// Minutes a verification is trusted; 0 asks every time
    #[serde(default = "default_reauth_timeout_minutes")]
    pub reauth_timeout_minutes: u32,
    /// Log level used when no `-v` flag is given
    #[serde(default)]
    pub log_level: TracingLevel,
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            bypass_reauth: false,
            reauth_timeout_minutes: DEFAULT_REAUTH_TIMEOUT_MINUTES,
            log_level: TracingLevel::default(),
        }
    }
}

impl SecretSettings {
    /// Loads settings, returning defaults if the file does not exist
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Writes settings as TOML, creating parent directories
    ///
    /// # Errors
    /// Returns an error if the settings cannot be serialized or written.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// Reauthentication policy described by these settings
    #[must_use]
    pub const fn policy(&self) -> ReauthPolicy {
        ReauthPolicy::from_minutes(self.bypass_reauth, self.reauth_timeout_minutes)
    }
}

impl PolicySource for SecretSettings {
    fn reauth_policy(&self) -> ReauthPolicy {
        self.policy()
    }
}

/// Settings file inside a configuration directory
#[must_use]
pub fn settings_path_in(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILE_NAME)
}

/// Default settings file location
///
/// # Errors
/// Returns `ConfigError::NoConfigDir` if the platform has no configuration
/// directory.
pub fn default_settings_path() -> ConfigResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| settings_path_in(&dir.join(CONFIG_DIR_NAME)))
        .ok_or(ConfigError::NoConfigDir)
}

/// Settings shared between the UI and the owner thread
///
/// The UI may replace the settings at any time; the owner reads the policy
/// once per secret retrieval.
#[derive(Debug, Clone, Default)]
pub struct SharedPolicy {
    settings: Arc<RwLock<SecretSettings>>,
}

impl SharedPolicy {
    /// Wraps settings for sharing
    #[must_use]
    pub fn new(settings: SecretSettings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    /// Returns a copy of the current settings
    #[must_use]
    pub fn settings(&self) -> SecretSettings {
        read_or_recover(&self.settings).clone()
    }

    /// Replaces the settings
    pub fn update(&self, settings: SecretSettings) {
        *write_or_recover(&self.settings) = settings;
    }
}

impl PolicySource for SharedPolicy {
    fn reauth_policy(&self) -> ReauthPolicy {
        read_or_recover(&self.settings).policy()
    }
}
