//! Configuration for `ConnKeep` secret management
//!
//! Settings are stored as TOML under the user's configuration directory.

mod settings;

pub use settings::{SecretSettings, SharedPolicy, default_settings_path, settings_path_in};
