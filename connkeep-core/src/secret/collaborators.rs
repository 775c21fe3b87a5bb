//! Interfaces to collaborators owned elsewhere in the application
//!
//! Profile persistence, policy settings and the secret entry dialog live
//! outside this crate; the secret service only reads through these traits.

use std::collections::HashMap;
use std::sync::RwLock;

use secrecy::SecretString;

use super::reauth::ReauthPolicy;
use crate::error::SecretResult;
use crate::models::{ConnectionId, ConnectionProfile, SecretKind, WindowHandle};
use crate::sync::{read_or_recover, write_or_recover};

/// Read access to connection profiles
pub trait ProfileDirectory: Send + Sync {
    /// Returns a copy of the profile with the given id
    fn profile(&self, connection_id: &ConnectionId) -> Option<ConnectionProfile>;
}

/// Profile directory backed by an in-memory map
#[derive(Debug, Default)]
pub struct StaticProfiles {
    profiles: RwLock<HashMap<ConnectionId, ConnectionProfile>>,
}

impl StaticProfiles {
    /// Creates an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a profile
    pub fn insert(&self, profile: ConnectionProfile) {
        write_or_recover(&self.profiles).insert(profile.id.clone(), profile);
    }

    /// Removes a profile
    pub fn remove(&self, connection_id: &ConnectionId) -> Option<ConnectionProfile> {
        write_or_recover(&self.profiles).remove(connection_id)
    }

    /// Copies of every profile, sorted by id
    #[must_use]
    pub fn snapshot(&self) -> Vec<ConnectionProfile> {
        let mut profiles: Vec<_> = read_or_recover(&self.profiles).values().cloned().collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles
    }
}

impl FromIterator<ConnectionProfile> for StaticProfiles {
    fn from_iter<I: IntoIterator<Item = ConnectionProfile>>(iter: I) -> Self {
        let profiles = iter.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            profiles: RwLock::new(profiles),
        }
    }
}

impl ProfileDirectory for StaticProfiles {
    fn profile(&self, connection_id: &ConnectionId) -> Option<ConnectionProfile> {
        read_or_recover(&self.profiles).get(connection_id).cloned()
    }
}

/// Source of the reauthentication policy, read once per retrieval
pub trait PolicySource: Send + Sync {
    /// Current policy
    fn reauth_policy(&self) -> ReauthPolicy;
}

impl PolicySource for ReauthPolicy {
    fn reauth_policy(&self) -> ReauthPolicy {
        *self
    }
}

/// Request to ask the user for a secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Display name of the connection
    pub connection_name: String,
    /// Kind of secret requested
    pub kind: SecretKind,
    /// Window the dialog is attached to
    pub owner: WindowHandle,
}

impl PromptRequest {
    /// Message shown in the dialog
    #[must_use]
    pub fn message(&self) -> String {
        format!("Enter the {} for \"{}\"", self.kind.label(), self.connection_name)
    }
}

/// Secret entry dialog
pub trait SecretPrompter: Send + Sync {
    /// Asks the user for a secret; `Ok(None)` means the dialog was dismissed
    ///
    /// # Errors
    /// Returns an error if the dialog cannot be shown.
    fn prompt(&self, request: &PromptRequest) -> SecretResult<Option<SecretString>>;
}

/// Prompter for hosts without a dialog; every prompt is dismissed
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompter;

impl SecretPrompter for NoPrompter {
    fn prompt(&self, request: &PromptRequest) -> SecretResult<Option<SecretString>> {
        tracing::debug!(connection = %request.connection_name, "No prompter available");
        Ok(None)
    }
}
