//! Durable store key naming
//!
//! Structure: `ConnKeep/Connections/<connection_id>/<password|sshKeyPassphrase>`

use std::fmt;

use crate::models::{ConnectionId, SecretKind};

/// Namespace prefix shared by every target key
pub const APP_NAMESPACE: &str = "ConnKeep";

/// Path segment separating the namespace from connection ids
const CONNECTIONS_SEGMENT: &str = "Connections";

/// Key under which one secret of one connection is stored
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SecretTarget(String);

impl SecretTarget {
    /// Builds the target for a connection and secret kind
    ///
    /// Returns `None` when the connection id is empty. The mapping is
    /// injective over `(connection_id, kind)`: the kind suffixes are never
    /// suffixes of one another, so two keys can only be equal if both the
    /// id and the kind are equal.
    #[must_use]
    pub fn build(connection_id: &ConnectionId, kind: SecretKind) -> Option<Self> {
        if connection_id.is_empty() {
            return None;
        }
        Some(Self(format!(
            "{APP_NAMESPACE}/{CONNECTIONS_SEGMENT}/{connection_id}/{}",
            kind.target_suffix()
        )))
    }

    /// Returns the key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecretTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SecretTarget {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds the target for a connection and secret kind
///
/// Free-function form of [`SecretTarget::build`].
#[must_use]
pub fn build_target(connection_id: &ConnectionId, kind: SecretKind) -> Option<SecretTarget> {
    SecretTarget::build(connection_id, kind)
}
