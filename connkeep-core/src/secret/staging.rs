//! Reconciliation of in-progress editor changes into store actions
//!
//! The connection editor shows a masked placeholder for a secret that exists
//! in the durable store but was never decrypted into the UI. The reconciler
//! tells apart three field states on commit: an untouched placeholder, a
//! field the user intentionally cleared, and freshly typed text. State is
//! scoped to one editor session and mutated only by the owning thread.

use std::collections::{HashMap, HashSet};

use secrecy::{ExposeSecret, SecretString};

use super::cache::SecretKey;
use crate::models::{AuthMode, ConnectionId, ConnectionProfile, SecretKind};

/// Masked text displayed in place of a stored secret
pub const PLACEHOLDER_TEXT: &str = "\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}\u{2022}";

/// What the editor should do when the secret field gains focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusAction {
    /// Select the placeholder so typing replaces it
    SelectAll,
    /// Leave the field as is
    None,
}

/// Result of staging the displayed field text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// The field was not dirty
    Skipped,
    /// The field still shows the placeholder; the dirty flag was dropped
    PlaceholderKept,
    /// The field was emptied; nothing is staged
    Cleared,
    /// The text was staged under the given kind
    Staged(SecretKind),
}

/// Store action decided for one connection at commit
pub enum CommitAction {
    /// Delete both secret kinds
    Delete,
    /// Persist the staged secret
    Write(SecretString),
    /// Leave the store untouched
    Keep,
}

impl CommitAction {
    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Write(_) => "write",
            Self::Keep => "keep",
        }
    }
}

impl std::fmt::Debug for CommitAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Write(_) => f.write_str("Write([REDACTED])"),
            other => f.write_str(other.name()),
        }
    }
}

/// One step of a commit pass
#[derive(Debug)]
pub struct PlannedCommit {
    /// Connection the action applies to
    pub connection_id: ConnectionId,
    /// Kind edited by the connection's field; `None` for anonymous or removed profiles
    pub kind: Option<SecretKind>,
    /// Account name saved with a written secret
    pub username: String,
    /// Decided action
    pub action: CommitAction,
}

/// Decides the action for one connection
///
/// Turning save-password off always deletes, even with a staged secret.
/// With save-password on and nothing staged the store is left alone: a bare
/// toggle never fabricates a secret.
#[must_use]
pub fn commit_one(
    connection_id: &ConnectionId,
    save_password: bool,
    staged: Option<SecretString>,
    baseline_save_password: bool,
) -> CommitAction {
    if !save_password {
        return CommitAction::Delete;
    }
    match staged {
        Some(secret) if !secret.expose_secret().is_empty() => CommitAction::Write(secret),
        _ => {
            if !baseline_save_password {
                tracing::warn!(
                    connection_id = %connection_id,
                    "Save password enabled without a new secret; it will be requested on connect"
                );
            }
            CommitAction::Keep
        }
    }
}

/// Editor-session state for the secret field
#[derive(Default)]
pub struct StagingReconciler {
    editing: Option<ConnectionId>,
    staged: HashMap<SecretKey, SecretString>,
    dirty: HashSet<ConnectionId>,
    placeholders: HashMap<SecretKey, String>,
}

impl StagingReconciler {
    /// Creates a reconciler with no open session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens an editor session for a connection
    ///
    /// Switching from another connection discards its state first.
    /// Placeholders are seeded for every kind with a stored secret.
    pub fn begin_session(&mut self, connection_id: &ConnectionId, stored_kinds: &[SecretKind]) {
        if self.editing.as_ref() != Some(connection_id) {
            self.clear_state();
            self.editing = Some(connection_id.clone());
        }
        for kind in stored_kinds {
            if !self.staged.contains_key(&(connection_id.clone(), *kind)) {
                self.placeholders
                    .insert((connection_id.clone(), *kind), PLACEHOLDER_TEXT.to_string());
            }
        }
        tracing::debug!(
            connection_id = %connection_id,
            stored = stored_kinds.len(),
            "Editor session opened"
        );
    }

    /// Closes the editor session, wiping staged secrets
    pub fn end_session(&mut self) {
        self.clear_state();
        self.editing = None;
    }

    /// Connection of the open session, if any
    #[must_use]
    pub const fn editing(&self) -> Option<&ConnectionId> {
        self.editing.as_ref()
    }

    fn clear_state(&mut self) {
        self.staged.clear();
        self.dirty.clear();
        self.placeholders.clear();
    }

    /// Placeholder shown for a stored secret, if any
    #[must_use]
    pub fn placeholder(&self, connection_id: &ConnectionId, kind: SecretKind) -> Option<&str> {
        self.placeholders
            .get(&(connection_id.clone(), kind))
            .map(String::as_str)
    }

    /// Field focus; a displayed placeholder is selected without marking dirty
    #[must_use]
    pub fn on_field_focus(
        &self,
        connection_id: &ConnectionId,
        kind: SecretKind,
        displayed_text: &str,
    ) -> FocusAction {
        match self.placeholder(connection_id, kind) {
            Some(placeholder) if placeholder == displayed_text => FocusAction::SelectAll,
            _ => FocusAction::None,
        }
    }

    /// Field edit; marks the connection dirty unconditionally
    pub fn on_field_changed(&mut self, connection_id: &ConnectionId) {
        self.dirty.insert(connection_id.clone());
    }

    /// Returns true if the field changed since load
    #[must_use]
    pub fn is_dirty(&self, connection_id: &ConnectionId) -> bool {
        self.dirty.contains(connection_id)
    }

    /// Stages the displayed field text under the given kind
    pub fn stage(
        &mut self,
        connection_id: &ConnectionId,
        kind: SecretKind,
        displayed_text: &str,
    ) -> StageOutcome {
        if !self.dirty.contains(connection_id) {
            return StageOutcome::Skipped;
        }
        let key = (connection_id.clone(), kind);
        if self
            .placeholders
            .get(&key)
            .is_some_and(|placeholder| placeholder == displayed_text)
        {
            self.dirty.remove(connection_id);
            return StageOutcome::PlaceholderKept;
        }

        self.staged.remove(&key);
        self.placeholders.remove(&key);
        if displayed_text.is_empty() {
            return StageOutcome::Cleared;
        }
        self.staged
            .insert(key, SecretString::from(displayed_text.to_string()));
        StageOutcome::Staged(kind)
    }

    /// Stages under the kind selected by an auth mode; anonymous stages nothing
    pub fn stage_for_mode(
        &mut self,
        connection_id: &ConnectionId,
        auth_mode: AuthMode,
        displayed_text: &str,
    ) -> StageOutcome {
        match auth_mode.secret_kind() {
            Some(kind) => self.stage(connection_id, kind, displayed_text),
            None => StageOutcome::Skipped,
        }
    }

    /// Returns true if a secret is staged for the slot
    #[must_use]
    pub fn has_staged(&self, connection_id: &ConnectionId, kind: SecretKind) -> bool {
        self.staged.contains_key(&(connection_id.clone(), kind))
    }

    /// Number of staged secrets
    #[must_use]
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Plans the global commit pass
    ///
    /// Yields one step per current profile, in order, followed by a delete
    /// for every baseline profile missing from `current`.
    #[must_use]
    pub fn plan_commit(
        &self,
        current: &[ConnectionProfile],
        baseline: &[ConnectionProfile],
    ) -> Vec<PlannedCommit> {
        let mut plan = Vec::with_capacity(current.len());

        for profile in current {
            let kind = profile.auth_mode.secret_kind();
            let staged = kind.and_then(|kind| self.staged.get(&(profile.id.clone(), kind)).cloned());
            let baseline_save = baseline
                .iter()
                .find(|b| b.id == profile.id)
                .is_some_and(|b| b.save_password);
            // Quick Connect secrets are session-only whatever the flag says
            let save_password = profile.save_password || profile.is_quick_connect();
            plan.push(PlannedCommit {
                connection_id: profile.id.clone(),
                kind,
                username: profile.username.clone(),
                action: commit_one(&profile.id, save_password, staged, baseline_save),
            });
        }

        for removed in removed_profiles(current, baseline) {
            plan.push(PlannedCommit {
                connection_id: removed.clone(),
                kind: None,
                username: String::new(),
                action: CommitAction::Delete,
            });
        }

        plan
    }

    /// Clears state for a connection once its step was applied
    pub fn mark_committed(&mut self, connection_id: &ConnectionId) {
        for kind in SecretKind::ALL {
            let key = (connection_id.clone(), kind);
            self.staged.remove(&key);
            self.placeholders.remove(&key);
        }
        self.dirty.remove(connection_id);
    }
}

impl std::fmt::Debug for StagingReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingReconciler")
            .field("editing", &self.editing)
            .field("staged", &self.staged.len())
            .field("dirty", &self.dirty.len())
            .field("placeholders", &self.placeholders.len())
            .finish()
    }
}

/// Ids present in `baseline` but absent from `current`
#[must_use]
pub fn removed_profiles<'a>(
    current: &[ConnectionProfile],
    baseline: &'a [ConnectionProfile],
) -> Vec<&'a ConnectionId> {
    let current_ids: HashSet<&ConnectionId> = current.iter().map(|p| &p.id).collect();
    baseline
        .iter()
        .map(|p| &p.id)
        .filter(|id| !current_ids.contains(id))
        .collect()
}
