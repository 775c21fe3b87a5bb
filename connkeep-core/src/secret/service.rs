//! Owner-side secret service
//!
//! [`SecretService`] bundles everything the owning thread mutates: the
//! session cache, reauthentication timestamps and the editor staging state.
//! It is not `Sync`; other threads reach it through [`super::Dispatcher`].
//!
//! Durable store calls are async and driven to completion on a private
//! current-thread runtime, so every method here is synchronous.

use std::future::Future;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, info_span, warn};

use super::cache::SessionSecretCache;
use super::cancel::CancellationToken;
use super::collaborators::{PolicySource, ProfileDirectory, PromptRequest, SecretPrompter};
use super::quick_connect::QuickConnectStore;
use super::reauth::{BiometricVerifier, Clock, ReauthGate, ReauthPolicy};
use super::staging::{CommitAction, PlannedCommit, StagingReconciler, removed_profiles};
use super::store::PersistentSecretStore;
use super::target::SecretTarget;
use crate::error::{CommitError, SecretError, SecretResult};
use crate::models::{
    ConnectionId, ConnectionProfile, QUICK_CONNECT_NAME, SecretKind, WindowHandle,
};
use crate::tracing::span_names;

/// Summary of a successful commit pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Secrets written to the store
    pub written: Vec<(ConnectionId, SecretKind)>,
    /// Connections whose secrets were deleted
    pub deleted: Vec<ConnectionId>,
    /// Connections left untouched
    pub kept: Vec<ConnectionId>,
}

/// Collaborators the service reads through
#[derive(Clone)]
pub struct ServiceCollaborators {
    /// Durable store adapter
    pub store: PersistentSecretStore,
    /// Quick Connect profile and secrets, shared with plugin threads
    pub quick_connect: Arc<QuickConnectStore>,
    /// Connection profiles
    pub profiles: Arc<dyn ProfileDirectory>,
    /// Reauthentication policy
    pub policy: Arc<dyn PolicySource>,
    /// Biometric verification
    pub biometrics: Arc<dyn BiometricVerifier>,
    /// Secret entry dialog
    pub prompter: Arc<dyn SecretPrompter>,
}

/// State owned by the thread that services secret requests
pub struct SecretService {
    store: PersistentSecretStore,
    quick_connect: Arc<QuickConnectStore>,
    profiles: Arc<dyn ProfileDirectory>,
    policy: Arc<dyn PolicySource>,
    biometrics: Arc<dyn BiometricVerifier>,
    prompter: Arc<dyn SecretPrompter>,
    cache: SessionSecretCache,
    gate: ReauthGate,
    staging: StagingReconciler,
    token: CancellationToken,
    runtime: tokio::runtime::Runtime,
    shut_down: bool,
}

impl SecretService {
    /// Creates a service using the system clock
    ///
    /// # Errors
    /// Returns `SecretError::Unexpected` if the async runtime cannot start.
    pub fn new(collaborators: ServiceCollaborators) -> SecretResult<Self> {
        Self::with_gate(collaborators, ReauthGate::new())
    }

    /// Creates a service whose reauthentication gate reads the given clock
    ///
    /// # Errors
    /// Returns `SecretError::Unexpected` if the async runtime cannot start.
    pub fn with_clock(
        collaborators: ServiceCollaborators,
        clock: Arc<dyn Clock>,
    ) -> SecretResult<Self> {
        Self::with_gate(collaborators, ReauthGate::with_clock(clock))
    }

    fn with_gate(collaborators: ServiceCollaborators, gate: ReauthGate) -> SecretResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SecretError::Unexpected(format!("failed to start runtime: {e}")))?;

        Ok(Self {
            store: collaborators.store,
            quick_connect: collaborators.quick_connect,
            profiles: collaborators.profiles,
            policy: collaborators.policy,
            biometrics: collaborators.biometrics,
            prompter: collaborators.prompter,
            cache: SessionSecretCache::new(),
            gate,
            staging: StagingReconciler::new(),
            token: CancellationToken::new(),
            runtime,
            shut_down: false,
        })
    }

    /// Token that cancels a pending biometric wait
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Session cache, for inspection
    #[must_use]
    pub const fn cache(&self) -> &SessionSecretCache {
        &self.cache
    }

    /// Reauthentication gate, for inspection
    #[must_use]
    pub const fn gate(&self) -> &ReauthGate {
        &self.gate
    }

    /// Editor staging state
    #[must_use]
    pub const fn staging(&self) -> &StagingReconciler {
        &self.staging
    }

    /// Mutable editor staging state, for field events
    pub const fn staging_mut(&mut self) -> &mut StagingReconciler {
        &mut self.staging
    }

    /// Durable store adapter
    #[must_use]
    pub const fn store(&self) -> &PersistentSecretStore {
        &self.store
    }

    /// Drives a store future to completion on the owner's runtime
    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn target(connection_id: &ConnectionId, kind: SecretKind) -> SecretResult<SecretTarget> {
        SecretTarget::build(connection_id, kind)
            .ok_or_else(|| SecretError::InvalidArgument("connection id is empty".to_string()))
    }

    fn ensure_running(&self) -> SecretResult<()> {
        if self.shut_down {
            return Err(SecretError::NotReady(
                "secret service has shut down".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns a connection's secret
    ///
    /// Consults the session cache first, then the reauthentication gate,
    /// then the durable store. A loaded secret is cached for the rest of the
    /// session. Quick Connect secrets come from the Quick Connect store and
    /// are never cached here.
    ///
    /// # Errors
    /// `NotFound` for an unknown profile or a missing secret, `InvalidData`
    /// for a corrupt one, `Cancelled`/`Unsupported` from reauthentication,
    /// and store failures unchanged.
    pub fn get_secret(
        &mut self,
        connection_id: &ConnectionId,
        kind: SecretKind,
        owner: WindowHandle,
    ) -> SecretResult<SecretString> {
        let span = info_span!(
            span_names::SECRET_RESOLVE,
            connection_id = %connection_id,
            kind = %kind,
            cache_hit = tracing::field::Empty
        );
        let _enter = span.enter();

        self.ensure_running()?;
        if connection_id.is_empty() {
            return Err(SecretError::InvalidArgument(
                "connection id is empty".to_string(),
            ));
        }

        if let Some(secret) = self.cache.get(connection_id, kind) {
            span.record("cache_hit", true);
            return Ok(secret);
        }
        span.record("cache_hit", false);

        if connection_id.is_quick_connect() {
            return self.quick_connect.secret(kind);
        }

        let profile = self.profiles.profile(connection_id).ok_or_else(|| {
            SecretError::NotFound(format!("unknown connection {connection_id}"))
        })?;

        let policy = self.policy.reauth_policy();
        if self
            .gate
            .should_prompt_with(connection_id, profile.require_reauth, policy)
        {
            self.verify_identity(&profile, kind, owner, policy)?;
        }

        let target = Self::target(connection_id, kind)?;
        let stored = self.block_on(self.store.load(&target))?;
        self.cache.set(connection_id, kind, &stored.secret);
        debug!(username = %stored.username, "Secret loaded from store");
        Ok(stored.secret)
    }

    fn verify_identity(
        &mut self,
        profile: &ConnectionProfile,
        kind: SecretKind,
        owner: WindowHandle,
        policy: ReauthPolicy,
    ) -> SecretResult<()> {
        let _span = info_span!(span_names::REAUTH_VERIFY, connection_id = %profile.id).entered();
        let message = format!(
            "Verify your identity to use the saved {} for \"{}\"",
            kind.label(),
            profile.name
        );

        let outcome = self.block_on(
            self.token
                .run_until_cancelled("identity verification", self.biometrics.verify(owner, &message)),
        )?;
        outcome.into_result()?;

        self.gate.record_verified(&profile.id, policy.timeout_ms);
        info!("Identity verified");
        Ok(())
    }

    /// Asks the user for a secret
    ///
    /// # Errors
    /// `Cancelled` if the dialog is dismissed or left empty.
    pub fn prompt_for_secret(
        &self,
        connection_name: &str,
        kind: SecretKind,
        owner: WindowHandle,
    ) -> SecretResult<SecretString> {
        self.ensure_running()?;
        let request = PromptRequest {
            connection_name: connection_name.to_string(),
            kind,
            owner,
        };
        match self.prompter.prompt(&request)? {
            Some(secret) if !secret.expose_secret().is_empty() => Ok(secret),
            _ => Err(SecretError::Cancelled(format!(
                "{} entry dismissed",
                kind.label()
            ))),
        }
    }

    /// Returns a connection's secret, asking the user when none is available
    ///
    /// A corrupt stored secret is treated like a missing one. The entered
    /// secret is persisted if the profile saves passwords, then cached; a
    /// failed save caches nothing.
    ///
    /// # Errors
    /// Errors from [`Self::get_secret`] other than `NotFound`/`InvalidData`,
    /// `Cancelled` from the prompt, and store failures while persisting.
    pub fn resolve_secret(
        &mut self,
        connection_id: &ConnectionId,
        kind: SecretKind,
        owner: WindowHandle,
    ) -> SecretResult<SecretString> {
        let err = match self.get_secret(connection_id, kind, owner) {
            Ok(secret) => return Ok(secret),
            Err(err) if err.should_reprompt() => err,
            Err(err) => return Err(err),
        };

        if connection_id.is_quick_connect() {
            let secret = self.prompt_for_secret(QUICK_CONNECT_NAME, kind, owner)?;
            self.quick_connect.set_secret(kind, secret.clone());
            return Ok(secret);
        }

        let Some(profile) = self.profiles.profile(connection_id) else {
            return Err(err);
        };
        if matches!(err, SecretError::InvalidData(_)) {
            warn!(connection_id = %connection_id, kind = %kind, "Stored secret is corrupt, asking again");
        }

        let secret = self.prompt_for_secret(&profile.name, kind, owner)?;
        if profile.save_password {
            let target = Self::target(connection_id, kind)?;
            self.block_on(self.store.save(&target, &profile.username, &secret))?;
        }
        self.cache.set(connection_id, kind, &secret);
        Ok(secret)
    }

    /// Drops a cached secret; the durable store is untouched
    ///
    /// # Errors
    /// `InvalidArgument` for an empty connection id.
    pub fn clear_cached_secret(
        &mut self,
        connection_id: &ConnectionId,
        kind: SecretKind,
    ) -> SecretResult<()> {
        self.ensure_running()?;
        if connection_id.is_empty() {
            return Err(SecretError::InvalidArgument(
                "connection id is empty".to_string(),
            ));
        }
        if connection_id.is_quick_connect() {
            self.quick_connect.clear_secret(kind);
        }
        self.cache.clear(connection_id, kind);
        Ok(())
    }

    /// Opens an editor session for a connection
    ///
    /// Probes which kinds have a stored secret, without decrypting them, and
    /// seeds placeholders for those. Returns the probed kinds.
    ///
    /// # Errors
    /// Store failures while probing.
    pub fn begin_edit(&mut self, connection_id: &ConnectionId) -> SecretResult<Vec<SecretKind>> {
        self.ensure_running()?;
        let mut stored = Vec::new();
        for kind in SecretKind::ALL {
            let present = if connection_id.is_quick_connect() {
                self.quick_connect.has_secret(kind)
            } else {
                let target = Self::target(connection_id, kind)?;
                self.block_on(self.store.exists(&target))?
            };
            if present {
                stored.push(kind);
            }
        }
        self.staging.begin_session(connection_id, &stored);
        Ok(stored)
    }

    /// Closes the editor session, discarding staged edits
    pub fn end_edit(&mut self) {
        self.staging.end_session();
    }

    /// Runs the commit pass over the edited profiles
    ///
    /// Steps are applied in order and the pass stops at the first failure;
    /// earlier steps stay applied.
    ///
    /// # Errors
    /// `CommitError::Connection` naming the connection whose step failed.
    pub fn commit_edits(
        &mut self,
        current: &[ConnectionProfile],
        baseline: &[ConnectionProfile],
    ) -> Result<CommitReport, CommitError> {
        let _span = info_span!(
            span_names::SECRET_COMMIT,
            current = current.len(),
            baseline = baseline.len()
        )
        .entered();
        self.ensure_running()?;

        let plan = self.staging.plan_commit(current, baseline);
        let mut report = CommitReport::default();

        for step in plan {
            let connection_id = step.connection_id.clone();
            debug!(connection_id = %connection_id, action = step.action.name(), "Applying commit step");
            let applied = self
                .apply_step(step, &mut report)
                .map_err(|source| CommitError::Connection {
                    connection_id: connection_id.clone(),
                    source,
                })?;
            if applied {
                self.staging.mark_committed(&connection_id);
            }
        }

        for removed in removed_profiles(current, baseline) {
            self.gate.forget(removed);
        }

        info!(
            written = report.written.len(),
            deleted = report.deleted.len(),
            kept = report.kept.len(),
            "Commit pass finished"
        );
        Ok(report)
    }

    /// Applies one step; returns false for `Keep`, which leaves editor state alone
    fn apply_step(&mut self, step: PlannedCommit, report: &mut CommitReport) -> SecretResult<bool> {
        let PlannedCommit {
            connection_id,
            kind,
            username,
            action,
        } = step;

        match action {
            CommitAction::Keep => {
                report.kept.push(connection_id);
                return Ok(false);
            }
            CommitAction::Delete => {
                for kind in SecretKind::ALL {
                    if connection_id.is_quick_connect() {
                        self.quick_connect.clear_secret(kind);
                    } else {
                        let target = Self::target(&connection_id, kind)?;
                        self.block_on(self.store.delete_if_present(&target))?;
                    }
                }
                self.cache.clear_connection(&connection_id);
                report.deleted.push(connection_id);
            }
            CommitAction::Write(secret) => {
                let kind = kind.ok_or_else(|| {
                    SecretError::InvalidArgument("no secret kind for staged secret".to_string())
                })?;
                if connection_id.is_quick_connect() {
                    self.quick_connect.set_secret(kind, secret);
                } else {
                    let target = Self::target(&connection_id, kind)?;
                    self.block_on(self.store.save(&target, &username, &secret))?;
                    self.cache.set(&connection_id, kind, &secret);
                }
                report.written.push((connection_id, kind));
            }
        }
        Ok(true)
    }

    /// Cancels pending waits and wipes every in-memory secret
    ///
    /// Runs once; later calls are no-ops.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.token.cancel();
        self.staging.end_session();
        self.cache.clear_all();
        self.quick_connect.reset();
        info!("Secret service shut down");
    }

    /// Returns true once [`Self::shutdown`] has run
    #[must_use]
    pub const fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl std::fmt::Debug for SecretService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretService")
            .field("store", &self.store)
            .field("cache", &self.cache)
            .field("gate", &self.gate)
            .field("staging", &self.staging)
            .field("shut_down", &self.shut_down)
            .finish_non_exhaustive()
    }
}
