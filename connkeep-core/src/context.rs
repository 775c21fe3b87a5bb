//! Application context
//!
//! Built once at startup and passed by reference; holds the services that
//! would otherwise be process-wide singletons.

use std::sync::Arc;
use std::thread::JoinHandle;

use crate::config::{SecretSettings, SharedPolicy};
use crate::error::SecretResult;
use crate::secret::{
    BiometricVerifier, Dispatcher, PersistentSecretStore, ProfileDirectory, QuickConnectStore,
    SecretPrompter, SecretService, SecretVault, ServiceCollaborators,
};

/// Startup handle owning the secret owner thread
pub struct AppContext {
    dispatcher: Dispatcher,
    quick_connect: Arc<QuickConnectStore>,
    policy: SharedPolicy,
    owner_thread: Option<JoinHandle<()>>,
}

impl AppContext {
    /// Builds the secret service and starts its owner thread
    ///
    /// # Errors
    /// Returns an error if the owner thread or its runtime cannot start.
    pub fn start(
        vault: Arc<dyn SecretVault>,
        profiles: Arc<dyn ProfileDirectory>,
        settings: SecretSettings,
        biometrics: Arc<dyn BiometricVerifier>,
        prompter: Arc<dyn SecretPrompter>,
    ) -> SecretResult<Self> {
        let quick_connect = Arc::new(QuickConnectStore::new());
        let policy = SharedPolicy::new(settings);
        let service = SecretService::new(ServiceCollaborators {
            store: PersistentSecretStore::new(vault),
            quick_connect: Arc::clone(&quick_connect),
            profiles,
            policy: Arc::new(policy.clone()),
            biometrics,
            prompter,
        })?;
        let (dispatcher, owner_thread) = Dispatcher::spawn_owner(service)?;
        tracing::debug!("Application context started");

        Ok(Self {
            dispatcher,
            quick_connect,
            policy,
            owner_thread: Some(owner_thread),
        })
    }

    /// Handle for reaching the secret owner from any thread
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Quick Connect store, usable directly from any thread
    #[must_use]
    pub fn quick_connect(&self) -> &QuickConnectStore {
        &self.quick_connect
    }

    /// Shared policy settings
    #[must_use]
    pub const fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    /// Tears the secret owner down and waits for its thread
    pub fn shutdown(&mut self) {
        self.dispatcher.shutdown();
        if let Some(handle) = self.owner_thread.take()
            && handle.join().is_err()
        {
            tracing::warn!("Secret owner thread panicked");
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("dispatcher", &self.dispatcher)
            .field("quick_connect", &self.quick_connect)
            .finish_non_exhaustive()
    }
}
