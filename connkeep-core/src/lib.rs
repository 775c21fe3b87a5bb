//! `ConnKeep` Core Library
//!
//! Credential management for remote connection profiles: a per-process
//! session cache in front of a durable secret store, an ephemeral Quick
//! Connect profile, biometric reauthentication with a trust window, editor
//! staging that turns field edits into store actions, and a dispatcher that
//! lets any thread reach the single thread owning all of it.
//!
//! # Crate Structure
//!
//! - [`models`] - Connection ids, profiles and secret kinds
//! - [`secret`] - Cache, store adapter, reauthentication, staging, dispatcher
//! - [`config`] - Policy settings and persistence
//! - [`context`] - Startup handle holding the long-lived services
//! - [`testing`] - Scripted biometric and prompt collaborators
//! - [`tracing`] - Structured logging setup

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod secret;
mod sync;
pub mod testing;
pub mod tracing;

pub use config::{SecretSettings, SharedPolicy};
pub use context::AppContext;
pub use error::{CommitError, ConfigError, ConfigResult, SecretError, SecretResult};
pub use models::{
    AuthMode, ConnectionId, ConnectionProfile, QUICK_CONNECT_ID, QUICK_CONNECT_NAME, SecretKind,
    WindowHandle,
};
pub use secret::{
    CommitReport, Dispatcher, KeyringVault, MemoryVault, OwnerLoop, PersistentSecretStore,
    QuickConnectStore, SecretService, SecretTarget, SecretVault, ServiceCollaborators,
    StagingReconciler,
};
pub use tracing::{TracingConfig, TracingError, TracingLevel, TracingOutput, init_tracing};
