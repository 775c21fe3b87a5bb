//! Secret management for connection profiles
//!
//! Secrets are read through a per-process session cache, a biometric
//! reauthentication gate and a durable store adapter. Everything except the
//! Quick Connect store is owned by a single thread and reached through the
//! [`Dispatcher`].

mod cache;
mod cancel;
mod collaborators;
mod dispatch;
mod keyring;
mod quick_connect;
mod reauth;
mod service;
mod staging;
mod store;
mod target;
mod vault;

pub use cache::{SecretKey, SessionCacheEntry, SessionSecretCache};
pub use cancel::CancellationToken;
pub use collaborators::{
    NoPrompter, PolicySource, ProfileDirectory, PromptRequest, SecretPrompter, StaticProfiles,
};
pub use dispatch::{Dispatcher, OwnerLoop};
pub use keyring::{KeyringVault, is_secret_tool_available};
pub use quick_connect::QuickConnectStore;
pub use reauth::{
    BiometricOutcome, BiometricVerifier, Clock, ManualClock, NoBiometrics, ReauthGate,
    ReauthPolicy, SystemClock,
};
pub use service::{CommitReport, SecretService, ServiceCollaborators};
pub use staging::{
    CommitAction, FocusAction, PLACEHOLDER_TEXT, PlannedCommit, StageOutcome, StagingReconciler,
    commit_one, removed_profiles,
};
pub use store::{PersistentSecretStore, StoredSecret, decode_blob, encode_blob};
pub use target::{APP_NAMESPACE, SecretTarget, build_target};
pub use vault::{MemoryVault, SecretVault, VaultEntry};
