//! End-to-end editor and connect flows through the dispatcher

use std::sync::Arc;

use connkeep_core::secret::{
    BiometricOutcome, Dispatcher, MemoryVault, PLACEHOLDER_TEXT, PersistentSecretStore,
    QuickConnectStore, ReauthPolicy, SecretService, SecretTarget, ServiceCollaborators,
    StageOutcome, StaticProfiles,
};
use connkeep_core::testing::{ScriptedBiometrics, ScriptedPrompter};
use connkeep_core::{
    AppContext, ConnectionId, ConnectionProfile, SecretError, SecretKind, SecretSettings,
    WindowHandle,
};
use secrecy::{ExposeSecret, SecretString};

struct Harness {
    vault: Arc<MemoryVault>,
    profiles: Arc<StaticProfiles>,
    prompter: Arc<ScriptedPrompter>,
    quick_connect: Arc<QuickConnectStore>,
    dispatcher: Dispatcher,
    owner: Option<std::thread::JoinHandle<()>>,
}

impl Harness {
    fn start(profiles: Vec<ConnectionProfile>) -> Self {
        let vault = Arc::new(MemoryVault::new());
        let profiles: Arc<StaticProfiles> = Arc::new(profiles.into_iter().collect());
        let prompter = Arc::new(ScriptedPrompter::new());
        let quick_connect = Arc::new(QuickConnectStore::new());
        let service = SecretService::new(ServiceCollaborators {
            store: PersistentSecretStore::new(vault.clone()),
            quick_connect: quick_connect.clone(),
            profiles: profiles.clone(),
            policy: Arc::new(ReauthPolicy::default()),
            biometrics: Arc::new(ScriptedBiometrics::new(BiometricOutcome::Verified)),
            prompter: prompter.clone(),
        })
        .unwrap();
        let (dispatcher, owner) = Dispatcher::spawn_owner(service).unwrap();
        Self {
            vault,
            profiles,
            prompter,
            quick_connect,
            dispatcher,
            owner: Some(owner),
        }
    }

    fn seed(&self, id: &str, kind: SecretKind, value: &str) {
        let target = SecretTarget::build(&ConnectionId::from(id), kind).unwrap();
        let mut blob = value.as_bytes().to_vec();
        blob.push(0);
        self.vault.insert_raw(target.as_str(), "alice", blob);
    }

    fn raw(&self, id: &str, kind: SecretKind) -> Option<Vec<u8>> {
        let target = SecretTarget::build(&ConnectionId::from(id), kind).unwrap();
        self.vault.raw_blob(target.as_str())
    }

    fn cached(&self, id: &ConnectionId, kind: SecretKind) -> bool {
        let id = id.clone();
        self.dispatcher
            .call(move |service| Ok(service.cache().contains(&id, kind)))
            .unwrap()
    }

    fn type_into_field(&self, id: &ConnectionId, kind: SecretKind, text: &str) -> StageOutcome {
        let id = id.clone();
        let text = text.to_string();
        self.dispatcher
            .call(move |service| {
                let staging = service.staging_mut();
                staging.on_field_changed(&id);
                Ok(staging.stage(&id, kind, &text))
            })
            .unwrap()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.dispatcher.shutdown();
        if let Some(owner) = self.owner.take() {
            owner.join().unwrap();
        }
    }
}

fn g1(save_password: bool) -> ConnectionProfile {
    ConnectionProfile::with_id("G1", "Files", "sftp")
        .with_username("alice")
        .with_save_password(save_password)
}

#[test]
fn editor_lifecycle_for_saved_connection() {
    let harness = Harness::start(vec![g1(true)]);
    harness.seed("G1", SecretKind::Password, "stored");
    harness.seed("G1", SecretKind::SshKeyPassphrase, "phrase");
    let id = ConnectionId::from("G1");

    // Opening the editor shows placeholders without decrypting anything
    let edit_id = id.clone();
    let (stored, placeholder) = harness
        .dispatcher
        .call(move |service| {
            let stored = service.begin_edit(&edit_id)?;
            let placeholder = service
                .staging()
                .placeholder(&edit_id, SecretKind::Password)
                .map(str::to_string);
            Ok((stored, placeholder))
        })
        .unwrap();
    assert_eq!(stored, SecretKind::ALL.to_vec());
    assert_eq!(placeholder.as_deref(), Some(PLACEHOLDER_TEXT));
    assert!(!harness.cached(&id, SecretKind::Password));

    // Connecting reads the store and fills the cache
    let secret = harness
        .dispatcher
        .get_secret(&id, SecretKind::Password, WindowHandle::NONE)
        .unwrap();
    assert_eq!(secret.expose_secret(), "stored");
    assert!(harness.cached(&id, SecretKind::Password));

    // Editing the field and committing writes the new secret
    assert_eq!(
        harness.type_into_field(&id, SecretKind::Password, "newpass123"),
        StageOutcome::Staged(SecretKind::Password)
    );
    let report = harness
        .dispatcher
        .commit_edits(vec![g1(true)], vec![g1(true)])
        .unwrap();
    assert_eq!(report.written, vec![(id.clone(), SecretKind::Password)]);
    assert_eq!(
        harness.raw("G1", SecretKind::Password).unwrap(),
        b"newpass123\0".to_vec()
    );
    let secret = harness
        .dispatcher
        .get_secret(&id, SecretKind::Password, WindowHandle::NONE)
        .unwrap();
    assert_eq!(secret.expose_secret(), "newpass123");

    // Turning save-password off deletes both kinds and the cache entry
    harness.profiles.insert(g1(false));
    let report = harness
        .dispatcher
        .commit_edits(vec![g1(false)], vec![g1(true)])
        .unwrap();
    assert_eq!(report.deleted, vec![id.clone()]);
    assert!(harness.raw("G1", SecretKind::Password).is_none());
    assert!(harness.raw("G1", SecretKind::SshKeyPassphrase).is_none());
    assert!(!harness.cached(&id, SecretKind::Password));
    assert!(matches!(
        harness
            .dispatcher
            .get_secret(&id, SecretKind::Password, WindowHandle::NONE),
        Err(SecretError::NotFound(_))
    ));
}

#[test]
fn resolve_prompts_once_then_uses_cache() {
    let harness = Harness::start(vec![g1(true)]);
    harness.prompter.push(Some("typed"));
    let id = ConnectionId::from("G1");

    let secret = harness
        .dispatcher
        .resolve_secret(&id, SecretKind::Password, WindowHandle(7))
        .unwrap();
    assert_eq!(secret.expose_secret(), "typed");
    assert_eq!(
        harness.raw("G1", SecretKind::Password).unwrap(),
        b"typed\0".to_vec()
    );

    let again = harness
        .dispatcher
        .resolve_secret(&id, SecretKind::Password, WindowHandle(7))
        .unwrap();
    assert_eq!(again.expose_secret(), "typed");

    let requests = harness.prompter.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].connection_name, "Files");
    assert_eq!(requests[0].owner, WindowHandle(7));
}

#[test]
fn clearing_cache_keeps_durable_copy() {
    let harness = Harness::start(vec![g1(true)]);
    harness.seed("G1", SecretKind::Password, "stored");
    let id = ConnectionId::from("G1");

    harness
        .dispatcher
        .get_secret(&id, SecretKind::Password, WindowHandle::NONE)
        .unwrap();
    harness
        .dispatcher
        .clear_cached_secret(&id, SecretKind::Password)
        .unwrap();
    assert!(!harness.cached(&id, SecretKind::Password));
    assert!(harness.raw("G1", SecretKind::Password).is_some());
}

#[test]
fn quick_connect_secret_stays_in_memory() {
    let harness = Harness::start(Vec::new());
    harness.quick_connect.ensure_initialized("sftp");
    harness.prompter.push(Some("adhoc"));
    let qc = ConnectionId::quick_connect();

    let secret = harness
        .dispatcher
        .resolve_secret(&qc, SecretKind::Password, WindowHandle::NONE)
        .unwrap();
    assert_eq!(secret.expose_secret(), "adhoc");
    assert!(harness.quick_connect.has_secret(SecretKind::Password));
    assert!(harness.vault.is_empty());
    assert_eq!(harness.vault.put_calls(), 0);

    // Editing the Quick Connect profile writes back to the in-memory store
    let profile = harness.quick_connect.profile().unwrap();
    harness.type_into_field(&qc, SecretKind::Password, "edited");
    harness
        .dispatcher
        .commit_edits(vec![profile.clone()], vec![profile])
        .unwrap();
    assert_eq!(
        harness
            .quick_connect
            .secret(SecretKind::Password)
            .unwrap()
            .expose_secret(),
        "edited"
    );
    assert!(harness.vault.is_empty());
}

#[test]
fn dismissed_prompt_is_silent_cancel() {
    let harness = Harness::start(vec![g1(true)]);
    let result = harness.dispatcher.resolve_secret(
        &ConnectionId::from("G1"),
        SecretKind::Password,
        WindowHandle::NONE,
    );
    let err = result.unwrap_err();
    assert!(err.is_silent());
    assert!(harness.vault.is_empty());
}

#[test]
fn app_context_wires_settings_into_policy() {
    let profiles: StaticProfiles = [g1(true).with_require_reauth(true)].into_iter().collect();
    let vault = Arc::new(MemoryVault::new());
    let biometrics = Arc::new(ScriptedBiometrics::new(BiometricOutcome::Verified));
    let target = SecretTarget::build(&ConnectionId::from("G1"), SecretKind::Password).unwrap();
    vault.insert_raw(target.as_str(), "alice", b"stored\0".to_vec());

    let mut context = AppContext::start(
        vault,
        Arc::new(profiles),
        SecretSettings {
            bypass_reauth: true,
            ..SecretSettings::default()
        },
        biometrics.clone(),
        Arc::new(ScriptedPrompter::new()),
    )
    .unwrap();

    let id = ConnectionId::from("G1");
    context
        .dispatcher()
        .get_secret(&id, SecretKind::Password, WindowHandle::NONE)
        .unwrap();
    assert_eq!(biometrics.calls(), 0);

    // Policy changes apply to the next retrieval
    context.policy().update(SecretSettings::default());
    context
        .dispatcher()
        .clear_cached_secret(&id, SecretKind::Password)
        .unwrap();
    let secret: SecretString = context
        .dispatcher()
        .get_secret(&id, SecretKind::Password, WindowHandle::NONE)
        .unwrap();
    assert_eq!(secret.expose_secret(), "stored");
    assert_eq!(biometrics.calls(), 1);

    context.shutdown();
    assert!(matches!(
        context
            .dispatcher()
            .get_secret(&id, SecretKind::Password, WindowHandle::NONE),
        Err(SecretError::NotReady(_))
    ));
}
