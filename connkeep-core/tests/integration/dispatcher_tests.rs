//! Dispatcher lifecycle, ordering and concurrency

use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use connkeep_core::secret::{
    BiometricOutcome, Dispatcher, MemoryVault, PersistentSecretStore, QuickConnectStore,
    ReauthPolicy, SecretService, SecretTarget, ServiceCollaborators, StaticProfiles,
};
use connkeep_core::testing::{ScriptedBiometrics, ScriptedPrompter};
use connkeep_core::{ConnectionId, ConnectionProfile, SecretError, SecretKind, WindowHandle};
use secrecy::ExposeSecret;

fn service_with(
    profiles: Vec<ConnectionProfile>,
    policy: ReauthPolicy,
    biometrics: Arc<ScriptedBiometrics>,
) -> (Arc<MemoryVault>, SecretService) {
    let vault = Arc::new(MemoryVault::new());
    let service = SecretService::new(ServiceCollaborators {
        store: PersistentSecretStore::new(vault.clone()),
        quick_connect: Arc::new(QuickConnectStore::new()),
        profiles: Arc::new(profiles.into_iter().collect::<StaticProfiles>()),
        policy: Arc::new(policy),
        biometrics,
        prompter: Arc::new(ScriptedPrompter::new()),
    })
    .unwrap();
    (vault, service)
}

fn plain_service() -> (Arc<MemoryVault>, SecretService) {
    service_with(
        vec![ConnectionProfile::with_id("G1", "Files", "sftp").with_save_password(true)],
        ReauthPolicy::default(),
        Arc::new(ScriptedBiometrics::new(BiometricOutcome::Verified)),
    )
}

fn seed(vault: &MemoryVault, id: &str, value: &str) {
    let target = SecretTarget::build(&ConnectionId::from(id), SecretKind::Password).unwrap();
    let mut blob = value.as_bytes().to_vec();
    blob.push(0);
    vault.insert_raw(target.as_str(), "alice", blob);
}

#[test]
fn calls_before_attach_are_not_ready() {
    let (dispatcher, _owner_loop) = Dispatcher::new();
    assert!(!dispatcher.is_ready());

    let result = dispatcher.get_secret(
        &ConnectionId::from("G1"),
        SecretKind::Password,
        WindowHandle::NONE,
    );
    assert!(matches!(result, Err(SecretError::NotReady(_))));
    assert!(matches!(dispatcher.post(|_| {}), Err(SecretError::NotReady(_))));
}

#[test]
fn calls_after_shutdown_are_not_ready() {
    let (_vault, service) = plain_service();
    let (dispatcher, owner) = Dispatcher::spawn_owner(service).unwrap();
    assert!(dispatcher.is_ready());

    dispatcher.shutdown();
    owner.join().unwrap();
    assert!(dispatcher.is_torn_down());

    let result = dispatcher.get_secret(
        &ConnectionId::from("G1"),
        SecretKind::Password,
        WindowHandle::NONE,
    );
    assert!(matches!(result, Err(SecretError::NotReady(_))));

    // Repeated shutdown is a no-op
    dispatcher.shutdown();
}

#[test]
fn service_shutdown_from_a_job_wipes_cache() {
    let (vault, service) = plain_service();
    seed(&vault, "G1", "stored");
    let (dispatcher, owner) = Dispatcher::spawn_owner(service).unwrap();
    let id = ConnectionId::from("G1");
    dispatcher
        .get_secret(&id, SecretKind::Password, WindowHandle::NONE)
        .unwrap();

    let wiped = Arc::new(Mutex::new(None));
    let observed = wiped.clone();
    dispatcher
        .post(move |service| {
            service.shutdown();
            *observed.lock().unwrap() = Some(service.cache().is_empty());
        })
        .unwrap();
    dispatcher.shutdown();
    owner.join().unwrap();

    assert_eq!(*wiped.lock().unwrap(), Some(true));
}

#[test]
fn concurrent_callers_all_get_the_secret() {
    let (vault, service) = plain_service();
    seed(&vault, "G1", "stored");
    let (dispatcher, owner) = Dispatcher::spawn_owner(service).unwrap();

    let workers: Vec<_> = (0..16)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                let id = ConnectionId::from("G1");
                for _ in 0..50 {
                    let secret = dispatcher
                        .get_secret(&id, SecretKind::Password, WindowHandle::NONE)
                        .unwrap();
                    assert_eq!(secret.expose_secret(), "stored");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    dispatcher.shutdown();
    owner.join().unwrap();
}

#[test]
fn posts_from_one_thread_run_in_order() {
    let (_vault, service) = plain_service();
    let (dispatcher, owner) = Dispatcher::spawn_owner(service).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    for i in 0..100 {
        let seen = seen.clone();
        dispatcher
            .post(move |_| seen.lock().unwrap().push(i))
            .unwrap();
    }
    // A call queued after the posts acts as a barrier
    dispatcher.call(|_| Ok(())).unwrap();

    assert_eq!(*seen.lock().unwrap(), (0..100).collect::<Vec<_>>());
    dispatcher.shutdown();
    owner.join().unwrap();
}

#[test]
fn owner_thread_calls_run_inline_and_posts_queue() {
    let (_vault, service) = plain_service();
    let (dispatcher, owner_loop) = Dispatcher::new();
    owner_loop.attach(service).unwrap();
    assert!(dispatcher.is_owner_thread());

    let answer = dispatcher.call(|_| Ok(42)).unwrap();
    assert_eq!(answer, 42);

    let ran = Arc::new(Mutex::new(false));
    let flag = ran.clone();
    dispatcher
        .post(move |_| *flag.lock().unwrap() = true)
        .unwrap();
    assert!(!*ran.lock().unwrap());
    assert_eq!(owner_loop.pump(), 1);
    assert!(*ran.lock().unwrap());

    dispatcher.shutdown();
    assert!(dispatcher.is_torn_down());
    assert_eq!(owner_loop.pump(), 0);
}

#[test]
fn reentrant_call_is_rejected() {
    let (_vault, service) = plain_service();
    let (dispatcher, owner_loop) = Dispatcher::new();
    owner_loop.attach(service).unwrap();

    let inner = dispatcher.clone();
    let nested = dispatcher
        .call(move |_| Ok(inner.call(|_| Ok(()))))
        .unwrap();
    assert!(matches!(nested, Err(SecretError::Unexpected(_))));

    dispatcher.shutdown();
}

#[test]
fn second_attach_on_same_thread_fails() {
    let (_vault, first) = plain_service();
    let (_vault2, second) = plain_service();
    let (dispatcher, owner_loop) = Dispatcher::new();
    owner_loop.attach(first).unwrap();

    let (_other, other_loop) = Dispatcher::new();
    assert!(matches!(
        other_loop.attach(second),
        Err(SecretError::InvalidArgument(_))
    ));

    dispatcher.shutdown();
}

#[test]
fn shutdown_cancels_pending_biometric_wait() {
    let biometrics = Arc::new(ScriptedBiometrics::new(BiometricOutcome::Verified));
    biometrics.set_hang(true);
    let (vault, service) = service_with(
        vec![
            ConnectionProfile::with_id("G1", "Files", "sftp")
                .with_save_password(true)
                .with_require_reauth(true),
        ],
        ReauthPolicy::from_minutes(false, 5),
        biometrics.clone(),
    );
    seed(&vault, "G1", "stored");
    let (dispatcher, owner) = Dispatcher::spawn_owner(service).unwrap();

    let caller = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || {
            dispatcher.get_secret(
                &ConnectionId::from("G1"),
                SecretKind::Password,
                WindowHandle::NONE,
            )
        })
    };
    while biometrics.calls() == 0 {
        thread::sleep(Duration::from_millis(5));
    }

    dispatcher.shutdown();
    let result = caller.join().unwrap();
    assert!(matches!(result, Err(SecretError::Cancelled(_))));
    owner.join().unwrap();
}

#[test]
fn dispatcher_shutdown_from_a_job_stops_the_owner() {
    let quick_connect = Arc::new(QuickConnectStore::new());
    quick_connect.ensure_initialized("sftp");
    quick_connect.set_secret(
        SecretKind::Password,
        secrecy::SecretString::from("qc".to_string()),
    );
    let service = SecretService::new(ServiceCollaborators {
        store: PersistentSecretStore::new(Arc::new(MemoryVault::new())),
        quick_connect: quick_connect.clone(),
        profiles: Arc::new(StaticProfiles::new()),
        policy: Arc::new(ReauthPolicy::default()),
        biometrics: Arc::new(ScriptedBiometrics::new(BiometricOutcome::Verified)),
        prompter: Arc::new(ScriptedPrompter::new()),
    })
    .unwrap();
    let (dispatcher, owner) = Dispatcher::spawn_owner(service).unwrap();

    let inner = dispatcher.clone();
    dispatcher
        .call(move |_| {
            inner.shutdown();
            Ok(())
        })
        .unwrap();
    assert!(dispatcher.is_torn_down());
    dispatcher.shutdown();

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = done_tx.send(owner.join().is_ok());
    });
    assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    assert!(!quick_connect.is_initialized());
    assert!(!quick_connect.has_secret(SecretKind::Password));
}

#[test]
fn pumped_job_shutting_down_detaches_the_service() {
    let (_vault, service) = plain_service();
    let (dispatcher, owner_loop) = Dispatcher::new();
    owner_loop.attach(service).unwrap();

    let inner = dispatcher.clone();
    dispatcher.post(move |_| inner.shutdown()).unwrap();
    assert_eq!(owner_loop.pump(), 1);
    assert!(dispatcher.is_torn_down());

    // The old service is gone, so this thread can own a new one
    let (_vault2, second) = plain_service();
    let (other, other_loop) = Dispatcher::new();
    assert!(other_loop.attach(second).is_ok());
    other.shutdown();
}
