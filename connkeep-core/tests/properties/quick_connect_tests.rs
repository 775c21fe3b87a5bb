//! Property tests for the Quick Connect store

use connkeep_core::secret::QuickConnectStore;
use connkeep_core::{ConnectionProfile, QUICK_CONNECT_ID, QUICK_CONNECT_NAME, SecretError, SecretKind};
use proptest::prelude::*;
use secrecy::{ExposeSecret, SecretString};

// ========== Generators ==========

fn arb_plugin() -> impl Strategy<Value = String> {
    "[a-z]{2,10}"
}

proptest! {
    #[test]
    fn prop_first_initialization_wins(first in arb_plugin(), second in arb_plugin()) {
        let store = QuickConnectStore::new();
        store.ensure_initialized(&first);
        store.ensure_initialized(&second);

        let profile = store.profile().unwrap();
        prop_assert_eq!(profile.plugin_id.as_str(), first.as_str());
        prop_assert_eq!(profile.id.as_str(), QUICK_CONNECT_ID);
        prop_assert_eq!(profile.name.as_str(), QUICK_CONNECT_NAME);
    }

    #[test]
    fn prop_reserved_identity_is_forced(id in "[a-z0-9-]{1,20}", name in "[A-Za-z ]{1,20}") {
        let store = QuickConnectStore::new();
        store.set_profile(ConnectionProfile::with_id(id, name, "ssh"));

        let profile = store.profile().unwrap();
        prop_assert!(profile.is_quick_connect());
        prop_assert_eq!(profile.name.as_str(), QUICK_CONNECT_NAME);
    }

    #[test]
    fn prop_secret_round_trip(value in "[ -~]{1,32}") {
        let store = QuickConnectStore::new();
        store.set_secret(SecretKind::Password, SecretString::from(value.clone()));
        prop_assert!(store.has_secret(SecretKind::Password));
        prop_assert!(!store.has_secret(SecretKind::SshKeyPassphrase));
        let held = store.secret(SecretKind::Password).unwrap();
        prop_assert_eq!(held.expose_secret(), value.as_str());

        store.clear_secret(SecretKind::Password);
        prop_assert!(matches!(store.secret(SecretKind::Password), Err(SecretError::NotFound(_))));
    }
}

#[test]
fn profile_before_initialization_is_not_ready() {
    let store = QuickConnectStore::new();
    assert!(matches!(store.profile(), Err(SecretError::NotReady(_))));
}

#[test]
fn reset_forgets_everything() {
    let store = QuickConnectStore::new();
    store.ensure_initialized("rdp");
    store.set_secret(SecretKind::SshKeyPassphrase, SecretString::from("pp".to_string()));
    store.reset();
    assert!(!store.is_initialized());
    assert!(!store.has_secret(SecretKind::SshKeyPassphrase));
}
