//! Property tests for the session secret cache

use connkeep_core::secret::SessionSecretCache;
use connkeep_core::{ConnectionId, SecretKind};
use proptest::prelude::*;
use secrecy::{ExposeSecret, SecretString};

// ========== Generators ==========

fn arb_kind() -> impl Strategy<Value = SecretKind> {
    prop_oneof![Just(SecretKind::Password), Just(SecretKind::SshKeyPassphrase)]
}

fn arb_entries() -> impl Strategy<Value = Vec<(String, SecretKind, String)>> {
    prop::collection::vec(("[a-z0-9]{1,8}", arb_kind(), "[ -~]{1,32}"), 1..16)
}

fn secret(s: &str) -> SecretString {
    SecretString::from(s.to_string())
}

proptest! {
    #[test]
    fn prop_last_write_wins(entries in arb_entries()) {
        let mut cache = SessionSecretCache::new();
        for (id, kind, value) in &entries {
            cache.set(&ConnectionId::from(id.as_str()), *kind, &secret(value));
        }

        for (id, kind, _) in &entries {
            let expected = entries
                .iter()
                .rev()
                .find(|(i, k, _)| i == id && k == kind)
                .map(|(_, _, v)| v.clone())
                .unwrap();
            let cached = cache.get(&ConnectionId::from(id.as_str()), *kind).unwrap();
            prop_assert_eq!(cached.expose_secret(), expected.as_str());
        }
    }

    #[test]
    fn prop_clear_all_wipes_every_slot(entries in arb_entries()) {
        let mut cache = SessionSecretCache::new();
        for (id, kind, value) in &entries {
            cache.set(&ConnectionId::from(id.as_str()), *kind, &secret(value));
        }
        prop_assert!(!cache.is_empty());

        cache.clear_all();
        prop_assert!(cache.is_empty());
        for (_, entry) in cache.entries() {
            prop_assert!(!entry.is_present());
            prop_assert!(entry.is_wiped());
        }
    }

    #[test]
    fn prop_kinds_are_independent(id in "[a-z]{1,8}", a in "[ -~]{1,16}", b in "[ -~]{1,16}") {
        let id = ConnectionId::from(id);
        let mut cache = SessionSecretCache::new();
        cache.set(&id, SecretKind::Password, &secret(&a));
        cache.set(&id, SecretKind::SshKeyPassphrase, &secret(&b));

        cache.clear(&id, SecretKind::Password);
        prop_assert!(cache.get(&id, SecretKind::Password).is_none());
        let passphrase = cache.get(&id, SecretKind::SshKeyPassphrase).unwrap();
        prop_assert_eq!(passphrase.expose_secret(), b.as_str());
    }
}

#[test]
fn empty_set_clears_slot() {
    let id = ConnectionId::from("G1");
    let mut cache = SessionSecretCache::new();
    cache.set(&id, SecretKind::Password, &secret("hunter2"));
    cache.set(&id, SecretKind::Password, &secret(""));
    assert!(!cache.contains(&id, SecretKind::Password));
}
