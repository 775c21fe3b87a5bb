//! Property tests for store target naming

use connkeep_core::secret::{APP_NAMESPACE, build_target};
use connkeep_core::{ConnectionId, SecretKind};
use proptest::prelude::*;

fn arb_id() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9-]{1,40}",
        ".{1,40}",
        Just("00000000-0000-0000-0000-000000000000".to_string()),
    ]
}

proptest! {
    #[test]
    fn prop_kinds_never_collide(id in arb_id()) {
        let id = ConnectionId::from(id);
        let password = build_target(&id, SecretKind::Password).unwrap();
        let passphrase = build_target(&id, SecretKind::SshKeyPassphrase).unwrap();
        prop_assert_ne!(password, passphrase);
    }

    #[test]
    fn prop_ids_never_collide(a in arb_id(), b in arb_id(), password in any::<bool>()) {
        prop_assume!(a != b);
        let kind = if password { SecretKind::Password } else { SecretKind::SshKeyPassphrase };
        let ta = build_target(&ConnectionId::from(a), kind).unwrap();
        let tb = build_target(&ConnectionId::from(b), kind).unwrap();
        prop_assert_ne!(ta, tb);
    }

    #[test]
    fn prop_target_is_deterministic(id in arb_id()) {
        let id = ConnectionId::from(id);
        let first = build_target(&id, SecretKind::Password).unwrap();
        let second = build_target(&id, SecretKind::Password).unwrap();
        prop_assert!(first.as_str().starts_with(APP_NAMESPACE));
        prop_assert_eq!(first, second);
    }
}

#[test]
fn empty_id_has_no_target() {
    assert!(build_target(&ConnectionId::from(""), SecretKind::Password).is_none());
}

#[test]
fn target_format() {
    let target = build_target(&ConnectionId::from("G1"), SecretKind::SshKeyPassphrase).unwrap();
    assert_eq!(target.as_str(), "ConnKeep/Connections/G1/sshKeyPassphrase");
}
