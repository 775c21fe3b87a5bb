//! Property tests for the durable store adapter

use std::sync::Arc;

use connkeep_core::secret::{MemoryVault, PersistentSecretStore, SecretTarget};
use connkeep_core::{ConnectionId, SecretError, SecretKind};
use proptest::prelude::*;
use secrecy::{ExposeSecret, SecretString};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn target(id: &str) -> SecretTarget {
    SecretTarget::build(&ConnectionId::from(id), SecretKind::Password).unwrap()
}

proptest! {
    #[test]
    fn prop_save_then_load_round_trips(
        id in "[a-zA-Z0-9-]{1,36}",
        username in "[a-z]{0,16}",
        secret in "[^\\x00]{1,64}",
    ) {
        let vault = Arc::new(MemoryVault::new());
        let store = PersistentSecretStore::new(vault);
        let target = target(&id);

        let loaded = runtime().block_on(async {
            store
                .save(&target, &username, &SecretString::from(secret.clone()))
                .await?;
            store.load(&target).await
        });
        let loaded = loaded.unwrap();
        prop_assert_eq!(loaded.username.as_str(), username.as_str());
        prop_assert_eq!(loaded.expose_secret(), secret.as_str());
    }

    #[test]
    fn prop_unterminated_blob_is_invalid_data(bytes in proptest::collection::vec(1u8..=255, 1..64)) {
        let vault = Arc::new(MemoryVault::new());
        vault.insert_raw(target("G1").as_str(), "alice", bytes);
        let store = PersistentSecretStore::new(vault);

        let result = runtime().block_on(store.load(&target("G1")));
        prop_assert!(matches!(result, Err(SecretError::InvalidData(_))));
    }
}

#[test]
fn empty_secret_never_reaches_vault() {
    let vault = Arc::new(MemoryVault::new());
    let store = PersistentSecretStore::new(vault.clone());

    let result = runtime().block_on(store.save(
        &target("G1"),
        "alice",
        &SecretString::from(String::new()),
    ));
    assert!(matches!(result, Err(SecretError::InvalidArgument(_))));
    assert_eq!(vault.put_calls(), 0);
    assert!(vault.is_empty());
}

#[test]
fn terminator_only_blob_is_invalid_data() {
    let vault = Arc::new(MemoryVault::new());
    vault.insert_raw(target("G1").as_str(), "alice", vec![0]);
    let store = PersistentSecretStore::new(vault);

    let result = runtime().block_on(store.load(&target("G1")));
    assert!(matches!(result, Err(SecretError::InvalidData(_))));
}

#[test]
fn delete_missing_is_not_found_and_tolerated() {
    let store = PersistentSecretStore::new(Arc::new(MemoryVault::new()));
    let rt = runtime();
    assert!(matches!(
        rt.block_on(store.delete(&target("G1"))),
        Err(SecretError::NotFound(_))
    ));
    assert!(rt.block_on(store.delete_if_present(&target("G1"))).is_ok());
}
