//! Integration tests for Roomseal Core end-to-end scenarios.
//!
//! These drive the public facade the way the chat and room flows do:
//! registration, room creation, key distribution, messaging and rotation.

use std::sync::Arc;

use roomseal_core::crypto::derive_store_key;
use roomseal_core::{
    CryptoConfig, CryptoFacade, EncryptedPayload, Error, KeyExchangeEnvelope, MemorySecretStore,
    PasswordHasher, PasswordRecord, RoomKeyState, SealedSecretStore, SecretStore,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn memory_facade() -> CryptoFacade {
    CryptoFacade::open(CryptoConfig::default())
        .await
        .expect("open facade")
}

/// Register, create a room, and round-trip a message.
#[tokio::test]
async fn test_register_create_encrypt_decrypt() {
    init_tracing();
    let facade = memory_facade().await;

    let (keypair, record) = facade
        .register_user("correct-horse")
        .await
        .expect("register");
    assert_eq!(record.to_bytes().len(), 48);
    assert!(facade.verify_password("correct-horse", &record).await.unwrap());
    assert!(!facade.verify_password("wrong", &record).await.unwrap());
    assert_eq!(facade.public_key().await.unwrap(), keypair.public_key());

    let room = facade.create_room().await.expect("create room");
    assert_eq!(room.version(), 1);

    let payload = facade
        .encrypt_outgoing(room.room_id(), b"hello")
        .await
        .expect("encrypt");
    let plaintext = facade
        .decrypt_incoming(room.room_id(), &payload)
        .await
        .expect("decrypt");
    assert_eq!(plaintext, b"hello");

    // The same payload under another room's key must not open
    let other = facade.create_room().await.expect("create other room");
    assert!(matches!(
        facade.decrypt_incoming(other.room_id(), &payload).await,
        Err(Error::AuthenticationFailed)
    ));
}

/// Password records survive a round trip through their blob encoding.
#[tokio::test]
async fn test_password_record_blob() {
    let facade = memory_facade().await;
    let record = facade.hash_password("correct-horse").await.unwrap();

    let restored = PasswordRecord::from_base64(&record.to_base64()).unwrap();
    assert_eq!(restored, record);
    assert!(PasswordHasher::new().verify("correct-horse", &restored));
}

/// Alice creates a room, shares its key with Bob over the wire, and they chat.
#[tokio::test]
async fn test_key_exchange_between_members() {
    init_tracing();
    let alice = memory_facade().await;
    let bob = memory_facade().await;

    let alice_public = alice.ensure_keypair().await.unwrap();
    let bob_public = bob.ensure_keypair().await.unwrap();

    let room = alice.create_room_with_id("team-chat").await.unwrap();
    assert_eq!(bob.room_state("team-chat").await.unwrap(), RoomKeyState::NoKey);

    // Bob cannot send before the key arrives
    assert!(matches!(
        bob.encrypt_outgoing("team-chat", b"early").await,
        Err(Error::NoRoomKey(_))
    ));

    let wire = alice
        .share_room_key("team-chat", &bob_public)
        .await
        .unwrap()
        .to_wire();
    let envelope = KeyExchangeEnvelope::from_wire(&wire).unwrap();
    let received = bob.receive_room_key(&envelope, &alice_public).await.unwrap();

    assert_eq!(received.room_id(), "team-chat");
    assert_eq!(received.version(), room.version());
    assert_eq!(
        bob.room_state("team-chat").await.unwrap(),
        RoomKeyState::HasKey(1)
    );

    let wire = bob
        .encrypt_outgoing("team-chat", b"thanks for the invite")
        .await
        .unwrap()
        .to_wire();
    let payload = EncryptedPayload::from_wire(&wire).unwrap();
    assert_eq!(
        alice.decrypt_incoming("team-chat", &payload).await.unwrap(),
        b"thanks for the invite"
    );
}

/// A third party holding the envelope cannot open it.
#[tokio::test]
async fn test_envelope_is_bound_to_recipient() {
    let alice = memory_facade().await;
    let bob = memory_facade().await;
    let eve = memory_facade().await;

    let alice_public = alice.ensure_keypair().await.unwrap();
    let bob_public = bob.ensure_keypair().await.unwrap();
    eve.ensure_keypair().await.unwrap();

    let room = alice.create_room().await.unwrap();
    let envelope = alice
        .share_room_key(room.room_id(), &bob_public)
        .await
        .unwrap();

    let err = eve
        .receive_room_key(&envelope, &alice_public)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AuthenticationFailed));
    assert!(err.is_undecryptable());
}

/// After a rotation the new key is distributed and old messages still open.
#[tokio::test]
async fn test_rotation_and_redistribution() {
    let alice = memory_facade().await;
    let bob = memory_facade().await;
    let alice_public = alice.ensure_keypair().await.unwrap();
    let bob_public = bob.ensure_keypair().await.unwrap();

    let room = alice.create_room().await.unwrap();
    let room_id = room.room_id().to_string();

    let envelope = alice.share_room_key(&room_id, &bob_public).await.unwrap();
    bob.receive_room_key(&envelope, &alice_public).await.unwrap();

    let v1 = alice.current_key_version(&room_id).await.unwrap().unwrap();
    let before = alice.encrypt_outgoing(&room_id, b"before").await.unwrap();

    let rotated = alice.rotate_room_key(&room_id).await.unwrap();
    assert_eq!(rotated.version(), v1 + 1);

    let after = alice.encrypt_outgoing(&room_id, b"after").await.unwrap();

    // Bob is still on v1 until the new key reaches him
    assert!(bob.decrypt_incoming(&room_id, &after).await.is_err());
    assert_eq!(
        bob.decrypt_incoming(&room_id, &before).await.unwrap(),
        b"before"
    );

    let envelope = alice.share_room_key(&room_id, &bob_public).await.unwrap();
    let received = bob.receive_room_key(&envelope, &alice_public).await.unwrap();
    assert_eq!(received.version(), 2);

    assert_eq!(bob.decrypt_incoming(&room_id, &after).await.unwrap(), b"after");
    assert_eq!(
        bob.decrypt_incoming_at(&room_id, v1, &before).await.unwrap(),
        b"before"
    );
}

/// Keys persisted by a file-backed facade survive a restart.
#[tokio::test]
async fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = CryptoConfig::default().with_storage_path(dir.path().join("keys"));

    let (public, room_id, payload) = {
        let facade = CryptoFacade::open(config.clone()).await.unwrap();
        let (keypair, _) = facade.register_user("pw").await.unwrap();
        let room = facade.create_room().await.unwrap();
        let payload = facade
            .encrypt_outgoing(room.room_id(), b"persisted")
            .await
            .unwrap();
        (keypair.public_key(), room.room_id().to_string(), payload)
    };

    let facade = CryptoFacade::open(config).await.unwrap();
    assert_eq!(facade.public_key().await.unwrap(), public);
    assert_eq!(facade.ensure_keypair().await.unwrap(), public);
    assert!(matches!(
        facade.register_user("pw").await,
        Err(Error::KeypairExists)
    ));
    assert_eq!(
        facade.decrypt_incoming(&room_id, &payload).await.unwrap(),
        b"persisted"
    );
}

/// A sealed store keeps working through the facade and hides raw key bytes.
#[tokio::test]
async fn test_sealed_store_behind_facade() {
    let at_rest_key = derive_store_key(b"device-secret-from-the-keychain", None).unwrap();
    let inner = MemorySecretStore::new();
    let store: Arc<dyn SecretStore> = Arc::new(SealedSecretStore::new(inner, *at_rest_key));
    let facade = CryptoFacade::with_store(CryptoConfig::default(), store.clone());

    facade.ensure_keypair().await.unwrap();
    let room = facade.create_room_with_id("sealed-room").await.unwrap();
    let payload = facade
        .encrypt_outgoing("sealed-room", b"at rest")
        .await
        .unwrap();

    assert!(store.contains("room-key:sealed-room:1").await.unwrap());
    assert_eq!(
        facade.decrypt_incoming(room.room_id(), &payload).await.unwrap(),
        b"at rest"
    );
}

/// Leaving a room discards every version; messages become undecryptable.
#[tokio::test]
async fn test_leave_room() {
    let facade = memory_facade().await;
    let room = facade.create_room().await.unwrap();
    let room_id = room.room_id().to_string();
    let payload = facade.encrypt_outgoing(&room_id, b"gone").await.unwrap();
    facade.rotate_room_key(&room_id).await.unwrap();

    facade.leave_room(&room_id).await.unwrap();

    let err = facade
        .decrypt_incoming(&room_id, &payload)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoRoomKey(_)));
    assert!(err.is_recoverable());
    assert_eq!(facade.room_state(&room_id).await.unwrap(), RoomKeyState::NoKey);
}

/// Malformed wire strings are rejected before any decryption is attempted.
#[test]
fn test_malformed_wire_strings() {
    assert!(matches!(
        EncryptedPayload::from_wire("not base64!!"),
        Err(Error::MalformedPayload(_))
    ));
    assert!(matches!(
        EncryptedPayload::from_wire("AAAA"),
        Err(Error::MalformedPayload(_))
    ));
    assert!(matches!(
        KeyExchangeEnvelope::from_wire(""),
        Err(Error::MalformedPayload(_))
    ));
}

/// Erasing the account leaves nothing behind in a file-backed store.
#[tokio::test]
async fn test_erase_account_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = CryptoConfig::default().with_storage_path(dir.path().join("keys"));

    let room_id = {
        let facade = CryptoFacade::open(config.clone()).await.unwrap();
        facade.ensure_keypair().await.unwrap();
        let room = facade.create_room().await.unwrap();
        facade.rotate_room_key(room.room_id()).await.unwrap();
        facade.erase_account().await.unwrap();
        room.room_id().to_string()
    };

    let facade = CryptoFacade::open(config).await.unwrap();
    assert_eq!(facade.room_state(&room_id).await.unwrap(), RoomKeyState::NoKey);
    assert!(matches!(
        facade.public_key().await,
        Err(Error::KeyNotFound(_))
    ));
}
