//! Two-peer session exercises.
//!
//! Drives the full path both directions: bundle fetch, outgoing session,
//! pre-key message, ratchet turns, replay and tamper rejection. Transport
//! nodes additionally round-trip through the binary codec so the layers
//! are exercised together the way the socket would.

use std::sync::Mutex;

use wisp_core::node::Node;
use wisp_core::{decode, encode};
use wisp_signal::address::SessionAddress;
use wisp_signal::builder::{create_outgoing, PreKeyBundle};
use wisp_signal::cipher::AddressLocks;
use wisp_signal::padding::{pad, unpad};
use wisp_signal::{Error, Identity, MemorySessionStore, SessionCipher};

struct Peer {
    identity: Identity,
    store: MemorySessionStore,
    locks: AddressLocks,
}

impl Peer {
    fn new(pre_key_count: u32) -> Self {
        Self {
            identity: Identity::generate(pre_key_count),
            store: MemorySessionStore::new(),
            locks: AddressLocks::new(),
        }
    }

    fn bundle(&self) -> PreKeyBundle {
        let signed = self.identity.signed_pre_key();
        let one_time = self.identity.find_pre_key(1);
        PreKeyBundle {
            registration_id: self.identity.registration_id(),
            identity_key: self.identity.identity_public(),
            signed_pre_key_id: signed.id,
            signed_pre_key: signed.key_pair.public_encoded(),
            pre_key_id: one_time.map(|pre_key| pre_key.id),
            pre_key: one_time.map(|pre_key| pre_key.key_pair.public_encoded()),
        }
    }

    fn cipher<'a>(&'a self, address: &SessionAddress) -> SessionCipher<'a, MemorySessionStore> {
        SessionCipher::new(address.clone(), &self.identity, &self.store, &self.locks)
    }
}

/// Alice fetches Bob's bundle and builds the outgoing session.
fn establish() -> (Peer, Peer, SessionAddress, SessionAddress) {
    let alice = Peer::new(4);
    let bob = Peer::new(4);
    let bob_address = SessionAddress::new("bob", 0);
    let alice_address = SessionAddress::new("alice", 0);
    create_outgoing(&alice.identity, &alice.store, &bob_address, &bob.bundle()).unwrap();
    (alice, bob, alice_address, bob_address)
}

/// Ship a node the way the socket would: through the binary codec.
fn transport(node: &Node) -> Node {
    decode(&encode(node).unwrap()).unwrap()
}

#[test]
fn test_pre_key_message_establishes_session() {
    let (alice, bob, alice_address, bob_address) = establish();

    let node = alice.cipher(&bob_address).encrypt(b"hello bob").unwrap();
    assert_eq!(node.description, "enc");
    assert_eq!(node.attributes.get_text("v"), Some("2"));
    assert_eq!(node.attributes.get_text("type"), Some("pkmsg"));

    let plaintext = bob.cipher(&alice_address).decrypt(&transport(&node)).unwrap();
    assert_eq!(&*plaintext, b"hello bob");

    // Still no reply: Alice keeps wrapping pre-key messages.
    let second = alice.cipher(&bob_address).encrypt(b"still there?").unwrap();
    assert_eq!(second.attributes.get_text("type"), Some("pkmsg"));
    assert_eq!(
        &*bob.cipher(&alice_address).decrypt(&transport(&second)).unwrap(),
        b"still there?"
    );

    // Bob's reply is a plain message and completes the round trip.
    let reply = bob.cipher(&alice_address).encrypt(b"here").unwrap();
    assert_eq!(reply.attributes.get_text("type"), Some("msg"));
    assert_eq!(
        &*alice.cipher(&bob_address).decrypt(&transport(&reply)).unwrap(),
        b"here"
    );

    // The pre-key reference is cleared once a message round-trips.
    let third = alice.cipher(&bob_address).encrypt(b"good").unwrap();
    assert_eq!(third.attributes.get_text("type"), Some("msg"));
    assert_eq!(
        &*bob.cipher(&alice_address).decrypt(&transport(&third)).unwrap(),
        b"good"
    );
}

#[test]
fn test_fifty_alternating_messages() {
    let (alice, bob, alice_address, bob_address) = establish();

    for round in 0..50u32 {
        let outbound = format!("alice {round}");
        let node = alice.cipher(&bob_address).encrypt(outbound.as_bytes()).unwrap();
        let received = bob.cipher(&alice_address).decrypt(&transport(&node)).unwrap();
        assert_eq!(&*received, outbound.as_bytes());

        let inbound = format!("bob {round}");
        let node = bob.cipher(&alice_address).encrypt(inbound.as_bytes()).unwrap();
        let received = alice.cipher(&bob_address).decrypt(&transport(&node)).unwrap();
        assert_eq!(&*received, inbound.as_bytes());
    }
}

#[test]
fn test_replay_is_rejected() {
    let (alice, bob, alice_address, bob_address) = establish();

    let node = alice.cipher(&bob_address).encrypt(b"once only").unwrap();
    let delivered = transport(&node);
    assert_eq!(
        &*bob.cipher(&alice_address).decrypt(&delivered).unwrap(),
        b"once only"
    );

    match bob.cipher(&alice_address).decrypt(&delivered) {
        Err(Error::MissingMessageKey { counter }) => assert_eq!(counter, 0),
        other => panic!("expected MissingMessageKey, got {other:?}"),
    }
}

#[test]
fn test_replay_after_many_ratchet_turns() {
    let (alice, bob, alice_address, bob_address) = establish();

    let first = transport(&alice.cipher(&bob_address).encrypt(b"first").unwrap());
    bob.cipher(&alice_address).decrypt(&first).unwrap();

    for round in 0..10u32 {
        let ping = bob.cipher(&alice_address).encrypt(&round.to_be_bytes()).unwrap();
        alice.cipher(&bob_address).decrypt(&transport(&ping)).unwrap();
        let pong = alice.cipher(&bob_address).encrypt(&round.to_be_bytes()).unwrap();
        bob.cipher(&alice_address).decrypt(&transport(&pong)).unwrap();
    }

    // The very first envelope stays dead after the ratchet moved on.
    assert!(bob.cipher(&alice_address).decrypt(&first).is_err());
}

#[test]
fn test_out_of_order_delivery() {
    let (alice, bob, alice_address, bob_address) = establish();

    let first = transport(&alice.cipher(&bob_address).encrypt(b"one").unwrap());
    let second = transport(&alice.cipher(&bob_address).encrypt(b"two").unwrap());
    let third = transport(&alice.cipher(&bob_address).encrypt(b"three").unwrap());

    let bob_cipher = bob.cipher(&alice_address);
    assert_eq!(&*bob_cipher.decrypt(&third).unwrap(), b"three");
    assert_eq!(&*bob_cipher.decrypt(&first).unwrap(), b"one");
    assert_eq!(&*bob_cipher.decrypt(&second).unwrap(), b"two");
}

#[test]
fn test_corrupted_mac_never_yields_plaintext() {
    let (alice, bob, alice_address, bob_address) = establish();

    // Establish both directions so tampering hits a plain message.
    let opening = transport(&alice.cipher(&bob_address).encrypt(b"open").unwrap());
    bob.cipher(&alice_address).decrypt(&opening).unwrap();
    let reply = transport(&bob.cipher(&alice_address).encrypt(b"ack").unwrap());
    alice.cipher(&bob_address).decrypt(&reply).unwrap();

    let node = alice.cipher(&bob_address).encrypt(b"payload").unwrap();
    let mut payload = node.bytes().unwrap().to_vec();
    let last = payload.len() - 1;
    payload[last] ^= 0x01; // flip one MAC bit

    let result = bob
        .cipher(&alice_address)
        .decrypt_message(&payload);
    match result {
        Err(Error::MacMismatch) => {}
        other => panic!("expected MacMismatch, got {other:?}"),
    }

    // The untampered original still decrypts: the failed attempt did not
    // consume the message key.
    let intact = node.bytes().unwrap();
    assert_eq!(
        &*bob.cipher(&alice_address).decrypt_message(intact).unwrap(),
        b"payload"
    );
}

#[test]
fn test_corrupted_ciphertext_fails_before_decryption() {
    let (alice, bob, alice_address, bob_address) = establish();

    let opening = transport(&alice.cipher(&bob_address).encrypt(b"open").unwrap());
    bob.cipher(&alice_address).decrypt(&opening).unwrap();
    let reply = transport(&bob.cipher(&alice_address).encrypt(b"ack").unwrap());
    alice.cipher(&bob_address).decrypt(&reply).unwrap();

    let node = alice.cipher(&bob_address).encrypt(b"payload").unwrap();
    let mut payload = node.bytes().unwrap().to_vec();
    // Flip a ciphertext bit: the MAC covers it, so verification fails
    // before AES runs.
    let index = payload.len() / 2;
    payload[index] ^= 0x80;

    assert!(matches!(
        bob.cipher(&alice_address).decrypt_message(&payload),
        Err(Error::MacMismatch)
    ));
}

#[test]
fn test_untrusted_identity_blocks_both_directions() {
    let (alice, bob, alice_address, bob_address) = establish();

    // Bob pins a different identity for Alice: her pre-key message dies.
    bob.store.pin_identity(&alice_address, &[0xEE; 33]);
    let node = alice.cipher(&bob_address).encrypt(b"hello").unwrap();
    assert!(matches!(
        bob.cipher(&alice_address).decrypt(&node),
        Err(Error::UntrustedIdentity(_))
    ));

    // Alice pins a different identity for Bob: her own encrypt dies.
    alice.store.pin_identity(&bob_address, &[0xEE; 33]);
    assert!(matches!(
        alice.cipher(&bob_address).encrypt(b"hello"),
        Err(Error::UntrustedIdentity(_))
    ));
}

#[test]
fn test_missing_session_errors() {
    let bob = Peer::new(0);
    let ghost = SessionAddress::new("ghost", 0);
    assert!(matches!(
        bob.cipher(&ghost).encrypt(b"x"),
        Err(Error::SessionMissing(_))
    ));
    assert!(matches!(
        bob.cipher(&ghost).decrypt_message(&[0x33]),
        Err(Error::Malformed(_))
    ));
}

#[test]
fn test_padded_payload_round_trip() {
    let (alice, bob, alice_address, bob_address) = establish();

    let padded = pad(b"application payload");
    let node = alice.cipher(&bob_address).encrypt(&padded).unwrap();
    let decrypted = bob.cipher(&alice_address).decrypt(&transport(&node)).unwrap();
    assert_eq!(unpad(&decrypted).unwrap(), b"application payload");
}

#[test]
fn test_concurrent_encrypts_on_one_address() {
    let (alice, bob, alice_address, bob_address) = establish();

    let envelopes = Mutex::new(Vec::new());
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..10 {
                    let node = alice.cipher(&bob_address).encrypt(b"burst").unwrap();
                    envelopes.lock().unwrap().push(node);
                }
            });
        }
    });

    // Every message got a distinct counter and decrypts exactly once,
    // regardless of arrival order.
    let envelopes = envelopes.into_inner().unwrap();
    assert_eq!(envelopes.len(), 40);
    for node in &envelopes {
        assert_eq!(
            &*bob.cipher(&alice_address).decrypt(&transport(node)).unwrap(),
            b"burst"
        );
    }
}
