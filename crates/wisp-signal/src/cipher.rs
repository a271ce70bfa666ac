//! The session cipher: double-ratchet encryption and decryption.
//!
//! Every operation runs inside a per-address exclusive region, mutates a
//! private copy of the session, and persists it only after full success.
//! Decryption verifies the truncated MAC before any ciphertext is touched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use wisp_core::node::{Attributes, Node, NodeContent, Value};
use wisp_crypto::kdf::{derive_secrets, derive_secrets_with_salt, Secret};
use wisp_crypto::{
    cbc, mac, KeyPair, CURRENT_VERSION, ENCODED_KEY_LENGTH, IV_LENGTH, MAC_LENGTH,
};

use crate::address::SessionAddress;
use crate::error::{Error, Result};
use crate::keys::Identity;
use crate::message::{PreKeyMessage, SignalMessage};
use crate::state::{SessionChain, SessionState};
use crate::store::SessionStore;

/// Longest forward jump a chain may be asked to fill in one call.
///
/// Bounds the cost of unauthenticated forward-stepping and caps how far a
/// hostile peer can push the counter ahead.
pub const MAX_FORWARD_JUMP: u32 = 2000;

/// HKDF info for per-message key expansion.
const WHISPER_MESSAGE_KEYS: &[u8] = b"WhisperMessageKeys";

/// HKDF info for ratchet-step expansion.
const WHISPER_RATCHET: &[u8] = b"WhisperRatchet";

/// HMAC seed deriving a message key from a chain key.
const MESSAGE_KEY_SEED: [u8; 1] = [0x01];

/// HMAC seed advancing a chain key.
const CHAIN_KEY_SEED: [u8; 1] = [0x02];

/// Registry of per-address locks serializing cipher operations.
///
/// Operations on the same address are mutually exclusive; different
/// addresses proceed in parallel. Guards are never held across I/O.
#[derive(Default)]
pub struct AddressLocks {
    registry: Mutex<HashMap<SessionAddress, Arc<Mutex<()>>>>,
}

impl AddressLocks {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock handle for an address, created on first use.
    pub fn handle(&self, address: &SessionAddress) -> Arc<Mutex<()>> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(address.clone())
            .or_default()
            .clone()
    }
}

/// Encrypts and decrypts messages for one peer address.
pub struct SessionCipher<'a, S: SessionStore + ?Sized> {
    address: SessionAddress,
    identity: &'a Identity,
    store: &'a S,
    locks: &'a AddressLocks,
}

impl<'a, S: SessionStore + ?Sized> SessionCipher<'a, S> {
    /// A cipher bound to one peer address.
    pub fn new(
        address: SessionAddress,
        identity: &'a Identity,
        store: &'a S,
        locks: &'a AddressLocks,
    ) -> Self {
        Self {
            address,
            identity,
            store,
            locks,
        }
    }

    /// Encrypt a payload into a transport `enc` node.
    ///
    /// Advances the sending chain by one, consumes the derived message key,
    /// and persists the session. While the state still carries its pre-key
    /// reference the envelope is a pre-key message (`type="pkmsg"`),
    /// otherwise a plain ratchet message (`type="msg"`).
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Node> {
        let lock = self.locks.handle(&self.address);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut session = self
            .store
            .find(&self.address)
            .ok_or_else(|| Error::SessionMissing(self.address.to_string()))?;

        let (envelope, envelope_kind) = {
            let state = session
                .current_state_mut()
                .ok_or_else(|| Error::SessionMissing(self.address.to_string()))?;
            if !self.store.is_trusted(&self.address, &state.remote_identity_key) {
                return Err(Error::UntrustedIdentity(self.address.to_string()));
            }

            let sending_key = state.ephemeral.public_encoded();
            let previous_counter = state.previous_counter;
            let remote_identity_key = state.remote_identity_key;
            let chain = state
                .find_chain_mut(&sending_key)
                .ok_or_else(|| Error::InvalidState("missing sending chain".into()))?;

            fill_message_keys(chain, (chain.counter + 1) as u32)?;
            let counter = chain.counter as u32;
            let message_key = chain
                .message_keys
                .remove(&counter)
                .ok_or_else(|| Error::InvalidState("sending message key missing".into()))?;

            let (cipher_key, mac_key, iv) = message_secrets(&message_key[..])?;
            let ciphertext = cbc::encrypt(&cipher_key, &iv, plaintext);

            let mut message =
                SignalMessage::new(sending_key, counter, previous_counter, ciphertext);
            let tag = mac::hmac_sha256(
                &mac_key[..],
                &mac_input(
                    &self.identity.identity_public(),
                    &remote_identity_key,
                    &message.serialized_without_mac(),
                ),
            );
            message.mac.copy_from_slice(&tag[..MAC_LENGTH]);

            match &state.pending_pre_key {
                Some(pending) => {
                    let wrapped = PreKeyMessage {
                        version: CURRENT_VERSION,
                        registration_id: self.identity.registration_id(),
                        pre_key_id: pending.pre_key_id,
                        signed_pre_key_id: pending.signed_key_id,
                        base_key: pending.base_key,
                        identity_key: self.identity.identity_public(),
                        message,
                    };
                    (wrapped.serialize(), "pkmsg")
                }
                None => (message.serialize(), "msg"),
            }
        };

        self.store.put(&self.address, session);

        let mut attributes = Attributes::new();
        attributes.insert("v", Value::Text("2".into()));
        attributes.insert("type", Value::Text(envelope_kind.into()));
        Ok(Node::with_content(
            "enc",
            attributes,
            NodeContent::Bytes(envelope),
        ))
    }

    /// Decrypt a transport `enc` node, dispatching on its `type` attribute.
    pub fn decrypt(&self, node: &Node) -> Result<Zeroizing<Vec<u8>>> {
        if node.description != "enc" {
            return Err(Error::Malformed(format!(
                "expected enc node, got {}",
                node.description
            )));
        }
        let payload = node
            .bytes()
            .ok_or_else(|| Error::Malformed("enc node without binary body".into()))?;
        match node.attributes.get_text("type") {
            Some("pkmsg") => self.decrypt_pre_key_message(payload),
            Some("msg") => self.decrypt_message(payload),
            other => Err(Error::Malformed(format!(
                "unknown enc type {other:?}"
            ))),
        }
    }

    /// Decrypt a pre-key message, building the session state it announces
    /// if this is its first delivery.
    pub fn decrypt_pre_key_message(&self, payload: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let lock = self.locks.handle(&self.address);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let message = PreKeyMessage::parse(payload)?;
        if !self.store.is_trusted(&self.address, &message.identity_key) {
            return Err(Error::UntrustedIdentity(self.address.to_string()));
        }

        let mut session = self.store.find(&self.address).unwrap_or_default();
        crate::builder::create_incoming(self.identity, &mut session, &message)?;
        let index = session
            .find_state(message.version, &message.base_key)
            .ok_or_else(|| Error::InvalidState("pre-key state not built".into()))?;

        let mut candidate = session.states[index].clone();
        let plaintext = self.decrypt_with_state(&mut candidate, &message.message)?;
        session.states[index] = candidate;
        session.promote(index);
        self.store.put(&self.address, session);
        Ok(plaintext)
    }

    /// Decrypt a plain ratchet message against the first session state that
    /// accepts it.
    ///
    /// Each state is tried on a private clone; a failed attempt leaves no
    /// trace. Non-security failures move on to the next state; security
    /// failures are remembered and reported if nothing succeeds, so a
    /// tampered message is never masked as "no session".
    pub fn decrypt_message(&self, payload: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let lock = self.locks.handle(&self.address);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let message = SignalMessage::parse(payload)?;
        let mut session = self
            .store
            .find(&self.address)
            .ok_or_else(|| Error::SessionMissing(self.address.to_string()))?;

        let mut security_failure = None;
        for index in 0..session.states.len() {
            if !self
                .store
                .is_trusted(&self.address, &session.states[index].remote_identity_key)
            {
                warn!(address = %self.address, index, "skipping state with untrusted identity");
                security_failure
                    .get_or_insert(Error::UntrustedIdentity(self.address.to_string()));
                continue;
            }

            let mut candidate = session.states[index].clone();
            match self.decrypt_with_state(&mut candidate, &message) {
                Ok(plaintext) => {
                    session.states[index] = candidate;
                    session.promote(index);
                    self.store.put(&self.address, session);
                    return Ok(plaintext);
                }
                Err(error) if error.is_security_failure() => {
                    warn!(address = %self.address, index, %error, "state rejected message");
                    security_failure.get_or_insert(error);
                }
                Err(error) => {
                    debug!(address = %self.address, index, %error, "state failed to decrypt");
                }
            }
        }

        Err(security_failure.unwrap_or(Error::NoSuitableSession))
    }

    /// Decrypt against one state. The caller owns isolation: `state` is a
    /// clone that only replaces the session's copy on success.
    fn decrypt_with_state(
        &self,
        state: &mut SessionState,
        message: &SignalMessage,
    ) -> Result<Zeroizing<Vec<u8>>> {
        maybe_step_ratchet(state, message)?;

        let chain = state
            .find_chain_mut(&message.ephemeral)
            .ok_or_else(|| Error::InvalidState("missing receiving chain".into()))?;
        fill_message_keys(chain, message.counter)?;
        let message_key = chain
            .message_keys
            .remove(&message.counter)
            .ok_or(Error::MissingMessageKey {
                counter: message.counter,
            })?;

        let (cipher_key, mac_key, iv) = message_secrets(&message_key[..])?;

        // Verify before decrypt: ciphertext is untrusted until the MAC
        // over both identities and the serialized message checks out.
        let authenticated = mac_input(
            &state.remote_identity_key,
            &self.identity.identity_public(),
            &message.serialized_without_mac(),
        );
        if !mac::verify_truncated(&message.mac, &mac_key[..], &authenticated) {
            return Err(Error::MacMismatch);
        }

        let plaintext = cbc::decrypt(&cipher_key, &iv, &message.ciphertext)?;
        state.pending_pre_key = None;
        Ok(plaintext)
    }
}

/// MAC input layout: sender identity, receiver identity, then the message
/// bytes the tag covers.
fn mac_input(
    sender_identity: &[u8; ENCODED_KEY_LENGTH],
    receiver_identity: &[u8; ENCODED_KEY_LENGTH],
    message: &[u8],
) -> Vec<u8> {
    let mut input = Vec::with_capacity(2 * ENCODED_KEY_LENGTH + message.len());
    input.extend_from_slice(sender_identity);
    input.extend_from_slice(receiver_identity);
    input.extend_from_slice(message);
    input
}

/// Expand one message key into cipher key, MAC key, and IV.
fn message_secrets(message_key: &[u8]) -> Result<(Secret, Secret, [u8; IV_LENGTH])> {
    let [cipher_key, mac_key, iv_seed] = derive_secrets::<3>(message_key, WHISPER_MESSAGE_KEYS)?;
    let mut iv = [0u8; IV_LENGTH];
    iv.copy_from_slice(&iv_seed[..IV_LENGTH]);
    Ok((cipher_key, mac_key, iv))
}

/// Advance a chain until a message key exists for `target`.
///
/// No-op when the chain is already there. The forward jump is bounded by
/// [`MAX_FORWARD_JUMP`] and a closed chain cannot advance; both checks run
/// before any mutation, so a failed call leaves the chain untouched.
pub(crate) fn fill_message_keys(chain: &mut SessionChain, target: u32) -> Result<()> {
    let target = i64::from(target);
    if chain.counter >= target {
        return Ok(());
    }

    let jump = (target - chain.counter) as u32;
    if jump > MAX_FORWARD_JUMP {
        return Err(Error::MessageOverflow {
            jump,
            limit: MAX_FORWARD_JUMP,
        });
    }
    if chain.is_closed() {
        return Err(Error::ChainClosed);
    }

    while chain.counter < target {
        let key = chain.key.as_ref().ok_or(Error::ChainClosed)?;
        let message_key = mac::hmac_sha256(&key[..], &MESSAGE_KEY_SEED);
        let next_key = mac::hmac_sha256(&key[..], &CHAIN_KEY_SEED);
        chain.counter += 1;
        chain
            .message_keys
            .insert(chain.counter as u32, Zeroizing::new(message_key));
        chain.key = Some(Zeroizing::new(next_key));
    }
    Ok(())
}

/// Turn the ratchet when a message arrives under an unknown ephemeral key.
///
/// Drains and closes the previous receiving chain, derives the new
/// receiving chain from the message's key, retires the sending chain into
/// `previous_counter`, and derives a fresh sending chain under a new local
/// ephemeral.
fn maybe_step_ratchet(state: &mut SessionState, message: &SignalMessage) -> Result<()> {
    if state.has_chain(&message.ephemeral) {
        return Ok(());
    }
    debug!(counter = message.counter, "stepping ratchet");

    let previous_counter = state.previous_counter;
    if let Some(last_remote) = state.last_remote_ephemeral {
        if let Some(chain) = state.find_chain_mut(&last_remote) {
            if !chain.is_closed() {
                fill_message_keys(chain, previous_counter)?;
                chain.close();
            }
        }
    }

    calculate_ratchet(state, &message.ephemeral, false)?;

    let sending_key = state.ephemeral.public_encoded();
    if let Some(counter) = state.find_chain(&sending_key).map(|chain| chain.counter) {
        state.previous_counter = counter.max(0) as u32;
        state.remove_chain(&sending_key);
    }

    calculate_sending_ratchet(state, &message.ephemeral)?;
    state.last_remote_ephemeral = Some(message.ephemeral);
    Ok(())
}

/// Generate a fresh local ephemeral and derive its sending chain.
pub(crate) fn calculate_sending_ratchet(
    state: &mut SessionState,
    remote_ephemeral: &[u8],
) -> Result<()> {
    state.ephemeral = KeyPair::generate();
    calculate_ratchet(state, remote_ephemeral, true)
}

/// One half of a Diffie-Hellman ratchet step: mix the agreement into the
/// root key and install the derived chain.
fn calculate_ratchet(
    state: &mut SessionState,
    remote_ephemeral: &[u8],
    sending: bool,
) -> Result<()> {
    let shared = state.ephemeral.agreement(remote_ephemeral)?;
    let [root_key, chain_key] =
        derive_secrets_with_salt::<2>(&shared[..], &state.root_key[..], WHISPER_RATCHET)?;
    if sending {
        let sending_key = state.ephemeral.public_encoded();
        state.add_chain(&sending_key, SessionChain::new(chain_key));
    } else {
        state.add_chain(remote_ephemeral, SessionChain::new(chain_key));
    }
    state.root_key = root_key;
    Ok(())
}
