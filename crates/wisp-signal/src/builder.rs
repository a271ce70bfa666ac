//! Session bootstrap.
//!
//! Builds the first [`SessionState`] of a pairwise channel from either side
//! of the handshake: outgoing from a fetched pre-key bundle, incoming from
//! a received pre-key message. Both sides derive the same master secret
//! from four (or five) Diffie-Hellman agreements and split it into the
//! initial root and chain keys.

use tracing::debug;
use zeroize::Zeroizing;

use wisp_crypto::kdf::derive_secrets;
use wisp_crypto::{KeyPair, CURRENT_VERSION, ENCODED_KEY_LENGTH, KEY_LENGTH};

use crate::address::SessionAddress;
use crate::cipher::calculate_sending_ratchet;
use crate::error::{Error, Result};
use crate::keys::Identity;
use crate::message::PreKeyMessage;
use crate::state::{PendingPreKey, Session, SessionChain, SessionState};
use crate::store::SessionStore;

/// HKDF info for the master-secret split.
const WHISPER_TEXT: &[u8] = b"WhisperText";

/// Discontinuity prefix mixed ahead of the agreements.
const DISCONTINUITY: [u8; KEY_LENGTH] = [0xFF; KEY_LENGTH];

/// A peer's published pre-key bundle, as fetched from the directory.
#[derive(Debug, Clone)]
pub struct PreKeyBundle {
    /// Peer registration identifier.
    pub registration_id: u32,
    /// Peer encoded identity key.
    pub identity_key: [u8; ENCODED_KEY_LENGTH],
    /// Signed pre-key id.
    pub signed_pre_key_id: u32,
    /// Signed pre-key (encoded). Its signature is verified by the
    /// handshake layer before the bundle reaches this crate.
    pub signed_pre_key: [u8; ENCODED_KEY_LENGTH],
    /// Optional one-time pre-key id.
    pub pre_key_id: Option<u32>,
    /// Optional one-time pre-key (encoded).
    pub pre_key: Option<[u8; ENCODED_KEY_LENGTH]>,
}

/// Create and persist an outgoing session from a pre-key bundle.
///
/// The resulting state carries a [`PendingPreKey`] so the first outgoing
/// messages are wrapped as pre-key messages until one round-trips.
pub fn create_outgoing<S: SessionStore + ?Sized>(
    identity: &Identity,
    store: &S,
    address: &SessionAddress,
    bundle: &PreKeyBundle,
) -> Result<()> {
    if !store.is_trusted(address, &bundle.identity_key) {
        return Err(Error::UntrustedIdentity(address.to_string()));
    }

    let base = KeyPair::generate();
    let mut master = Vec::with_capacity(5 * KEY_LENGTH);
    master.extend_from_slice(&DISCONTINUITY);
    master.extend_from_slice(
        &identity
            .identity_key_pair()
            .agreement(&bundle.signed_pre_key)?[..],
    );
    master.extend_from_slice(&base.agreement(&bundle.identity_key)?[..]);
    master.extend_from_slice(&base.agreement(&bundle.signed_pre_key)?[..]);
    if let Some(pre_key) = &bundle.pre_key {
        master.extend_from_slice(&base.agreement(pre_key)?[..]);
    }
    let master = Zeroizing::new(master);

    let [root_key, chain_key] = derive_secrets::<2>(&master, WHISPER_TEXT)?;

    let mut state = SessionState::new(
        CURRENT_VERSION,
        base.clone(),
        base.public_encoded(),
        bundle.identity_key,
        root_key,
    );
    // The peer's signed pre-key is its first ratchet key: seed the
    // receiving chain, then turn the ratchet once for our sending chain.
    state.add_chain(&bundle.signed_pre_key, SessionChain::new(chain_key));
    state.last_remote_ephemeral = Some(bundle.signed_pre_key);
    calculate_sending_ratchet(&mut state, &bundle.signed_pre_key)?;

    state.pending_pre_key = Some(PendingPreKey {
        pre_key_id: bundle.pre_key_id,
        signed_key_id: bundle.signed_pre_key_id,
        base_key: base.public_encoded(),
    });

    let mut session = store.find(address).unwrap_or_default();
    session.push_state(state);
    store.put(address, session);
    debug!(address = %address, "created outgoing session");
    Ok(())
}

/// Derive the incoming session state a pre-key message announces.
///
/// Idempotent on redelivery: if a state for the message's base key already
/// exists the session is left untouched. Trust was checked by the caller
/// against the message's identity key.
pub fn create_incoming(
    identity: &Identity,
    session: &mut Session,
    message: &PreKeyMessage,
) -> Result<()> {
    if session
        .find_state(message.version, &message.base_key)
        .is_some()
    {
        return Ok(());
    }
    if message.registration_id == 0 {
        return Err(Error::Malformed("missing registration id".into()));
    }

    let signed = identity.signed_pre_key();
    if signed.id != message.signed_pre_key_id {
        return Err(Error::InvalidState(format!(
            "unknown signed pre-key id {}",
            message.signed_pre_key_id
        )));
    }
    let one_time = match message.pre_key_id {
        Some(id) => Some(identity.find_pre_key(id).ok_or_else(|| {
            Error::InvalidState(format!("unknown one-time pre-key id {id}"))
        })?),
        None => None,
    };

    let mut master = Vec::with_capacity(5 * KEY_LENGTH);
    master.extend_from_slice(&DISCONTINUITY);
    master.extend_from_slice(&signed.key_pair.agreement(&message.identity_key)?[..]);
    master.extend_from_slice(
        &identity
            .identity_key_pair()
            .agreement(&message.base_key)?[..],
    );
    master.extend_from_slice(&signed.key_pair.agreement(&message.base_key)?[..]);
    if let Some(pre_key) = one_time {
        master.extend_from_slice(&pre_key.key_pair.agreement(&message.base_key)?[..]);
    }
    let master = Zeroizing::new(master);

    let [root_key, chain_key] = derive_secrets::<2>(&master, WHISPER_TEXT)?;

    // Our signed pre-key doubles as the first ratchet key: the chain it
    // names is our sending chain until the peer's first reply turns the
    // ratchet.
    let mut state = SessionState::new(
        message.version,
        signed.key_pair.clone(),
        message.base_key,
        message.identity_key,
        root_key,
    );
    state.add_chain(&signed.key_pair.public_encoded(), SessionChain::new(chain_key));

    session.push_state(state);
    debug!("created incoming session state");
    Ok(())
}
