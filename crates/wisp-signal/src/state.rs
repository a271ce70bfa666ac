//! The session state model.
//!
//! A [`Session`] owns an ordered list of [`SessionState`] (newest first);
//! each state owns its ratchet chains by value, addressed by the base64 of
//! the ephemeral public key they were derived against. All mutation flows
//! through the owning session; the store never hands out aliased
//! references into live state.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use wisp_crypto::{KeyPair, ENCODED_KEY_LENGTH, KEY_LENGTH};

/// Maximum number of archived (non-current) states kept per session.
pub const ARCHIVED_STATES_MAX: usize = 40;

/// A derived per-message secret.
pub type MessageKey = Zeroizing<[u8; KEY_LENGTH]>;

/// Stable map key for a chain: base64 of the encoded ephemeral public key.
pub fn chain_id(ephemeral_public: &[u8]) -> String {
    BASE64.encode(ephemeral_public)
}

/// Reference to the pre-key material a new outgoing session was built on.
///
/// Present from session creation until the first message round-trips; while
/// set, outgoing messages are wrapped as pre-key messages.
#[derive(Debug, Clone)]
pub struct PendingPreKey {
    /// One-time pre-key id consumed from the bundle, if any.
    pub pre_key_id: Option<u32>,
    /// Signed pre-key id the session was built against.
    pub signed_key_id: u32,
    /// Our base key (encoded) as sent in the pre-key message.
    pub base_key: [u8; ENCODED_KEY_LENGTH],
}

/// One hash-ratchet chain.
#[derive(Debug, Clone)]
pub struct SessionChain {
    /// Highest counter a message key was derived for; -1 before the first.
    pub counter: i64,
    /// Chain key; cleared when the chain is closed by a ratchet step.
    pub key: Option<Zeroizing<[u8; KEY_LENGTH]>>,
    /// Unconsumed message keys by counter. A key is removed exactly once,
    /// at first successful use.
    pub message_keys: HashMap<u32, MessageKey>,
}

impl SessionChain {
    /// A fresh chain seeded with `key`.
    pub fn new(key: Zeroizing<[u8; KEY_LENGTH]>) -> Self {
        Self {
            counter: -1,
            key: Some(key),
            message_keys: HashMap::new(),
        }
    }

    /// True once the chain key has been discarded.
    pub fn is_closed(&self) -> bool {
        self.key.is_none()
    }

    /// Close the chain: no further message keys can be derived.
    pub fn close(&mut self) {
        self.key = None;
    }
}

/// One ratchet state of a session.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Protocol version the state was negotiated at.
    pub version: u8,
    /// Our current ratchet key pair; its public key names the sending
    /// chain.
    pub ephemeral: KeyPair,
    /// Our base key (encoded) from session bootstrap; matches incoming
    /// pre-key messages to this state.
    pub base_key: [u8; ENCODED_KEY_LENGTH],
    /// The peer's encoded identity key, pinned at bootstrap.
    pub remote_identity_key: [u8; ENCODED_KEY_LENGTH],
    /// Ratchet root key.
    pub root_key: Zeroizing<[u8; KEY_LENGTH]>,
    /// Counter of the retired sending chain, carried in outgoing messages.
    pub previous_counter: u32,
    /// Pre-key reference while the session awaits its first round-trip.
    pub pending_pre_key: Option<PendingPreKey>,
    /// The peer ratchet key (encoded) we last derived a receiving chain
    /// against.
    pub last_remote_ephemeral: Option<[u8; ENCODED_KEY_LENGTH]>,
    /// Chains by [`chain_id`] of the ephemeral key they belong to.
    pub chains: HashMap<String, SessionChain>,
}

impl SessionState {
    /// A state fresh out of bootstrap.
    pub fn new(
        version: u8,
        ephemeral: KeyPair,
        base_key: [u8; ENCODED_KEY_LENGTH],
        remote_identity_key: [u8; ENCODED_KEY_LENGTH],
        root_key: Zeroizing<[u8; KEY_LENGTH]>,
    ) -> Self {
        Self {
            version,
            ephemeral,
            base_key,
            remote_identity_key,
            root_key,
            previous_counter: 0,
            pending_pre_key: None,
            last_remote_ephemeral: None,
            chains: HashMap::new(),
        }
    }

    /// True when a chain exists for this ephemeral public key.
    pub fn has_chain(&self, ephemeral_public: &[u8]) -> bool {
        self.chains.contains_key(&chain_id(ephemeral_public))
    }

    /// Chain for an ephemeral public key.
    pub fn find_chain(&self, ephemeral_public: &[u8]) -> Option<&SessionChain> {
        self.chains.get(&chain_id(ephemeral_public))
    }

    /// Mutable chain for an ephemeral public key.
    pub fn find_chain_mut(&mut self, ephemeral_public: &[u8]) -> Option<&mut SessionChain> {
        self.chains.get_mut(&chain_id(ephemeral_public))
    }

    /// Install a chain for an ephemeral public key.
    pub fn add_chain(&mut self, ephemeral_public: &[u8], chain: SessionChain) {
        self.chains.insert(chain_id(ephemeral_public), chain);
    }

    /// Drop the chain for an ephemeral public key.
    pub fn remove_chain(&mut self, ephemeral_public: &[u8]) {
        self.chains.remove(&chain_id(ephemeral_public));
    }
}

/// A persisted session: the unit the store holds per address.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// States, newest first; index 0 is current.
    pub states: Vec<SessionState>,
}

impl Session {
    /// An empty session awaiting bootstrap.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state, if the session is established.
    pub fn current_state(&self) -> Option<&SessionState> {
        self.states.first()
    }

    /// Mutable access to the current state.
    pub fn current_state_mut(&mut self) -> Option<&mut SessionState> {
        self.states.first_mut()
    }

    /// Find the state a pre-key message belongs to.
    pub fn find_state(&self, version: u8, base_key: &[u8]) -> Option<usize> {
        self.states
            .iter()
            .position(|state| state.version == version && state.base_key[..] == *base_key)
    }

    /// Install `state` as current, archiving the previous one. Old states
    /// beyond [`ARCHIVED_STATES_MAX`] fall off the end.
    pub fn push_state(&mut self, state: SessionState) {
        self.states.insert(0, state);
        self.states.truncate(ARCHIVED_STATES_MAX + 1);
    }

    /// Move the state at `index` to the front.
    pub fn promote(&mut self, index: usize) {
        if index > 0 && index < self.states.len() {
            let state = self.states.remove(index);
            self.states.insert(0, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> SessionState {
        SessionState::new(
            3,
            KeyPair::generate(),
            [1; ENCODED_KEY_LENGTH],
            [2; ENCODED_KEY_LENGTH],
            Zeroizing::new([0u8; KEY_LENGTH]),
        )
    }

    #[test]
    fn test_chain_lookup_by_key_bytes() {
        let mut state = test_state();
        let ephemeral = KeyPair::generate();
        state.add_chain(
            &ephemeral.public_encoded(),
            SessionChain::new(Zeroizing::new([9u8; KEY_LENGTH])),
        );
        assert!(state.has_chain(&ephemeral.public_encoded()));
        assert_eq!(
            state
                .find_chain(&ephemeral.public_encoded())
                .unwrap()
                .counter,
            -1
        );
        state.remove_chain(&ephemeral.public_encoded());
        assert!(!state.has_chain(&ephemeral.public_encoded()));
    }

    #[test]
    fn test_closed_chain() {
        let mut chain = SessionChain::new(Zeroizing::new([1u8; KEY_LENGTH]));
        assert!(!chain.is_closed());
        chain.close();
        assert!(chain.is_closed());
    }

    #[test]
    fn test_push_state_caps_archive() {
        let mut session = Session::new();
        for _ in 0..ARCHIVED_STATES_MAX + 5 {
            session.push_state(test_state());
        }
        assert_eq!(session.states.len(), ARCHIVED_STATES_MAX + 1);
    }

    #[test]
    fn test_promote_moves_state_to_front() {
        let mut session = Session::new();
        let mut first = test_state();
        first.previous_counter = 1;
        let mut second = test_state();
        second.previous_counter = 2;
        session.push_state(first);
        session.push_state(second);
        // Current is `second`; promote the archived `first`.
        session.promote(1);
        assert_eq!(session.current_state().unwrap().previous_counter, 1);
    }

    #[test]
    fn test_find_state_by_base_key() {
        let mut session = Session::new();
        let state = test_state();
        let base_key = state.base_key.clone();
        session.push_state(state);
        assert_eq!(session.find_state(3, &base_key), Some(0));
        assert_eq!(session.find_state(2, &base_key), None);
        assert_eq!(session.find_state(3, &[0; ENCODED_KEY_LENGTH]), None);
    }
}
