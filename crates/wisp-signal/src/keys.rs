//! Local identity key material.
//!
//! The outer handshake provisions this material; the session layer only
//! consumes it. Signatures over signed pre-keys are produced and verified
//! by that collaborator, so they travel here as opaque bytes.

use rand::Rng;

use wisp_crypto::{KeyPair, ENCODED_KEY_LENGTH};

/// A one-time pre-key.
#[derive(Debug, Clone)]
pub struct PreKey {
    /// Identifier published in the pre-key bundle.
    pub id: u32,
    /// The key pair itself.
    pub key_pair: KeyPair,
}

/// The signed pre-key.
#[derive(Debug, Clone)]
pub struct SignedPreKey {
    /// Identifier published in the pre-key bundle.
    pub id: u32,
    /// The key pair itself.
    pub key_pair: KeyPair,
    /// Signature by the identity key, verified by the handshake layer.
    pub signature: Vec<u8>,
}

/// Local identity: everything this device contributes to new sessions.
#[derive(Debug)]
pub struct Identity {
    identity: KeyPair,
    registration_id: u32,
    signed_pre_key: SignedPreKey,
    pre_keys: Vec<PreKey>,
}

impl Identity {
    /// Assemble an identity from provisioned material.
    pub fn new(
        identity: KeyPair,
        registration_id: u32,
        signed_pre_key: SignedPreKey,
        pre_keys: Vec<PreKey>,
    ) -> Self {
        Self {
            identity,
            registration_id,
            signed_pre_key,
            pre_keys,
        }
    }

    /// Generate a throwaway identity with `pre_key_count` one-time keys.
    ///
    /// The signed pre-key carries an empty signature; tests and local
    /// tooling don't route through the handshake's verifier.
    pub fn generate(pre_key_count: u32) -> Self {
        let mut rng = rand::thread_rng();
        let identity = KeyPair::generate();
        let signed_pre_key = SignedPreKey {
            id: rng.gen_range(1..0x00FF_FFFF),
            key_pair: KeyPair::generate(),
            signature: Vec::new(),
        };
        let pre_keys = (1..=pre_key_count)
            .map(|id| PreKey {
                id,
                key_pair: KeyPair::generate(),
            })
            .collect();
        Self {
            identity,
            registration_id: rng.gen_range(1..16380),
            signed_pre_key,
            pre_keys,
        }
    }

    /// The identity key pair.
    pub fn identity_key_pair(&self) -> &KeyPair {
        &self.identity
    }

    /// Encoded identity public key, as fed into message MACs.
    pub fn identity_public(&self) -> [u8; ENCODED_KEY_LENGTH] {
        self.identity.public_encoded()
    }

    /// Registration identifier advertised in pre-key messages.
    pub fn registration_id(&self) -> u32 {
        self.registration_id
    }

    /// The current signed pre-key.
    pub fn signed_pre_key(&self) -> &SignedPreKey {
        &self.signed_pre_key
    }

    /// Look up a one-time pre-key by id.
    pub fn find_pre_key(&self, id: u32) -> Option<&PreKey> {
        self.pre_keys.iter().find(|pre_key| pre_key.id == id)
    }

    /// Remove a consumed one-time pre-key.
    pub fn remove_pre_key(&mut self, id: u32) {
        self.pre_keys.retain(|pre_key| pre_key.id != id);
    }
}
