//! The session store capability.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use subtle::ConstantTimeEq;

use crate::address::SessionAddress;
use crate::state::Session;

/// Persists sessions by address and answers identity-trust queries.
///
/// Implementations must be safe to call from the per-address exclusive
/// regions the cipher holds: a `find` after a `put` in the same region
/// observes the written session.
pub trait SessionStore: Send + Sync {
    /// The session for an address, if one exists.
    fn find(&self, address: &SessionAddress) -> Option<Session>;

    /// Insert or replace the session for an address.
    fn put(&self, address: &SessionAddress, session: Session);

    /// Whether the remote identity key passes the trust policy for this
    /// address.
    fn is_trusted(&self, address: &SessionAddress, remote_identity_key: &[u8]) -> bool;
}

/// In-memory store with trust-on-first-use identity pinning.
///
/// The default backend for tests and short-lived clients; durable backends
/// implement [`SessionStore`] over their own storage.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionAddress, Session>>,
    identities: RwLock<HashMap<SessionAddress, Vec<u8>>>,
}

impl MemorySessionStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin an identity key for an address; later keys must match it.
    pub fn pin_identity(&self, address: &SessionAddress, identity_key: &[u8]) {
        self.identities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.clone(), identity_key.to_vec());
    }
}

impl SessionStore for MemorySessionStore {
    fn find(&self, address: &SessionAddress) -> Option<Session> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
    }

    fn put(&self, address: &SessionAddress, session: Session) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.clone(), session);
    }

    fn is_trusted(&self, address: &SessionAddress, remote_identity_key: &[u8]) -> bool {
        match self
            .identities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
        {
            Some(pinned) => pinned.ct_eq(remote_identity_key).into(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_after_put() {
        let store = MemorySessionStore::new();
        let address = SessionAddress::new("peer", 0);
        assert!(store.find(&address).is_none());
        store.put(&address, Session::new());
        assert!(store.find(&address).is_some());
    }

    #[test]
    fn test_trust_on_first_use() {
        let store = MemorySessionStore::new();
        let address = SessionAddress::new("peer", 0);
        // Unpinned: anything goes.
        assert!(store.is_trusted(&address, &[1; 33]));
        store.pin_identity(&address, &[1; 33]);
        assert!(store.is_trusted(&address, &[1; 33]));
        assert!(!store.is_trusted(&address, &[2; 33]));
    }

    #[test]
    fn test_sessions_are_per_address() {
        let store = MemorySessionStore::new();
        store.put(&SessionAddress::new("a", 0), Session::new());
        assert!(store.find(&SessionAddress::new("a", 1)).is_none());
    }
}
