//! Double-ratchet session layer for the wisp messaging transport.
//!
//! This crate owns the per-peer pairwise encrypted channel:
//! - Session state model (sessions, ratchet states, chains, message keys)
//! - Session bootstrap from pre-key bundles and pre-key messages
//! - The session cipher: per-message key derivation, authenticated
//!   encryption, ratchet advancement
//! - The session store capability and an in-memory implementation
//!
//! Encrypted payloads enter and leave as `enc` nodes of the wisp-core
//! binary codec; everything in between is synchronous and free of I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod address;
pub mod builder;
pub mod cipher;
pub mod error;
pub mod keys;
pub mod message;
pub mod padding;
pub mod state;
pub mod store;

pub use address::SessionAddress;
pub use cipher::SessionCipher;
pub use error::{Error, Result};
pub use keys::Identity;
pub use state::{Session, SessionChain, SessionState};
pub use store::{MemorySessionStore, SessionStore};
