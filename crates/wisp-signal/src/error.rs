//! Error types for session operations.

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Session operation errors.
///
/// The security variants ([`Error::UntrustedIdentity`],
/// [`Error::MacMismatch`]) abort the attempt they occur in and are never
/// folded into a catch-all; the recoverable variants leave the persisted
/// session untouched so the caller can retry or re-establish.
#[derive(Debug, Error)]
pub enum Error {
    /// No session exists for the address and no bootstrap material was
    /// supplied. Recoverable by running a new handshake.
    #[error("No session for {0}")]
    SessionMissing(String),

    /// Every session state failed to decrypt the message. Recoverable by
    /// re-establishing the session.
    #[error("No suitable session state found")]
    NoSuitableSession,

    /// The remote identity key failed the store's trust policy.
    #[error("Untrusted identity key for {0}")]
    UntrustedIdentity(String),

    /// Message authentication failed.
    #[error("MAC verification failed")]
    MacMismatch,

    /// A chain was asked to advance further than the replay-window policy
    /// allows.
    #[error("Message overflow: counter jump of {jump} exceeds {limit}")]
    MessageOverflow {
        /// Requested forward jump.
        jump: u32,
        /// Policy bound.
        limit: u32,
    },

    /// A closed chain (key already discarded) was asked for new message
    /// keys.
    #[error("Chain is closed")]
    ChainClosed,

    /// No message key at the requested counter: either already consumed
    /// (replay) or pruned below the window. The message is dropped; the
    /// session is intact.
    #[error("No message key at counter {counter}: consumed or never filled")]
    MissingMessageKey {
        /// Counter the message named.
        counter: u32,
    },

    /// Session state violated an internal invariant.
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Malformed envelope or node.
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// Codec failure while building or reading transport nodes.
    #[error(transparent)]
    Codec(#[from] wisp_core::Error),

    /// Primitive failure (key derivation, agreement, CBC).
    #[error(transparent)]
    Crypto(#[from] wisp_crypto::Error),
}

impl Error {
    /// True for failures that must never be silently swallowed while
    /// probing alternative session states.
    pub fn is_security_failure(&self) -> bool {
        matches!(self, Self::UntrustedIdentity(_) | Self::MacMismatch)
    }
}
