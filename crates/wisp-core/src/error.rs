//! Error types for codec operations.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Codec operation errors.
///
/// All variants are fatal to the decode or encode call that raised them,
/// never to the surrounding stream: the caller drops the frame and
/// continues.
#[derive(Debug, Error)]
pub enum Error {
    /// Structurally invalid input.
    #[error("Malformed input: {0}")]
    Malformed(String),

    /// Input ended before a declared field.
    #[error("Truncated input: need {needed} more bytes, {available} available")]
    Truncated {
        /// Bytes required by the pending read.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// A strict string was required but another value type was decoded.
    #[error("Expected string, decoded {actual}")]
    UnexpectedType {
        /// Human-readable name of the offending value type.
        actual: &'static str,
    },

    /// A token index fell outside its dictionary.
    #[error("Unknown token: tag {tag} index {index}")]
    UnknownToken {
        /// Tag byte that selected the dictionary.
        tag: u8,
        /// Index that missed the table.
        index: usize,
    },

    /// A value cannot be represented on the wire.
    #[error("Unencodable value: {0}")]
    Unencodable(String),
}
