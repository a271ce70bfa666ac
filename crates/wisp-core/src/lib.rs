//! Binary node codec for the wisp messaging transport.
//!
//! This crate implements the compact binary tree wire format carried by the
//! transport socket:
//! - Node model (tag, ordered attributes, tagged content)
//! - Token dictionaries for single-byte and double-byte string compression
//! - Bounds-checked byte cursor
//! - Decoder and encoder with optional DEFLATE body compression
//!
//! The codec is pure: no I/O, no cryptography. Encrypted payloads travel as
//! opaque byte content inside `enc` nodes; wisp-signal owns their meaning.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cursor;
pub mod decode;
pub mod encode;
pub mod error;
pub mod jid;
pub mod node;
pub mod tokens;

pub use decode::decode;
pub use encode::{encode, encode_compressed};
pub use error::{Error, Result};
pub use jid::{Jid, JidServer};
pub use node::{Attributes, Node, NodeContent, Value};
