//! Node tree decoder.
//!
//! Wire layout of a frame body:
//!
//! ```text
//! +-------------+----------------------------------------+
//! | CONTROL (1B)| NODE (raw, or DEFLATE when bit 1 set)  |
//! +-------------+----------------------------------------+
//! ```
//!
//! A node is a size-prefixed cell list: tag name, `(size - 1) / 2` attribute
//! pairs, and (only when the declared size is even) one trailing body cell.
//! The parity convention is load-bearing: odd means no body.

use std::io::Read;

use flate2::read::DeflateDecoder;

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::jid::{Jid, JidServer};
use crate::node::{Attributes, Node, NodeContent, Value};
use crate::tokens::{
    self, BINARY_20, BINARY_32, BINARY_8, COMPANION_JID, DICTIONARY_0, DICTIONARY_3, HEX_8,
    JID_PAIR, LIST_16, LIST_8, LIST_EMPTY, NIBBLE_8,
};

/// Maximum node nesting depth accepted by the decoder.
///
/// Real traffic nests a handful of levels; the bound keeps hostile input
/// from exhausting the stack.
const MAX_DEPTH: usize = 128;

/// Decode one node tree from a frame body.
///
/// The control byte's compression bit selects raw or DEFLATE-compressed
/// payload; decoding continues against the inflated buffer in the latter
/// case. Structural violations, truncation, and inflate failures all
/// surface as errors scoped to this call.
pub fn decode(input: &[u8]) -> Result<Node> {
    let mut cursor = Cursor::new(input);
    let control = cursor.read_u8()?;
    if control & 2 != 0 {
        let inflated = inflate(cursor.read_remaining())?;
        read_node(&mut Cursor::new(&inflated), 0)
    } else {
        read_node(&mut cursor, 0)
    }
}

fn inflate(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut inflated = Vec::new();
    DeflateDecoder::new(compressed)
        .read_to_end(&mut inflated)
        .map_err(|source| Error::Malformed(format!("inflate failed: {source}")))?;
    Ok(inflated)
}

/// One decoded wire value, before it is mapped into attribute or content
/// position.
enum Decoded {
    Null,
    Text(String),
    Bytes(Vec<u8>),
    Jid(Jid),
    Children(Vec<Node>),
}

impl Decoded {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Jid(_) => "jid",
            Self::Children(_) => "list",
        }
    }
}

fn read_node(cursor: &mut Cursor<'_>, depth: usize) -> Result<Node> {
    if depth > MAX_DEPTH {
        return Err(Error::Malformed("node nesting too deep".into()));
    }

    let tag = cursor.read_u8()?;
    let size = read_size(cursor, tag)?;
    if size == 0 {
        return Err(Error::Malformed("node with empty body".into()));
    }

    let description = read_string(cursor, depth)?;
    let mut attributes = Attributes::new();
    for _ in 0..(size - 1) / 2 {
        let key = read_string(cursor, depth)?;
        let value = match read_value(cursor, true, depth)? {
            Decoded::Text(text) => Value::Text(text),
            Decoded::Bytes(bytes) => Value::Bytes(bytes),
            Decoded::Jid(jid) => Value::Jid(jid),
            other => {
                return Err(Error::Malformed(format!(
                    "attribute {key} decoded as {}",
                    other.type_name()
                )))
            }
        };
        attributes.insert(key, value);
    }

    let content = if size % 2 != 0 {
        NodeContent::Empty
    } else {
        match read_value(cursor, false, depth)? {
            Decoded::Null => NodeContent::Empty,
            Decoded::Text(text) => NodeContent::Text(text),
            Decoded::Bytes(bytes) => NodeContent::Bytes(bytes),
            Decoded::Jid(jid) => NodeContent::Jid(jid),
            Decoded::Children(children) => NodeContent::Children(children),
        }
    };

    Ok(Node {
        description,
        attributes,
        content,
    })
}

/// A header tag of `LIST_8` announces an 8-bit size; every other header tag
/// reads a 16-bit size. `LIST_EMPTY` therefore declares size zero and is
/// rejected above.
fn read_size(cursor: &mut Cursor<'_>, tag: u8) -> Result<usize> {
    if tag == LIST_8 {
        Ok(cursor.read_u8()? as usize)
    } else {
        Ok(cursor.read_u16()? as usize)
    }
}

/// Strict string read: any other decoded type is a structural error.
fn read_string(cursor: &mut Cursor<'_>, depth: usize) -> Result<String> {
    match read_value(cursor, true, depth)? {
        Decoded::Text(text) => Ok(text),
        other => Err(Error::UnexpectedType {
            actual: other.type_name(),
        }),
    }
}

/// The generic value reader: one tag byte selects the representation.
fn read_value(cursor: &mut Cursor<'_>, parse_text: bool, depth: usize) -> Result<Decoded> {
    let tag = cursor.read_u8()?;
    match tag {
        LIST_EMPTY => Ok(Decoded::Null),
        COMPANION_JID => read_companion_jid(cursor, depth),
        LIST_8 => {
            let length = cursor.read_u8()? as usize;
            read_list(cursor, length, depth)
        }
        LIST_16 => {
            let length = cursor.read_u16()? as usize;
            read_list(cursor, length, depth)
        }
        JID_PAIR => read_jid_pair(cursor, depth),
        HEX_8 => {
            let prefix = cursor.read_u8()?;
            Ok(Decoded::Text(read_packed(cursor, tokens::HEX, prefix)?))
        }
        BINARY_8 => {
            let length = cursor.read_u8()? as usize;
            read_binary(cursor, length, parse_text)
        }
        BINARY_20 => {
            let length = read_length_20(cursor)?;
            read_binary(cursor, length, parse_text)
        }
        BINARY_32 => {
            let length = cursor.read_u16()? as usize;
            read_binary(cursor, length, parse_text)
        }
        NIBBLE_8 => {
            let prefix = cursor.read_u8()?;
            Ok(Decoded::Text(read_packed(cursor, tokens::NUMBERS, prefix)?))
        }
        _ => read_token(cursor, tag),
    }
}

fn read_list(cursor: &mut Cursor<'_>, length: usize, depth: usize) -> Result<Decoded> {
    let mut children = Vec::with_capacity(length.min(256));
    for _ in 0..length {
        children.push(read_node(cursor, depth + 1)?);
    }
    Ok(Decoded::Children(children))
}

fn read_companion_jid(cursor: &mut Cursor<'_>, depth: usize) -> Result<Decoded> {
    let agent = cursor.read_u8()?;
    let device = cursor.read_u8()?;
    let user = read_string(cursor, depth)?;
    Ok(Decoded::Jid(Jid::companion(user, agent, device)))
}

fn read_jid_pair(cursor: &mut Cursor<'_>, depth: usize) -> Result<Decoded> {
    match read_value(cursor, true, depth)? {
        Decoded::Text(user) => {
            let server = read_string(cursor, depth)?;
            Ok(Decoded::Jid(Jid::new(user, JidServer::parse(&server))))
        }
        Decoded::Null => {
            let server = read_string(cursor, depth)?;
            Ok(Decoded::Jid(Jid::server_only(JidServer::parse(&server))))
        }
        other => Err(Error::Malformed(format!(
            "invalid jid type: {}",
            other.type_name()
        ))),
    }
}

fn read_binary(cursor: &mut Cursor<'_>, length: usize, parse_text: bool) -> Result<Decoded> {
    let bytes = cursor.read_bytes(length)?;
    if parse_text {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::Malformed("binary string is not valid utf-8".into()))?;
        Ok(Decoded::Text(text.to_owned()))
    } else {
        Ok(Decoded::Bytes(bytes.to_vec()))
    }
}

/// 20-bit length: low nibble of the first byte is the high part.
fn read_length_20(cursor: &mut Cursor<'_>) -> Result<usize> {
    let high = (cursor.read_u8()? & 0x0F) as usize;
    let mid = cursor.read_u8()? as usize;
    let low = cursor.read_u8()? as usize;
    Ok((high << 16) + (mid << 8) + low)
}

fn read_token(cursor: &mut Cursor<'_>, tag: u8) -> Result<Decoded> {
    if !(DICTIONARY_0..=DICTIONARY_3).contains(&tag) {
        let token = tokens::single_byte(tag).ok_or(Error::UnknownToken {
            tag,
            index: tag as usize,
        })?;
        return Ok(Decoded::Text(token.to_owned()));
    }

    let index = cursor.read_u8()?;
    let token = tokens::double_byte(tag - DICTIONARY_0, index).ok_or(Error::UnknownToken {
        tag,
        index: index as usize,
    })?;
    Ok(Decoded::Text(token.to_owned()))
}

/// Unpack a nibble- or hex-packed string.
///
/// The prefix byte carries an odd-length flag in its high bit and the byte
/// count in the low seven. Each byte holds two alphabet indices; when the
/// flag is set the final character comes from the high nibble of the last
/// byte and its low nibble is discarded.
fn read_packed(cursor: &mut Cursor<'_>, alphabet: &[u8], prefix: u8) -> Result<String> {
    let odd = prefix >> 7 == 1;
    let count = (prefix & 0x7F) as usize;
    if odd && count == 0 {
        return Err(Error::Malformed("packed string with negative length".into()));
    }

    let mut unpacked = String::with_capacity(2 * count);
    let pairs = if odd { count - 1 } else { count };
    for _ in 0..pairs {
        let byte = cursor.read_u8()?;
        unpacked.push(packed_digit(alphabet, byte >> 4)?);
        unpacked.push(packed_digit(alphabet, byte & 0x0F)?);
    }
    if odd {
        let byte = cursor.read_u8()?;
        unpacked.push(packed_digit(alphabet, byte >> 4)?);
    }
    Ok(unpacked)
}

fn packed_digit(alphabet: &[u8], nibble: u8) -> Result<char> {
    alphabet
        .get(nibble as usize)
        .map(|&byte| byte as char)
        .ok_or_else(|| Error::Malformed(format!("packed digit {nibble} outside alphabet")))
}
