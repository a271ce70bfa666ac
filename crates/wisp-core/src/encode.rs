//! Node tree encoder.
//!
//! Inverts every decoder branch: the writer picks exactly the tag and width
//! class the reader dispatches on, so `decode(encode(node))` reproduces the
//! node. Strings prefer the densest representation available: dictionary
//! token, then nibble/hex packing, then raw bytes.

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{Error, Result};
use crate::jid::Jid;
use crate::node::{Node, NodeContent, Value};
use crate::tokens::{
    self, BINARY_20, BINARY_8, COMPANION_JID, DICTIONARY_0, HEX_8, JID_PAIR, LIST_16, LIST_8,
    LIST_EMPTY, NIBBLE_8, PACKED_MAX,
};

/// Largest length representable by the 20-bit binary width.
const BINARY_20_MAX: usize = (1 << 20) - 1;

/// Encode a node tree into an uncompressed frame body.
pub fn encode(node: &Node) -> Result<Vec<u8>> {
    let mut frame = vec![0u8];
    write_node(&mut frame, node)?;
    Ok(frame)
}

/// Encode a node tree with a DEFLATE-compressed body.
pub fn encode_compressed(node: &Node) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    write_node(&mut body, node)?;

    let mut frame = vec![2u8];
    let mut deflater = DeflateEncoder::new(&mut frame, Compression::default());
    deflater
        .write_all(&body)
        .map_err(|source| Error::Unencodable(format!("deflate failed: {source}")))?;
    deflater
        .finish()
        .map_err(|source| Error::Unencodable(format!("deflate failed: {source}")))?;
    Ok(frame)
}

fn write_node(out: &mut Vec<u8>, node: &Node) -> Result<()> {
    let size = node.declared_size();
    write_size(out, size)?;
    write_string(out, &node.description)?;
    for (key, value) in node.attributes.iter() {
        write_string(out, key)?;
        write_value(out, value)?;
    }
    match &node.content {
        NodeContent::Empty => {}
        NodeContent::Text(text) => write_text_content(out, text)?,
        NodeContent::Bytes(bytes) => write_bytes(out, bytes)?,
        NodeContent::Jid(jid) => write_jid(out, jid)?,
        NodeContent::Children(children) => write_children(out, children)?,
    }
    Ok(())
}

fn write_size(out: &mut Vec<u8>, size: usize) -> Result<()> {
    if size <= u8::MAX as usize {
        out.push(LIST_8);
        out.push(size as u8);
    } else if size <= u16::MAX as usize {
        out.push(LIST_16);
        out.extend_from_slice(&(size as u16).to_be_bytes());
    } else {
        return Err(Error::Unencodable(format!("node size {size} too large")));
    }
    Ok(())
}

fn write_children(out: &mut Vec<u8>, children: &[Node]) -> Result<()> {
    if children.len() <= u8::MAX as usize {
        out.push(LIST_8);
        out.push(children.len() as u8);
    } else if children.len() <= u16::MAX as usize {
        out.push(LIST_16);
        out.extend_from_slice(&(children.len() as u16).to_be_bytes());
    } else {
        return Err(Error::Unencodable(format!(
            "list of {} children too large",
            children.len()
        )));
    }
    for child in children {
        write_node(out, child)?;
    }
    Ok(())
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Text(text) => write_string(out, text),
        Value::Bytes(bytes) => write_bytes(out, bytes),
        Value::Jid(jid) => write_jid(out, jid),
    }
}

fn write_string(out: &mut Vec<u8>, value: &str) -> Result<()> {
    if let Some(token) = tokens::find_single_byte(value) {
        out.push(token);
        return Ok(());
    }
    if let Some((page, index)) = tokens::find_double_byte(value) {
        out.push(DICTIONARY_0 + page);
        out.push(index);
        return Ok(());
    }
    if let Some(packed) = pack(value, tokens::NUMBERS) {
        out.push(NIBBLE_8);
        out.extend_from_slice(&packed);
        return Ok(());
    }
    if let Some(packed) = pack(value, tokens::HEX) {
        out.push(HEX_8);
        out.extend_from_slice(&packed);
        return Ok(());
    }
    write_bytes(out, value.as_bytes())
}

/// Text in content position must stay a string through the byte-oriented
/// body read, which only token and packed representations do.
fn write_text_content(out: &mut Vec<u8>, text: &str) -> Result<()> {
    if tokens::find_single_byte(text).is_some()
        || tokens::find_double_byte(text).is_some()
        || packable(text, tokens::NUMBERS)
        || packable(text, tokens::HEX)
    {
        return write_string(out, text);
    }
    Err(Error::Unencodable(
        "text content is not token- or digit-compressible; encode it as bytes".into(),
    ))
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    if bytes.len() <= u8::MAX as usize {
        out.push(BINARY_8);
        out.push(bytes.len() as u8);
    } else if bytes.len() <= BINARY_20_MAX {
        out.push(BINARY_20);
        out.push((bytes.len() >> 16) as u8);
        out.push((bytes.len() >> 8) as u8);
        out.push(bytes.len() as u8);
    } else {
        // The 16-bit width caps below the 20-bit one, so nothing larger is
        // representable.
        return Err(Error::Unencodable(format!(
            "binary value of {} bytes too large",
            bytes.len()
        )));
    }
    out.extend_from_slice(bytes);
    Ok(())
}

fn write_jid(out: &mut Vec<u8>, jid: &Jid) -> Result<()> {
    if jid.is_companion() {
        out.push(COMPANION_JID);
        out.push(jid.agent.unwrap_or(0));
        out.push(jid.device.unwrap_or(0));
        return write_string(out, jid.user.as_deref().unwrap_or(""));
    }

    out.push(JID_PAIR);
    match &jid.user {
        Some(user) => write_string(out, user)?,
        None => out.push(LIST_EMPTY),
    }
    write_string(out, jid.server.as_str())
}

fn packable(value: &str, alphabet: &[u8]) -> bool {
    !value.is_empty()
        && value.len() <= PACKED_MAX
        && value.bytes().all(|byte| alphabet.contains(&byte))
}

/// Pack a digit string two characters per byte, prefix byte first.
///
/// Odd lengths set the prefix's high bit and pad the final byte's low
/// nibble with zero; the decoder discards it.
fn pack(value: &str, alphabet: &[u8]) -> Option<Vec<u8>> {
    if !packable(value, alphabet) {
        return None;
    }

    let digits: Vec<u8> = value
        .bytes()
        .map(|byte| alphabet.iter().position(|&entry| entry == byte).unwrap() as u8)
        .collect();
    let odd = digits.len() % 2 != 0;
    let count = digits.len().div_ceil(2);

    let mut packed = Vec::with_capacity(1 + count);
    packed.push((u8::from(odd) << 7) | count as u8);
    for pair in digits.chunks(2) {
        let low = pair.get(1).copied().unwrap_or(0);
        packed.push((pair[0] << 4) | low);
    }
    Some(packed)
}
