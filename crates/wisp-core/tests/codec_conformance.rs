//! Wire-format conformance tests for the node codec.
//!
//! Verifies exact byte layouts alongside round-trip behavior, so encoder
//! and decoder regressions show up as concrete byte diffs.

use wisp_core::jid::{Jid, JidServer};
use wisp_core::node::{Attributes, Node, NodeContent, Value};
use wisp_core::tokens::{self, BINARY_8, COMPANION_JID, HEX_8, JID_PAIR, LIST_8, NIBBLE_8};
use wisp_core::{decode, encode, encode_compressed, Error};

fn iq_token() -> u8 {
    tokens::find_single_byte("iq").unwrap()
}

#[test]
fn test_iq_node_exact_bytes() {
    let mut attributes = Attributes::new();
    attributes.insert("id", Value::Text("1".into()));
    let node = Node::new("iq", attributes);

    let bytes = encode(&node).unwrap();
    let id = tokens::find_single_byte("id").unwrap();
    let one = tokens::find_single_byte("1").unwrap();
    // control, LIST_8, size 3 (tag + key + value, odd: no body), then
    // three token bytes.
    assert_eq!(bytes, vec![0x00, LIST_8, 3, iq_token(), id, one]);

    assert_eq!(decode(&bytes).unwrap(), node);
}

#[test]
fn test_enc_node_exact_bytes() {
    let mut attributes = Attributes::new();
    attributes.insert("v", Value::Text("2".into()));
    attributes.insert("type", Value::Text("msg".into()));
    let node = Node::with_content("enc", attributes, NodeContent::Bytes(vec![0xDE, 0xAD]));

    let bytes = encode(&node).unwrap();
    let expected = vec![
        0x00,
        LIST_8,
        6, // tag + 2 pairs + body
        tokens::find_single_byte("enc").unwrap(),
        BINARY_8,
        1,
        b'v',
        tokens::find_single_byte("2").unwrap(),
        tokens::find_single_byte("type").unwrap(),
        tokens::find_single_byte("msg").unwrap(),
        BINARY_8,
        2,
        0xDE,
        0xAD,
    ];
    assert_eq!(bytes, expected);
    assert_eq!(decode(&bytes).unwrap(), node);
}

#[test]
fn test_hex_packed_value_exact_bytes() {
    // Three hex digits: odd flag set, two packed bytes, low nibble of the
    // trailing byte discarded on decode.
    let mut attributes = Attributes::new();
    attributes.insert("key", Value::Text("9AF".into()));
    let node = Node::new("iq", attributes);

    let bytes = encode(&node).unwrap();
    let tail = &bytes[bytes.len() - 4..];
    assert_eq!(tail, [HEX_8, 0x82, 0x9A, 0xF0]);
    assert_eq!(decode(&bytes).unwrap(), node);
}

#[test]
fn test_nibble_packed_timestamp() {
    let mut attributes = Attributes::new();
    attributes.insert("t", Value::Text("1712345678".into()));
    let node = Node::new("receipt", attributes);
    let bytes = encode(&node).unwrap();
    assert!(bytes.contains(&NIBBLE_8));
    assert_eq!(decode(&bytes).unwrap(), node);
}

#[test]
fn test_jid_pair_and_companion_jid() {
    let mut attributes = Attributes::new();
    attributes.insert("from", Value::Jid(Jid::new("15550001111", JidServer::User)));
    attributes.insert("participant", Value::Jid(Jid::companion("15550002222", 0, 9)));
    let node = Node::new("message", attributes);

    let bytes = encode(&node).unwrap();
    assert!(bytes.contains(&JID_PAIR));
    assert!(bytes.contains(&COMPANION_JID));
    assert_eq!(decode(&bytes).unwrap(), node);
}

#[test]
fn test_nested_tree_round_trip() {
    let leaf = Node::with_content("enc", Attributes::new(), NodeContent::Bytes(vec![1; 64]));
    let mut receipt_attributes = Attributes::new();
    receipt_attributes.insert("id", Value::Text("7B2C".into()));
    let tree = Node::with_content(
        "message",
        Attributes::new(),
        NodeContent::Children(vec![
            Node::with_content(
                "participants",
                Attributes::new(),
                NodeContent::Children(vec![leaf]),
            ),
            Node::new("receipt", receipt_attributes),
        ]),
    );

    let bytes = encode(&tree).unwrap();
    assert_eq!(decode(&bytes).unwrap(), tree);

    let compressed = encode_compressed(&tree).unwrap();
    assert_eq!(compressed[0] & 2, 2);
    assert_eq!(decode(&compressed).unwrap(), tree);
}

#[test]
fn test_compressed_stream_shrinks_repetitive_payload() {
    let node = Node::with_content(
        "enc",
        Attributes::new(),
        NodeContent::Bytes(vec![0x55; 2048]),
    );
    let raw = encode(&node).unwrap();
    let compressed = encode_compressed(&node).unwrap();
    assert!(compressed.len() < raw.len());
    assert_eq!(decode(&compressed).unwrap(), node);
}

#[test]
fn test_corrupt_compressed_stream_is_malformed() {
    let node = Node::new("iq", Attributes::new());
    let mut compressed = encode_compressed(&node).unwrap();
    let last = compressed.len() - 1;
    compressed[last] ^= 0xFF;
    compressed.truncate(2);
    assert!(matches!(decode(&compressed), Err(Error::Malformed(_))));
}

#[test]
fn test_empty_input_is_truncated() {
    assert!(matches!(decode(&[]), Err(Error::Truncated { .. })));
}

#[test]
fn test_declared_size_zero_is_malformed() {
    assert!(matches!(
        decode(&[0x00, LIST_8, 0]),
        Err(Error::Malformed(_))
    ));
}

#[test]
fn test_large_list_uses_sixteen_bit_count() {
    let children: Vec<Node> = (0..300)
        .map(|_| Node::new("item", Attributes::new()))
        .collect();
    let node = Node::with_content("list", Attributes::new(), NodeContent::Children(children));
    let bytes = encode(&node).unwrap();
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded.children().len(), 300);
    assert_eq!(decoded, node);
}
