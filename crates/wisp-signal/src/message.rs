//! Ciphertext message envelopes.
//!
//! Wire layouts (integers big-endian, matching the node codec's network
//! order):
//!
//! ```text
//! SignalMessage:
//! +---------+--------------+------------+---------------+--------+------------+--------+
//! | VER (1B)| EPHEMERAL 33B| COUNTER 4B | PREV CTR (4B) | LEN 4B | CIPHERTEXT | MAC 8B |
//! +---------+--------------+------------+---------------+--------+------------+--------+
//!
//! PreKeyMessage:
//! +---------+----------+---------+------------+----------+----------+-------------+--------+---------+
//! | VER (1B)| REG ID 4B| FLAG 1B | [PK ID 4B] | SPK ID 4B| BASE 33B | IDENTITY 33B| LEN 4B | MESSAGE |
//! +---------+----------+---------+------------+----------+----------+-------------+--------+---------+
//! ```
//!
//! The version byte packs the message version into its high nibble over the
//! wire constant in the low nibble. The MAC trails the SignalMessage and is
//! computed over everything before it, prefixed by both identity keys.

use wisp_crypto::{CURRENT_VERSION, ENCODED_KEY_LENGTH, MAC_LENGTH};

use crate::error::{Error, Result};

/// Fixed SignalMessage overhead: version, ephemeral, two counters, length.
const SIGNAL_HEADER_LENGTH: usize = 1 + ENCODED_KEY_LENGTH + 4 + 4 + 4;

fn check_len(data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        return Err(Error::Malformed(format!(
            "envelope truncated: need {needed} bytes, have {}",
            data.len()
        )));
    }
    Ok(())
}

fn read_u32(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}

/// Pack a message version over the wire constant.
pub fn pack_version(version: u8) -> u8 {
    (version << 4) | CURRENT_VERSION
}

/// Extract the message version from a packed byte.
pub fn unpack_version(byte: u8) -> u8 {
    byte >> 4
}

fn parse_version(byte: u8) -> Result<u8> {
    let version = unpack_version(byte);
    if version != CURRENT_VERSION {
        return Err(Error::Malformed(format!(
            "unsupported message version {version}"
        )));
    }
    Ok(version)
}

/// A ratchet message: one encrypted payload plus the chain coordinates
/// needed to derive its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMessage {
    /// Message version.
    pub version: u8,
    /// Sender's encoded ratchet public key.
    pub ephemeral: [u8; ENCODED_KEY_LENGTH],
    /// Position in the sending chain.
    pub counter: u32,
    /// Counter of the sender's previous chain.
    pub previous_counter: u32,
    /// AES-CBC ciphertext.
    pub ciphertext: Vec<u8>,
    /// Truncated HMAC over both identities and the serialized message.
    pub mac: [u8; MAC_LENGTH],
}

impl SignalMessage {
    /// Assemble a message before its MAC is computed.
    pub fn new(
        ephemeral: [u8; ENCODED_KEY_LENGTH],
        counter: u32,
        previous_counter: u32,
        ciphertext: Vec<u8>,
    ) -> Self {
        Self {
            version: CURRENT_VERSION,
            ephemeral,
            counter,
            previous_counter,
            ciphertext,
            mac: [0u8; MAC_LENGTH],
        }
    }

    /// Serialize everything the MAC covers.
    pub fn serialized_without_mac(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIGNAL_HEADER_LENGTH + self.ciphertext.len());
        out.push(pack_version(self.version));
        out.extend_from_slice(&self.ephemeral);
        out.extend_from_slice(&self.counter.to_be_bytes());
        out.extend_from_slice(&self.previous_counter.to_be_bytes());
        out.extend_from_slice(&(self.ciphertext.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Full wire form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.serialized_without_mac();
        out.extend_from_slice(&self.mac);
        out
    }

    /// Parse a wire message.
    pub fn parse(data: &[u8]) -> Result<Self> {
        check_len(data, SIGNAL_HEADER_LENGTH + MAC_LENGTH)?;
        let version = parse_version(data[0])?;

        let mut offset = 1;
        let mut ephemeral = [0u8; ENCODED_KEY_LENGTH];
        ephemeral.copy_from_slice(&data[offset..offset + ENCODED_KEY_LENGTH]);
        offset += ENCODED_KEY_LENGTH;

        let counter = read_u32(&data[offset..]);
        offset += 4;
        let previous_counter = read_u32(&data[offset..]);
        offset += 4;
        let length = read_u32(&data[offset..]) as usize;
        offset += 4;

        check_len(data, offset + length + MAC_LENGTH)?;
        let ciphertext = data[offset..offset + length].to_vec();
        offset += length;

        if data.len() != offset + MAC_LENGTH {
            return Err(Error::Malformed("trailing bytes after mac".into()));
        }
        let mut mac = [0u8; MAC_LENGTH];
        mac.copy_from_slice(&data[offset..offset + MAC_LENGTH]);

        Ok(Self {
            version,
            ephemeral,
            counter,
            previous_counter,
            ciphertext,
            mac,
        })
    }
}

/// The first message of a new session: a [`SignalMessage`] wrapped with the
/// key material the recipient needs to derive the matching state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreKeyMessage {
    /// Message version.
    pub version: u8,
    /// Sender's registration identifier; zero is invalid.
    pub registration_id: u32,
    /// One-time pre-key id consumed from the recipient's bundle, if any.
    pub pre_key_id: Option<u32>,
    /// Signed pre-key id the session was built against.
    pub signed_pre_key_id: u32,
    /// Sender's encoded base key.
    pub base_key: [u8; ENCODED_KEY_LENGTH],
    /// Sender's encoded identity key.
    pub identity_key: [u8; ENCODED_KEY_LENGTH],
    /// The embedded ratchet message.
    pub message: SignalMessage,
}

impl PreKeyMessage {
    /// Full wire form.
    pub fn serialize(&self) -> Vec<u8> {
        let message = self.message.serialize();
        let mut out = Vec::with_capacity(
            1 + 4 + 1 + 4 + 4 + 2 * ENCODED_KEY_LENGTH + 4 + message.len(),
        );
        out.push(pack_version(self.version));
        out.extend_from_slice(&self.registration_id.to_be_bytes());
        match self.pre_key_id {
            Some(id) => {
                out.push(1);
                out.extend_from_slice(&id.to_be_bytes());
            }
            None => out.push(0),
        }
        out.extend_from_slice(&self.signed_pre_key_id.to_be_bytes());
        out.extend_from_slice(&self.base_key);
        out.extend_from_slice(&self.identity_key);
        out.extend_from_slice(&(message.len() as u32).to_be_bytes());
        out.extend_from_slice(&message);
        out
    }

    /// Parse a wire pre-key message.
    pub fn parse(data: &[u8]) -> Result<Self> {
        check_len(data, 1 + 4 + 1)?;
        let version = parse_version(data[0])?;

        let mut offset = 1;
        let registration_id = read_u32(&data[offset..]);
        offset += 4;

        let pre_key_id = match data[offset] {
            0 => {
                offset += 1;
                None
            }
            1 => {
                check_len(data, offset + 5)?;
                let id = read_u32(&data[offset + 1..]);
                offset += 5;
                Some(id)
            }
            other => {
                return Err(Error::Malformed(format!(
                    "invalid pre-key flag {other:#04x}"
                )))
            }
        };

        check_len(data, offset + 4 + 2 * ENCODED_KEY_LENGTH + 4)?;
        let signed_pre_key_id = read_u32(&data[offset..]);
        offset += 4;

        let mut base_key = [0u8; ENCODED_KEY_LENGTH];
        base_key.copy_from_slice(&data[offset..offset + ENCODED_KEY_LENGTH]);
        offset += ENCODED_KEY_LENGTH;

        let mut identity_key = [0u8; ENCODED_KEY_LENGTH];
        identity_key.copy_from_slice(&data[offset..offset + ENCODED_KEY_LENGTH]);
        offset += ENCODED_KEY_LENGTH;

        let length = read_u32(&data[offset..]) as usize;
        offset += 4;
        check_len(data, offset + length)?;
        let message = SignalMessage::parse(&data[offset..offset + length])?;

        Ok(Self {
            version,
            registration_id,
            pre_key_id,
            signed_pre_key_id,
            base_key,
            identity_key,
            message,
        })
    }
}
