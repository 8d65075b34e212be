//! Cipher Payload Envelope
//!
//! Wire format for an encrypted order value:
//!
//! ```text
//! [ ephemeral_pk (32B) | nonce (12B) | ct_len (2B LE) | ciphertext ]
//! ```
//!
//! The payload is opaque to the ledger; its BLAKE3 hash serves as the
//! handle clients use to refer to it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An encrypted order value as stored by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherPayload {
    /// Ephemeral public key for ECDH
    pub ephemeral_pk: [u8; 32],
    /// Nonce for ChaCha20-Poly1305
    pub nonce: [u8; 12],
    /// Encrypted value with authentication tag
    pub ciphertext: Vec<u8>,
}

impl CipherPayload {
    /// Fixed overhead of the encoding (epk + nonce + length prefix)
    pub const OVERHEAD: usize = 32 + 12 + 2;

    /// Serialize to the wire encoding
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::OVERHEAD + self.ciphertext.len());
        bytes.extend_from_slice(&self.ephemeral_pk);
        bytes.extend_from_slice(&self.nonce);
        let ct_len = self.ciphertext.len() as u16;
        bytes.extend_from_slice(&ct_len.to_le_bytes());
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Parse the wire encoding
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::OVERHEAD {
            return None;
        }

        let ephemeral_pk: [u8; 32] = bytes[0..32].try_into().ok()?;
        let nonce: [u8; 12] = bytes[32..44].try_into().ok()?;
        let ct_len = u16::from_le_bytes(bytes[44..46].try_into().ok()?) as usize;

        if bytes.len() != Self::OVERHEAD + ct_len {
            return None;
        }

        Some(Self {
            ephemeral_pk,
            nonce,
            ciphertext: bytes[46..46 + ct_len].to_vec(),
        })
    }

    /// Content-derived handle (hash of the encoding)
    pub fn handle(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.ephemeral_pk);
        hasher.update(&self.nonce);
        hasher.update(&self.ciphertext);
        *hasher.finalize().as_bytes()
    }

    /// Handle as a hex string (map key in reveal bundles)
    pub fn handle_hex(&self) -> String {
        hex::encode(self.handle())
    }
}

/// Output of the encrypt step: payload plus correctness proof
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub payload: CipherPayload,
    /// Evidence the payload was honestly formed for its scope and owner
    pub proof: Vec<u8>,
}

/// Output of the reveal preparation step
#[derive(Debug, Clone)]
pub struct RevealBundle {
    /// Clear value per payload handle (hex)
    pub clear_values: HashMap<String, u64>,
    /// Concatenated little-endian clear values, in input order
    pub encoded: Vec<u8>,
    /// Decryption proof covering the encoded values
    pub proof: Vec<u8>,
}

impl RevealBundle {
    /// Look up the clear value for one payload
    pub fn value_for(&self, payload: &CipherPayload) -> Option<u64> {
        self.clear_values.get(&payload.handle_hex()).copied()
    }
}

/// Encode clear values as the ledger expects them (LE u64 concatenation)
pub fn encode_clear_values(values: &[u64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 8);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Parse an encoded clear-value sequence
pub fn decode_clear_values(bytes: &[u8]) -> Option<Vec<u64>> {
    if bytes.len() % 8 != 0 {
        return None;
    }
    bytes
        .chunks_exact(8)
        .map(|c| c.try_into().ok().map(u64::from_le_bytes))
        .collect()
}
