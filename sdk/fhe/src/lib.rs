//! FHE Capability Boundary
//!
//! Client-side encryption of confidential order values, and the cryptographic
//! half of the reveal protocol.
//!
//! ```text
//! Flow:
//! 1. initialize(): handshake with the coprocessor (ECDH + HKDF)
//! 2. encrypt_value(): seal the plaintext into a cipher payload + proof
//! 3. payload travels to the ledger alongside the public order fields
//! 4. prepare_reveal(): open payloads fetched back from the ledger and
//!    produce the clear values + decryption proof the ledger expects
//! ```
//!
//! The reveal path is a two-phase protocol: this crate only performs the
//! cryptographic step; submitting the resulting proof on-ledger is owned by
//! the orchestrator.

pub mod payload;
pub mod provider;

pub use payload::{
    CipherPayload, EncryptedInput, RevealBundle, decode_clear_values, encode_clear_values,
};
pub use provider::{FheCapability, FheError, LocalFheProvider, PLAINTEXT_MAX};
