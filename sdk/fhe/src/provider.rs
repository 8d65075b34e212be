//! FHE Capability and Local Provider
//!
//! `FheCapability` is the seam the orchestrator programs against. The real
//! system would back it with a remote coprocessor; `LocalFheProvider`
//! implements the same contract locally so the full order lifecycle can run
//! without external services.
//!
//! ```text
//! initialize:      client ephemeral ×  coprocessor static ──ECDH──▶ HKDF
//! encrypt_value:   per-input ephemeral ECDH envelope (epk, nonce, ct)
//! prepare_reveal:  coprocessor static × payload epk ──ECDH──▶ open ct
//! ```

use async_trait::async_trait;
use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit, rand_core::OsRng},
};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::OnceCell;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::payload::{CipherPayload, EncryptedInput, RevealBundle, encode_clear_values};

/// Largest plaintext the encrypted integer type can carry (32-bit scheme)
pub const PLAINTEXT_MAX: u64 = u32::MAX as u64;

/// FHE capability errors
#[derive(Debug, Error)]
pub enum FheError {
    #[error("fhe session not initialized")]
    Uninitialized,

    #[error("initialization handshake failed: {0}")]
    InitFailed(String),

    #[error("plaintext {value} exceeds scheme width (max {max})")]
    OutOfRange { value: u64, max: u64 },

    #[error("malformed cipher payload")]
    MalformedPayload,

    #[error("sealing plaintext failed")]
    SealFailed,

    #[error("opening ciphertext failed")]
    OpenFailed,
}

/// The capability surface the orchestrator requires from an FHE backend.
///
/// `initialize` must complete once per session before any other call; it is
/// idempotent and safe to invoke concurrently. The reveal path is
/// prepare-only: submitting the resulting proof on-ledger belongs to the
/// caller.
#[async_trait]
pub trait FheCapability: Send + Sync {
    /// Whether the one-time session handshake has completed
    fn is_initialized(&self) -> bool;

    /// One-time session handshake with the coprocessor
    async fn initialize(&self) -> Result<(), FheError>;

    /// Seal a plaintext value scoped to a contract and owner
    async fn encrypt_value(
        &self,
        scope: &str,
        owner: &str,
        plaintext: u64,
    ) -> Result<EncryptedInput, FheError>;

    /// Open a set of payloads and produce the clear values + decryption proof
    async fn prepare_reveal(
        &self,
        scope: &str,
        payloads: &[CipherPayload],
    ) -> Result<RevealBundle, FheError>;
}

/// Session material derived by the initialization handshake
struct SessionSecrets {
    client_pk: [u8; 32],
    proof_key: [u8; 32],
}

impl SessionSecrets {
    /// salt = H(client_pk || coprocessor_pk), then HKDF expand
    fn derive(shared_secret: [u8; 32], client_pk: [u8; 32], coprocessor_pk: &[u8; 32]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(client_pk);
        hasher.update(coprocessor_pk);
        let salt = hasher.finalize();

        let hk = Hkdf::<Sha256>::new(Some(&salt), &shared_secret);
        let mut proof_key = [0u8; 32];
        hk.expand(b"darkpool-v1-session", &mut proof_key)
            .expect("HKDF expansion failed");

        Self {
            client_pk,
            proof_key,
        }
    }
}

/// Local stand-in for the FHE coprocessor.
///
/// Holds the coprocessor's static key itself, so it can both seal payloads
/// (client side) and open them again during reveal (coprocessor side). The
/// key is derived from a fixed seed: independently constructed providers can
/// open each other's payloads, the way a shared network coprocessor would.
pub struct LocalFheProvider {
    coprocessor_sk: StaticSecret,
    coprocessor_pk: PublicKey,
    session: OnceCell<SessionSecrets>,
}

impl LocalFheProvider {
    pub fn new() -> Self {
        let seed = blake3::derive_key("darkpool-local-coprocessor-v1", b"darkpool");
        let coprocessor_sk = StaticSecret::from(seed);
        let coprocessor_pk = PublicKey::from(&coprocessor_sk);

        Self {
            coprocessor_sk,
            coprocessor_pk,
            session: OnceCell::new(),
        }
    }

    /// Per-payload AEAD key from an ECDH shared secret
    fn input_key(shared_secret: &[u8], ephemeral_pk: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_derive_key("darkpool-input-v1");
        hasher.update(shared_secret);
        hasher.update(ephemeral_pk);
        *hasher.finalize().as_bytes()
    }

    fn session(&self) -> Result<&SessionSecrets, FheError> {
        self.session.get().ok_or(FheError::Uninitialized)
    }
}

impl Default for LocalFheProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FheCapability for LocalFheProvider {
    fn is_initialized(&self) -> bool {
        self.session.initialized()
    }

    async fn initialize(&self) -> Result<(), FheError> {
        // OnceCell runs a single initializer; concurrent callers wait on it
        // and later calls are no-ops.
        self.session
            .get_or_try_init(|| async {
                let client_sk = EphemeralSecret::random_from_rng(OsRng);
                let client_pk = PublicKey::from(&client_sk);
                let shared = client_sk.diffie_hellman(&self.coprocessor_pk);

                Ok::<_, FheError>(SessionSecrets::derive(
                    shared.to_bytes(),
                    *client_pk.as_bytes(),
                    self.coprocessor_pk.as_bytes(),
                ))
            })
            .await?;
        Ok(())
    }

    async fn encrypt_value(
        &self,
        scope: &str,
        owner: &str,
        plaintext: u64,
    ) -> Result<EncryptedInput, FheError> {
        let session = self.session()?;

        if plaintext > PLAINTEXT_MAX {
            return Err(FheError::OutOfRange {
                value: plaintext,
                max: PLAINTEXT_MAX,
            });
        }

        let ephemeral_sk = EphemeralSecret::random_from_rng(OsRng);
        let ephemeral_pk = PublicKey::from(&ephemeral_sk);
        let shared = ephemeral_sk.diffie_hellman(&self.coprocessor_pk);
        let key = Self::input_key(shared.as_bytes(), ephemeral_pk.as_bytes());

        let mut nonce_bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher =
            ChaCha20Poly1305::new_from_slice(&key).map_err(|_| FheError::SealFailed)?;
        let ciphertext = cipher
            .encrypt(nonce, plaintext.to_le_bytes().as_slice())
            .map_err(|_| FheError::SealFailed)?;

        let payload = CipherPayload {
            ephemeral_pk: *ephemeral_pk.as_bytes(),
            nonce: nonce_bytes,
            ciphertext,
        };

        // Proof binds the payload to its scope and owner under session key
        let mut msg = Vec::with_capacity(32 + owner.len() + scope.len() + 32);
        msg.extend_from_slice(&payload.handle());
        msg.extend_from_slice(owner.as_bytes());
        msg.extend_from_slice(scope.as_bytes());
        msg.extend_from_slice(&session.client_pk);
        let proof = blake3::keyed_hash(&session.proof_key, &msg)
            .as_bytes()
            .to_vec();

        Ok(EncryptedInput { payload, proof })
    }

    async fn prepare_reveal(
        &self,
        scope: &str,
        payloads: &[CipherPayload],
    ) -> Result<RevealBundle, FheError> {
        self.session()?;

        let mut clear_values = std::collections::HashMap::with_capacity(payloads.len());
        let mut values = Vec::with_capacity(payloads.len());

        for payload in payloads {
            let ephemeral_pk = PublicKey::from(payload.ephemeral_pk);
            let shared = self.coprocessor_sk.diffie_hellman(&ephemeral_pk);
            let key = Self::input_key(shared.as_bytes(), &payload.ephemeral_pk);

            let cipher =
                ChaCha20Poly1305::new_from_slice(&key).map_err(|_| FheError::OpenFailed)?;
            let nonce = Nonce::from_slice(&payload.nonce);
            let plaintext = cipher
                .decrypt(nonce, payload.ciphertext.as_slice())
                .map_err(|_| FheError::OpenFailed)?;

            let bytes: [u8; 8] = plaintext
                .as_slice()
                .try_into()
                .map_err(|_| FheError::MalformedPayload)?;
            let value = u64::from_le_bytes(bytes);

            clear_values.insert(payload.handle_hex(), value);
            values.push(value);
        }

        let encoded = encode_clear_values(&values);

        let mut hasher = blake3::Hasher::new_derive_key("darkpool-decrypt-proof-v1");
        hasher.update(scope.as_bytes());
        hasher.update(&encoded);
        let proof = hasher.finalize().as_bytes().to_vec();

        Ok(RevealBundle {
            clear_values,
            encoded,
            proof,
        })
    }
}
