//! Ledger Gateway
//!
//! Wraps the ledger capability behind the typed surface the orchestrator
//! uses. Writes stage a transaction and hand back a pending handle; nothing
//! is durable until the handle's `confirm()` resolves, and the orchestrator
//! never mutates local state on an unconfirmed write.
//!
//! Reads are safe to retry freely. A batch load tolerates individual record
//! fetch failures (skip and log); only a failure of the id listing itself
//! aborts the load.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::record::{Address, OrderKind, OrderRecord};
use darkpool_fhe::CipherPayload;

/// Ledger capability errors
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("ledger unavailable")]
    Unavailable,

    #[error("unknown record: {0}")]
    UnknownRecord(String),

    #[error("unknown transaction: {0}")]
    UnknownTx(String),

    #[error("record already verified: {0}")]
    AlreadyVerified(String),

    #[error("transaction rejected by signer")]
    Rejected,

    #[error("ledger call failed: {0}")]
    Failed(String),
}

/// Parameters of a record creation.
///
/// Only the cipher payload is confidential; name, token id, kind and
/// description go to the ledger in plaintext.
#[derive(Debug, Clone)]
pub struct CreateRecord {
    pub id: String,
    pub name: String,
    pub payload: CipherPayload,
    pub proof: Vec<u8>,
    pub token_id: u64,
    pub kind: OrderKind,
    pub description: String,
    pub creator: Address,
}

/// Handle to a submitted, not-yet-confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_id: String,
}

/// The read/write surface the ledger must provide.
///
/// Write calls return a receipt; the corresponding record must not be
/// assumed to exist (or be updated) until `confirm` has resolved for it.
#[async_trait]
pub trait LedgerCapability: Send + Sync {
    /// Liveness probe; `false` covers "contract not deployed"
    async fn is_available(&self) -> bool;

    /// Record ids, set-stable but in no guaranteed order
    async fn list_record_ids(&self) -> Result<Vec<String>, LedgerError>;

    async fn get_record(&self, id: &str) -> Result<OrderRecord, LedgerError>;

    /// The stored cipher payload; only meaningful while unverified
    async fn encrypted_payload(&self, id: &str) -> Result<CipherPayload, LedgerError>;

    async fn create_record(&self, req: CreateRecord) -> Result<TxReceipt, LedgerError>;

    async fn submit_reveal_proof(
        &self,
        id: &str,
        encoded_clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<TxReceipt, LedgerError>;

    /// Resolves when the staged transaction is durable
    async fn confirm(&self, receipt: &TxReceipt) -> Result<(), LedgerError>;
}

#[async_trait]
impl<L: LedgerCapability + ?Sized> LedgerCapability for std::sync::Arc<L> {
    async fn is_available(&self) -> bool {
        (**self).is_available().await
    }

    async fn list_record_ids(&self) -> Result<Vec<String>, LedgerError> {
        (**self).list_record_ids().await
    }

    async fn get_record(&self, id: &str) -> Result<OrderRecord, LedgerError> {
        (**self).get_record(id).await
    }

    async fn encrypted_payload(&self, id: &str) -> Result<CipherPayload, LedgerError> {
        (**self).encrypted_payload(id).await
    }

    async fn create_record(&self, req: CreateRecord) -> Result<TxReceipt, LedgerError> {
        (**self).create_record(req).await
    }

    async fn submit_reveal_proof(
        &self,
        id: &str,
        encoded_clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<TxReceipt, LedgerError> {
        (**self)
            .submit_reveal_proof(id, encoded_clear_values, proof)
            .await
    }

    async fn confirm(&self, receipt: &TxReceipt) -> Result<(), LedgerError> {
        (**self).confirm(receipt).await
    }
}

/// A staged write awaiting confirmation
pub struct PendingTx<'a, L: LedgerCapability + ?Sized> {
    ledger: &'a L,
    pub receipt: TxReceipt,
}

impl<'a, L: LedgerCapability + ?Sized> PendingTx<'a, L> {
    pub async fn confirm(self) -> Result<(), LedgerError> {
        self.ledger.confirm(&self.receipt).await
    }
}

/// Typed wrapper over a `LedgerCapability`
pub struct LedgerGateway<L> {
    ledger: L,
}

impl<L: LedgerCapability> LedgerGateway<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub async fn is_available(&self) -> bool {
        self.ledger.is_available().await
    }

    /// Fetch the full record set.
    ///
    /// A record whose fetch fails is skipped, not fatal; an unavailable
    /// ledger degrades to an empty set. Only a listing failure propagates.
    pub async fn load_all(&self) -> Result<Vec<OrderRecord>, LedgerError> {
        if !self.ledger.is_available().await {
            warn!("ledger unavailable, loading no records");
            return Ok(Vec::new());
        }

        let ids = self.ledger.list_record_ids().await?;
        let mut records = Vec::with_capacity(ids.len());

        for id in ids {
            match self.ledger.get_record(&id).await {
                Ok(record) => records.push(record),
                Err(e) => warn!("skipping record {id}: {e}"),
            }
        }

        Ok(records)
    }

    pub async fn fetch_record(&self, id: &str) -> Result<OrderRecord, LedgerError> {
        self.ledger.get_record(id).await
    }

    pub async fn fetch_payload(&self, id: &str) -> Result<CipherPayload, LedgerError> {
        self.ledger.encrypted_payload(id).await
    }

    pub async fn create_record(
        &self,
        req: CreateRecord,
    ) -> Result<PendingTx<'_, L>, LedgerError> {
        let receipt = self.ledger.create_record(req).await?;
        Ok(PendingTx {
            ledger: &self.ledger,
            receipt,
        })
    }

    pub async fn submit_reveal_proof(
        &self,
        id: &str,
        encoded_clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<PendingTx<'_, L>, LedgerError> {
        let receipt = self
            .ledger
            .submit_reveal_proof(id, encoded_clear_values, proof)
            .await?;
        Ok(PendingTx {
            ledger: &self.ledger,
            receipt,
        })
    }
}
