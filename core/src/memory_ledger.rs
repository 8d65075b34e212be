//! In-Memory Ledger
//!
//! Ledger simulation for development and tests. Writes are staged and only
//! become visible once confirmed, mirroring the submit-then-await shape of a
//! real chain. Simulation controls cover the failure modes the orchestrator
//! must tolerate: a signer rejecting a write, individual record reads
//! failing, stale reads racing a concurrent reveal, and confirmations held
//! open to observe in-flight protocols.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Notify;

use crate::gateway::{CreateRecord, LedgerCapability, LedgerError, TxReceipt};
use crate::record::OrderRecord;
use darkpool_fhe::{CipherPayload, decode_clear_values};

struct StoredRecord {
    record: OrderRecord,
    payload: CipherPayload,
    #[allow(dead_code)] // Kept as the on-ledger audit trail of the input
    input_proof: Vec<u8>,
}

enum StagedWrite {
    Create(Box<CreateRecord>),
    Reveal { id: String, encoded: Vec<u8> },
}

pub struct MemoryLedger {
    records: DashMap<String, StoredRecord>,
    staged: DashMap<String, StagedWrite>,
    next_tx: AtomicU64,
    writes: AtomicU64,
    confirm_latency: Duration,
    available: AtomicBool,
    // simulation controls
    reject_next: AtomicBool,
    fail_listing: AtomicBool,
    failing_reads: DashMap<String, ()>,
    stale_reads: DashMap<String, u32>,
    hold: AtomicBool,
    release: Notify,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(confirm_latency: Duration) -> Self {
        Self {
            records: DashMap::new(),
            staged: DashMap::new(),
            next_tx: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            confirm_latency,
            available: AtomicBool::new(true),
            reject_next: AtomicBool::new(false),
            fail_listing: AtomicBool::new(false),
            failing_reads: DashMap::new(),
            stale_reads: DashMap::new(),
            hold: AtomicBool::new(false),
            release: Notify::new(),
        }
    }

    /// Total write transactions accepted (staged), confirmed or not
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Acquire)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// The next write fails as if the signer declined it
    pub fn reject_next_write(&self) {
        self.reject_next.store(true, Ordering::Release);
    }

    /// Id listings fail while set; reads of known ids still work
    pub fn fail_listings(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::Release);
    }

    /// Reads of this id fail until `heal_reads_of` is called
    pub fn fail_reads_of(&self, id: &str) {
        self.failing_reads.insert(id.to_string(), ());
    }

    pub fn heal_reads_of(&self, id: &str) {
        self.failing_reads.remove(id);
    }

    /// Serve the next `count` reads of this record as if it were still
    /// unverified; simulates a reveal racing a stale snapshot.
    pub fn serve_stale_reads(&self, id: &str, count: u32) {
        self.stale_reads.insert(id.to_string(), count);
    }

    /// Park confirmations until `release_confirmations`
    pub fn hold_confirmations(&self) {
        self.hold.store(true, Ordering::Release);
    }

    pub fn release_confirmations(&self) {
        self.hold.store(false, Ordering::Release);
        self.release.notify_waiters();
    }

    fn next_receipt(&self) -> TxReceipt {
        let n = self.next_tx.fetch_add(1, Ordering::AcqRel);
        TxReceipt {
            tx_id: format!("tx-{n}"),
        }
    }

    fn take_rejection(&self) -> bool {
        self.reject_next.swap(false, Ordering::AcqRel)
    }

    async fn wait_while_held(&self) {
        loop {
            if !self.hold.load(Ordering::Acquire) {
                return;
            }
            let released = self.release.notified();
            if !self.hold.load(Ordering::Acquire) {
                return;
            }
            released.await;
        }
    }

    fn apply(&self, write: StagedWrite) -> Result<(), LedgerError> {
        match write {
            StagedWrite::Create(req) => {
                let record = OrderRecord {
                    id: req.id.clone(),
                    name: req.name,
                    token_id: req.token_id,
                    kind: req.kind,
                    description: req.description,
                    creator: req.creator,
                    created_at: unix_now(),
                    verified: false,
                    revealed_value: 0,
                };
                self.records.insert(
                    req.id,
                    StoredRecord {
                        record,
                        payload: req.payload,
                        input_proof: req.proof,
                    },
                );
                Ok(())
            }
            StagedWrite::Reveal { id, encoded } => {
                let mut entry = self
                    .records
                    .get_mut(&id)
                    .ok_or_else(|| LedgerError::UnknownRecord(id.clone()))?;
                if entry.record.verified {
                    return Err(LedgerError::AlreadyVerified(id));
                }
                let values = decode_clear_values(&encoded)
                    .ok_or_else(|| LedgerError::Failed("malformed clear values".into()))?;
                let value = *values
                    .first()
                    .ok_or_else(|| LedgerError::Failed("empty clear values".into()))?;
                entry.record.verified = true;
                entry.record.revealed_value = value;
                Ok(())
            }
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerCapability for MemoryLedger {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    async fn list_record_ids(&self) -> Result<Vec<String>, LedgerError> {
        if !self.available.load(Ordering::Acquire) {
            return Err(LedgerError::Unavailable);
        }
        if self.fail_listing.load(Ordering::Acquire) {
            return Err(LedgerError::Failed("record listing failed".into()));
        }
        Ok(self.records.iter().map(|e| e.key().clone()).collect())
    }

    async fn get_record(&self, id: &str) -> Result<OrderRecord, LedgerError> {
        if self.failing_reads.contains_key(id) {
            return Err(LedgerError::Failed(format!("read of {id} failed")));
        }

        let entry = self
            .records
            .get(id)
            .ok_or_else(|| LedgerError::UnknownRecord(id.to_string()))?;
        let mut record = entry.record.clone();

        if let Some(mut remaining) = self.stale_reads.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                record.verified = false;
                record.revealed_value = 0;
            }
        }

        Ok(record)
    }

    async fn encrypted_payload(&self, id: &str) -> Result<CipherPayload, LedgerError> {
        self.records
            .get(id)
            .map(|e| e.payload.clone())
            .ok_or_else(|| LedgerError::UnknownRecord(id.to_string()))
    }

    async fn create_record(&self, req: CreateRecord) -> Result<TxReceipt, LedgerError> {
        if self.take_rejection() {
            return Err(LedgerError::Rejected);
        }
        if req.proof.is_empty() {
            return Err(LedgerError::Failed("empty correctness proof".into()));
        }
        if self.records.contains_key(&req.id) || self.staged.iter().any(|e| match e.value() {
            StagedWrite::Create(staged) => staged.id == req.id,
            _ => false,
        }) {
            return Err(LedgerError::Failed(format!("duplicate record id {}", req.id)));
        }

        let receipt = self.next_receipt();
        self.staged
            .insert(receipt.tx_id.clone(), StagedWrite::Create(Box::new(req)));
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(receipt)
    }

    async fn submit_reveal_proof(
        &self,
        id: &str,
        encoded_clear_values: Vec<u8>,
        proof: Vec<u8>,
    ) -> Result<TxReceipt, LedgerError> {
        if self.take_rejection() {
            return Err(LedgerError::Rejected);
        }
        if proof.is_empty() {
            return Err(LedgerError::Failed("empty decryption proof".into()));
        }

        let entry = self
            .records
            .get(id)
            .ok_or_else(|| LedgerError::UnknownRecord(id.to_string()))?;
        if entry.record.verified {
            return Err(LedgerError::AlreadyVerified(id.to_string()));
        }
        drop(entry);

        let receipt = self.next_receipt();
        self.staged.insert(
            receipt.tx_id.clone(),
            StagedWrite::Reveal {
                id: id.to_string(),
                encoded: encoded_clear_values,
            },
        );
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(receipt)
    }

    async fn confirm(&self, receipt: &TxReceipt) -> Result<(), LedgerError> {
        self.wait_while_held().await;

        if !self.confirm_latency.is_zero() {
            tokio::time::sleep(self.confirm_latency).await;
        }

        let (_, write) = self
            .staged
            .remove(&receipt.tx_id)
            .ok_or_else(|| LedgerError::UnknownTx(receipt.tx_id.clone()))?;
        self.apply(write)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
