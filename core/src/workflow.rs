//! Order Workflow Orchestrator
//!
//! Drives the two write protocols (create, reveal) against the ledger and
//! FHE capabilities, and keeps the derived views reconciled with ledger
//! truth.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Protocol shape                            │
//! │                                                                 │
//! │   Idle ──▶ Pending ──▶ (Success | Error) ──▶ Idle               │
//! │                                                                 │
//! │   create: encrypt ─▶ submit ─▶ confirm ─▶ reload                │
//! │   reveal: read ─▶ prepare proof ─▶ submit ─▶ confirm ─▶ reload  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failure is classified here into a terminal status; nothing
//! escapes to a stuck pending state. State is owned by the workflow
//! instance and resets on success, error and disconnect alike.
//!
//! Re-entrancy: each action type carries a busy flag, acquired
//! compare-and-swap and released on every exit path. A second trigger
//! while the flag is held is a no-op, so at most one create and one
//! reveal are ever in flight per workflow. Distinct action types may
//! overlap; the reload is a full snapshot replacement, so overlapping
//! reloads converge on whichever completes last.

use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::MarketError;
use crate::gateway::{CreateRecord, LedgerCapability, LedgerGateway};
use crate::record::{Address, OrderKind, OrderRecord};
use crate::status::{StatusBoard, TransactionStatus};
use crate::views::{self, MarketStats};
use crate::wallet::WalletSession;
use darkpool_fhe::{FheCapability, PLAINTEXT_MAX};

/// User input for a create-order run.
///
/// Only `value` is confidential; the other fields go on-ledger in
/// plaintext.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub name: String,
    pub value: u64,
    pub token_id: u64,
    pub kind: OrderKind,
    pub description: String,
}

/// Latest reconciled snapshot of ledger state plus its derived views
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub records: Vec<OrderRecord>,
    pub stats: MarketStats,
    pub history: Vec<OrderRecord>,
}

/// RAII busy flag: acquired if the action is idle, released on drop
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

enum RevealOutcome {
    /// The record was verified before we did anything; stored value
    AlreadyVerified(u64),
    /// We ran the full protocol; freshly opened value
    Revealed(u64),
}

pub struct OrderWorkflow<L, F> {
    gateway: LedgerGateway<L>,
    fhe: F,
    scope: String,
    wallet: StdMutex<Option<WalletSession>>,
    view: Mutex<ViewState>,
    status: StatusBoard,
    creating: AtomicBool,
    revealing: AtomicBool,
    refreshing: AtomicBool,
    fhe_initializing: AtomicBool,
    next_order: AtomicU64,
}

impl<L, F> OrderWorkflow<L, F>
where
    L: LedgerCapability,
    F: FheCapability,
{
    pub fn new(ledger: L, fhe: F, scope: impl Into<String>) -> Self {
        Self {
            gateway: LedgerGateway::new(ledger),
            fhe,
            scope: scope.into(),
            wallet: StdMutex::new(None),
            view: Mutex::new(ViewState::default()),
            status: StatusBoard::new(),
            creating: AtomicBool::new(false),
            revealing: AtomicBool::new(false),
            refreshing: AtomicBool::new(false),
            fhe_initializing: AtomicBool::new(false),
            next_order: AtomicU64::new(0),
        }
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Open a wallet session, run the FHE handshake and load ledger state
    pub async fn connect(&self, address: impl Into<String>) {
        let session = WalletSession::connect(address);
        info!("wallet session opened for {}", session.address());
        *self.wallet.lock().expect("wallet lock poisoned") = Some(session);

        self.ensure_fhe_ready().await;
        self.load_data().await;
    }

    /// Drop the session and reset all view state
    pub async fn disconnect(&self) {
        *self.wallet.lock().expect("wallet lock poisoned") = None;
        *self.view.lock().await = ViewState::default();
        self.status.clear();
        info!("wallet session closed");
    }

    pub fn is_connected(&self) -> bool {
        self.wallet_address().is_some()
    }

    fn wallet_address(&self) -> Option<Address> {
        self.wallet
            .lock()
            .expect("wallet lock poisoned")
            .as_ref()
            .map(|s| s.address().clone())
    }

    /// One-time FHE handshake, guarded against concurrent re-entry.
    /// Idempotent once the capability reports itself initialized.
    async fn ensure_fhe_ready(&self) {
        if self.fhe.is_initialized() {
            return;
        }
        let Some(_busy) = BusyGuard::acquire(&self.fhe_initializing) else {
            return;
        };

        if let Err(e) = self.fhe.initialize().await {
            warn!("fhe handshake failed: {e}");
            self.status.error("FHE initialization failed");
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Refetch the full record set and recompute derived views.
    ///
    /// The snapshot is replaced wholesale; records are never patched
    /// incrementally.
    pub async fn load_data(&self) {
        if !self.is_connected() {
            return;
        }
        let Some(_busy) = BusyGuard::acquire(&self.refreshing) else {
            return;
        };

        match self.gateway.load_all().await {
            Ok(records) => {
                debug!("loaded {} records", records.len());
                self.install_snapshot(records).await;
            }
            Err(e) => {
                warn!("record load failed: {e}");
                self.status.error("Failed to load data");
            }
        }
    }

    async fn install_snapshot(&self, records: Vec<OrderRecord>) {
        let stats = views::market_stats(&records, unix_now());
        let address = self.wallet_address();
        let history = address
            .as_ref()
            .and_then(|a| views::creator_history(&records, a.as_str()));

        let mut view = self.view.lock().await;
        view.stats = stats;
        if let Some(history) = history {
            view.history = history;
        }
        view.records = records;
    }

    /// Probe the ledger contract
    pub async fn check_availability(&self) {
        if self.gateway.is_available().await {
            self.status.success("Contract available");
        } else {
            self.status.error("Check failed");
        }
    }

    pub async fn snapshot(&self) -> ViewState {
        self.view.lock().await.clone()
    }

    pub fn status(&self) -> TransactionStatus {
        self.status.current()
    }

    pub fn contract_scope(&self) -> &str {
        &self.scope
    }

    /// Whether the FHE handshake has completed for this session
    pub fn fhe_ready(&self) -> bool {
        self.fhe.is_initialized()
    }

    pub fn is_creating(&self) -> bool {
        self.creating.load(Ordering::Acquire)
    }

    pub fn is_revealing(&self) -> bool {
        self.revealing.load(Ordering::Acquire)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // Create-order protocol
    // ------------------------------------------------------------------

    pub async fn create_order(&self, order: NewOrder) {
        let Some(address) = self.wallet_address() else {
            self.status.error("Connect wallet first");
            return;
        };
        // A create already in flight: ignore the trigger entirely.
        let Some(_busy) = BusyGuard::acquire(&self.creating) else {
            return;
        };

        self.status.pending("Creating order with FHE...");

        match self.run_create(&address, order).await {
            Ok(id) => {
                info!("order {id} confirmed");
                self.status.success("Order created!");
                self.load_data().await;
            }
            Err(e) => {
                warn!("create order failed: {e}");
                self.status.error(classify_create_failure(&e));
            }
        }
    }

    async fn run_create(&self, address: &Address, order: NewOrder) -> Result<String, MarketError> {
        if !self.fhe.is_initialized() {
            return Err(MarketError::Encryption(
                darkpool_fhe::FheError::Uninitialized,
            ));
        }
        if order.value > PLAINTEXT_MAX {
            return Err(MarketError::Validation {
                value: order.value,
                max: PLAINTEXT_MAX,
            });
        }

        // Timestamp plus a session-scoped sequence: two creates landing in
        // the same millisecond must still get distinct ids.
        let seq = self.next_order.fetch_add(1, Ordering::AcqRel);
        let id = format!("order-{}-{seq}", unix_millis());
        let input = self
            .fhe
            .encrypt_value(&self.scope, address.as_str(), order.value)
            .await?;

        let pending = self
            .gateway
            .create_record(CreateRecord {
                id: id.clone(),
                name: order.name,
                payload: input.payload,
                proof: input.proof,
                token_id: order.token_id,
                kind: order.kind,
                description: order.description,
                creator: address.clone(),
            })
            .await?;

        self.status.pending("Confirming transaction...");
        pending.confirm().await?;
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Reveal protocol
    // ------------------------------------------------------------------

    /// Reveal the confidential value of `id`.
    ///
    /// Returns the clear value on success. Returns `None` without an error
    /// status when the record turned out to be revealed concurrently by
    /// another actor; the view is reconciled and the status reports
    /// verified.
    pub async fn reveal(&self, id: &str) -> Option<u64> {
        if !self.is_connected() {
            return None;
        }
        let Some(_busy) = BusyGuard::acquire(&self.revealing) else {
            return None;
        };

        match self.run_reveal(id).await {
            Ok(RevealOutcome::AlreadyVerified(value)) => {
                self.status.success("Price verified");
                Some(value)
            }
            Ok(RevealOutcome::Revealed(value)) => {
                info!("record {id} revealed");
                self.load_data().await;
                self.status.success("Price decrypted!");
                Some(value)
            }
            Err(e) if e.is_already_verified() => {
                debug!("record {id} was revealed concurrently, reconciling");
                self.load_data().await;
                self.status.success("Price verified");
                None
            }
            Err(e) => {
                warn!("reveal of {id} failed: {e}");
                self.status.error("Decryption failed");
                None
            }
        }
    }

    async fn run_reveal(&self, id: &str) -> Result<RevealOutcome, MarketError> {
        let record = self.gateway.fetch_record(id).await?;
        if record.verified {
            // Never re-run decryption on a verified record.
            return Ok(RevealOutcome::AlreadyVerified(record.revealed_value));
        }

        let payload = self.gateway.fetch_payload(id).await?;
        let bundle = self
            .fhe
            .prepare_reveal(&self.scope, std::slice::from_ref(&payload))
            .await?;

        let pending = self
            .gateway
            .submit_reveal_proof(id, bundle.encoded.clone(), bundle.proof.clone())
            .await?;
        self.status.pending("Verifying decryption...");
        pending.confirm().await?;

        let value = bundle
            .value_for(&payload)
            .ok_or_else(|| MarketError::Decryption("no clear value for handle".into()))?;
        Ok(RevealOutcome::Revealed(value))
    }
}

fn classify_create_failure(e: &MarketError) -> &'static str {
    if e.is_rejection() {
        "Transaction rejected"
    } else if matches!(
        e,
        MarketError::Validation { .. }
            | MarketError::Encryption(darkpool_fhe::FheError::OutOfRange { .. })
    ) {
        "Price out of range"
    } else {
        "Creation failed"
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
