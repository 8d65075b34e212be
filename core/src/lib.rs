//! Darkpool Core
//!
//! The confidential order lifecycle orchestrator.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        OrderWorkflow                             │
//! │                                                                  │
//! │  ┌───────────┐   ┌──────────────┐   ┌──────────────────────────┐ │
//! │  │  Encrypt  │──▶│    Submit    │──▶│   Await confirmation,    │ │
//! │  │  (FHE)    │   │  to ledger   │   │   then full reload       │ │
//! │  └───────────┘   └──────────────┘   └──────────────────────────┘ │
//! │                                                                  │
//! │  Reveal: read record ─▶ prepare proof ─▶ submit ─▶ reload        │
//! │  "already verified" from a concurrent actor is reconciliation,   │
//! │  not an error.                                                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything network-facing is a capability trait (`LedgerCapability`,
//! `FheCapability`); the in-tree `MemoryLedger` and `LocalFheProvider`
//! exercise the whole lifecycle without external services.

pub mod error;
pub mod gateway;
pub mod memory_ledger;
pub mod record;
pub mod status;
pub mod views;
pub mod wallet;
pub mod workflow;

pub use error::MarketError;
pub use gateway::{CreateRecord, LedgerCapability, LedgerError, LedgerGateway, PendingTx, TxReceipt};
pub use memory_ledger::MemoryLedger;
pub use record::{Address, OrderKind, OrderRecord};
pub use status::{StatusBoard, StatusPhase, TransactionStatus};
pub use views::MarketStats;
pub use wallet::WalletSession;
pub use workflow::{NewOrder, OrderWorkflow, ViewState};
