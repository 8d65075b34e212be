//! Error Taxonomy
//!
//! Every protocol step classifies failures at its own boundary into a
//! terminal `TransactionStatus`; these are the categories it classifies
//! into. A signer declining a transaction is kept apart from other ledger
//! failures because it maps to a distinct user-facing message.

use thiserror::Error;

use crate::gateway::LedgerError;
use darkpool_fhe::FheError;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("no active wallet session")]
    Connection,

    #[error("value {value} exceeds the scheme width (max {max})")]
    Validation { value: u64, max: u64 },

    #[error("encryption failed: {0}")]
    Encryption(#[from] FheError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("transaction rejected by signer")]
    Rejected,
}

impl MarketError {
    /// The benign reveal race: another actor revealed the record between
    /// our read and our submission.
    pub fn is_already_verified(&self) -> bool {
        matches!(self, MarketError::Ledger(LedgerError::AlreadyVerified(_)))
    }

    /// Signer-declined, in either the wallet or ledger shape
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            MarketError::Rejected | MarketError::Ledger(LedgerError::Rejected)
        )
    }
}
