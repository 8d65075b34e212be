//! Wallet Session
//!
//! The slice of the wallet capability this core depends on: the current
//! account address and whether a session is active at all. Key management
//! stays on the wallet's side of the boundary. A dropped session is a hard
//! stop: every protocol re-checks it at entry and nothing queued survives
//! a disconnect.

use crate::record::Address;

#[derive(Debug, Clone)]
pub struct WalletSession {
    address: Address,
}

impl WalletSession {
    pub fn connect(address: impl Into<String>) -> Self {
        Self {
            address: Address::new(address),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }
}
