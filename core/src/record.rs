//! Order Record Model
//!
//! The public + confidential order entity tracked by the ledger. The
//! confidential value never appears here in clear form until a reveal has
//! been attested on-chain: `revealed_value` carries meaning only while
//! `verified` is true.

use serde::{Deserialize, Serialize};

/// A ledger account identifier.
///
/// Stored verbatim, compared case-insensitively: the same account may be
/// reported checksummed by one source and lowercased by another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive identity check
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl Eq for Address {}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Buy,
    Sell,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Buy => "buy",
            OrderKind::Sell => "sell",
        }
    }
}

/// A ledger-resident order record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Opaque unique id, assigned client-side at creation
    pub id: String,
    /// Display name
    pub name: String,
    /// Public token id (plaintext)
    pub token_id: u64,
    pub kind: OrderKind,
    /// May be empty
    pub description: String,
    pub creator: Address,
    /// Unix seconds, stamped by the ledger at confirmation
    pub created_at: u64,
    /// Whether the confidential value has been revealed and attested
    pub verified: bool,
    /// Meaningful only when `verified`; 0 otherwise
    pub revealed_value: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_case_insensitive() {
        let a = Address::new("0xAbCd01");
        assert!(a.matches("0xabcd01"));
        assert!(a.matches("0xABCD01"));
        assert!(!a.matches("0xabcd02"));
        assert_eq!(a, Address::new("0xABcd01"));
    }

    #[test]
    fn test_address_display_preserves_original() {
        let a = Address::new("0xAbCd01");
        assert_eq!(a.to_string(), "0xAbCd01");
    }

    #[test]
    fn test_order_kind_labels() {
        assert_eq!(OrderKind::Buy.as_str(), "buy");
        assert_eq!(OrderKind::Sell.as_str(), "sell");
    }
}
