//! View Projection
//!
//! Pure derivations over the current record set. No I/O, no failure modes;
//! the orchestrator recomputes these from each reloaded snapshot.

use serde::Serialize;

use crate::record::OrderRecord;

/// Window for the recent-activity counter
const RECENT_WINDOW_SECS: u64 = 60 * 60 * 24;

/// Aggregate statistics over the record set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketStats {
    pub total_orders: usize,
    pub verified_orders: usize,
    /// Mean of `revealed_value` over ALL records; an unverified record
    /// contributes 0. Not the mean over verified records only.
    pub avg_price: f64,
    /// Records created within the trailing 24 hours of `now`
    pub recent_activity: usize,
}

pub fn market_stats(records: &[OrderRecord], now: u64) -> MarketStats {
    let total_orders = records.len();
    let verified_orders = records.iter().filter(|r| r.verified).count();

    let avg_price = if records.is_empty() {
        0.0
    } else {
        let sum: u64 = records
            .iter()
            .map(|r| if r.verified { r.revealed_value } else { 0 })
            .sum();
        sum as f64 / total_orders as f64
    };

    let recent_activity = records
        .iter()
        .filter(|r| now.saturating_sub(r.created_at) < RECENT_WINDOW_SECS)
        .count();

    MarketStats {
        total_orders,
        verified_orders,
        avg_price,
        recent_activity,
    }
}

/// Records created by `address`, matched case-insensitively.
///
/// An empty address yields `None`: the caller keeps its previous view
/// rather than clearing it.
pub fn creator_history(records: &[OrderRecord], address: &str) -> Option<Vec<OrderRecord>> {
    if address.is_empty() {
        return None;
    }
    Some(
        records
            .iter()
            .filter(|r| r.creator.matches(address))
            .cloned()
            .collect(),
    )
}
