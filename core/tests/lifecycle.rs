//! End-to-end order lifecycle against the in-memory ledger and local FHE
//! provider: create, reveal, reconciliation, and the failure paths the
//! orchestrator must classify.

use std::sync::Arc;
use std::time::Duration;

use darkpool_core::{
    MemoryLedger, NewOrder, OrderKind, OrderWorkflow, StatusPhase,
};
use darkpool_fhe::{LocalFheProvider, PLAINTEXT_MAX};

const WALLET: &str = "0xA11ce00000000000000000000000000000000001";
const SCOPE: &str = "0xC0ffee0000000000000000000000000000000001";

type Workflow = OrderWorkflow<Arc<MemoryLedger>, LocalFheProvider>;

async fn connected_workflow() -> (Arc<MemoryLedger>, Workflow) {
    let ledger = Arc::new(MemoryLedger::new());
    let workflow = OrderWorkflow::new(ledger.clone(), LocalFheProvider::new(), SCOPE);
    workflow.connect(WALLET).await;
    (ledger, workflow)
}

fn buy_order(name: &str, value: u64, token_id: u64) -> NewOrder {
    NewOrder {
        name: name.into(),
        value,
        token_id,
        kind: OrderKind::Buy,
        description: String::new(),
    }
}

async fn record_id(workflow: &Workflow, name: &str) -> String {
    workflow
        .snapshot()
        .await
        .records
        .iter()
        .find(|r| r.name == name)
        .map(|r| r.id.clone())
        .expect("record should exist")
}

#[tokio::test]
async fn empty_ledger_renders_empty_state() {
    let (_ledger, workflow) = connected_workflow().await;
    assert!(workflow.fhe_ready());

    let snapshot = workflow.snapshot().await;
    assert!(snapshot.records.is_empty());
    assert!(snapshot.history.is_empty());
    assert_eq!(snapshot.stats.total_orders, 0);
    assert_eq!(snapshot.stats.verified_orders, 0);
    assert_eq!(snapshot.stats.avg_price, 0.0);
    assert_eq!(snapshot.stats.recent_activity, 0);
}

#[tokio::test]
async fn created_order_appears_unverified() {
    let (ledger, workflow) = connected_workflow().await;

    workflow.create_order(buy_order("A", 5, 1)).await;

    let status = workflow.status();
    assert_eq!(status.phase, StatusPhase::Success);
    assert_eq!(status.message, "Order created!");
    assert_eq!(ledger.write_count(), 1);

    let snapshot = workflow.snapshot().await;
    assert_eq!(snapshot.records.len(), 1);
    let record = &snapshot.records[0];
    assert_eq!(record.name, "A");
    assert_eq!(record.token_id, 1);
    assert_eq!(record.kind, OrderKind::Buy);
    assert!(!record.verified);
    assert_eq!(record.revealed_value, 0);
    assert!(record.creator.matches(WALLET));

    // Created moments ago: counts as recent, contributes 0 to the average.
    assert_eq!(snapshot.stats.total_orders, 1);
    assert_eq!(snapshot.stats.verified_orders, 0);
    assert_eq!(snapshot.stats.avg_price, 0.0);
    assert_eq!(snapshot.stats.recent_activity, 1);
    assert_eq!(snapshot.history.len(), 1);
}

#[tokio::test]
async fn create_then_reveal_round_trip() {
    let (ledger, workflow) = connected_workflow().await;

    workflow.create_order(buy_order("A", 5, 1)).await;
    let id = record_id(&workflow, "A").await;

    let revealed = workflow.reveal(&id).await;
    assert_eq!(revealed, Some(5));
    assert_eq!(workflow.status().message, "Price decrypted!");
    assert_eq!(ledger.write_count(), 2);

    let snapshot = workflow.snapshot().await;
    let record = &snapshot.records[0];
    assert!(record.verified);
    assert_eq!(record.revealed_value, 5);
    assert_eq!(snapshot.stats.verified_orders, 1);
    assert_eq!(snapshot.stats.avg_price, 5.0);
}

#[tokio::test]
async fn second_reveal_returns_stored_value_without_a_write() {
    let (ledger, workflow) = connected_workflow().await;

    workflow.create_order(buy_order("A", 5, 1)).await;
    let id = record_id(&workflow, "A").await;

    assert_eq!(workflow.reveal(&id).await, Some(5));
    let writes_after_first = ledger.write_count();

    let second = workflow.reveal(&id).await;
    assert_eq!(second, Some(5));
    assert_eq!(ledger.write_count(), writes_after_first);

    let status = workflow.status();
    assert_eq!(status.phase, StatusPhase::Success);
    assert_eq!(status.message, "Price verified");
}

#[tokio::test]
async fn concurrent_reveal_reconciles_to_success() {
    let (ledger, workflow) = connected_workflow().await;

    workflow.create_order(buy_order("A", 5, 1)).await;
    let id = record_id(&workflow, "A").await;
    assert_eq!(workflow.reveal(&id).await, Some(5));
    let writes_after_first = ledger.write_count();

    // The next read of the record reports it unverified, as if our snapshot
    // raced another actor's reveal. The submission then discovers the truth.
    ledger.serve_stale_reads(&id, 1);

    let outcome = workflow.reveal(&id).await;
    assert_eq!(outcome, None, "race resolves without a returned value");

    let status = workflow.status();
    assert_eq!(status.phase, StatusPhase::Success, "never a decryption error");
    assert_eq!(status.message, "Price verified");
    assert_eq!(ledger.write_count(), writes_after_first);

    // The reload reconciled the view with ledger truth.
    let snapshot = workflow.snapshot().await;
    assert!(snapshot.records[0].verified);
    assert_eq!(snapshot.records[0].revealed_value, 5);
}

#[tokio::test]
async fn unverified_records_count_zero_in_average() {
    let (_ledger, workflow) = connected_workflow().await;

    workflow.create_order(buy_order("A", 5, 1)).await;
    workflow.create_order(buy_order("B", 7, 2)).await;

    let id = record_id(&workflow, "A").await;
    assert_eq!(workflow.reveal(&id).await, Some(5));

    let stats = workflow.snapshot().await.stats;
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.verified_orders, 1);
    // 5 over two records, not over the one verified record.
    assert_eq!(stats.avg_price, 2.5);
}

#[tokio::test]
async fn second_create_trigger_is_a_noop_while_in_flight() {
    let ledger = Arc::new(MemoryLedger::new());
    let workflow = Arc::new(OrderWorkflow::new(
        ledger.clone(),
        LocalFheProvider::new(),
        SCOPE,
    ));
    workflow.connect(WALLET).await;

    ledger.hold_confirmations();

    let first = {
        let workflow = workflow.clone();
        tokio::spawn(async move { workflow.create_order(buy_order("A", 5, 1)).await })
    };

    // Wait for the first create to stage its transaction and block on
    // confirmation.
    for _ in 0..200 {
        if ledger.write_count() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(ledger.write_count(), 1);
    assert!(workflow.is_creating());

    // Re-entrant trigger: no second transaction, status untouched.
    workflow.create_order(buy_order("B", 7, 2)).await;
    assert_eq!(ledger.write_count(), 1);
    assert_eq!(workflow.status().message, "Confirming transaction...");

    ledger.release_confirmations();
    first.await.expect("create task panicked");

    assert!(!workflow.is_creating());
    let snapshot = workflow.snapshot().await;
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].name, "A");
}

#[tokio::test]
async fn signer_rejection_gets_its_own_message() {
    let (ledger, workflow) = connected_workflow().await;

    ledger.reject_next_write();
    workflow.create_order(buy_order("A", 5, 1)).await;

    let status = workflow.status();
    assert_eq!(status.phase, StatusPhase::Error);
    assert_eq!(status.message, "Transaction rejected");
    assert!(workflow.snapshot().await.records.is_empty());
    assert!(!workflow.is_creating());
}

#[tokio::test]
async fn out_of_range_value_never_reaches_the_ledger() {
    let (ledger, workflow) = connected_workflow().await;

    workflow
        .create_order(buy_order("A", PLAINTEXT_MAX + 1, 1))
        .await;

    let status = workflow.status();
    assert_eq!(status.phase, StatusPhase::Error);
    assert_eq!(status.message, "Price out of range");
    assert_eq!(ledger.write_count(), 0);
}

#[tokio::test]
async fn protocols_unreachable_without_a_session() {
    let ledger = Arc::new(MemoryLedger::new());
    let workflow = OrderWorkflow::new(ledger.clone(), LocalFheProvider::new(), SCOPE);

    workflow.create_order(buy_order("A", 5, 1)).await;
    assert_eq!(workflow.status().message, "Connect wallet first");
    assert_eq!(ledger.write_count(), 0);

    assert_eq!(workflow.reveal("order-any").await, None);
}

#[tokio::test]
async fn disconnect_resets_state_and_leaves_no_stale_flags() {
    let (ledger, workflow) = connected_workflow().await;

    workflow.create_order(buy_order("A", 5, 1)).await;
    assert_eq!(workflow.snapshot().await.records.len(), 1);

    workflow.disconnect().await;

    assert!(!workflow.is_connected());
    assert!(!workflow.is_creating());
    assert!(!workflow.is_revealing());
    assert!(!workflow.is_refreshing());
    assert!(!workflow.status().visible);
    assert!(workflow.snapshot().await.records.is_empty());

    // Protocols are unreachable until a new session opens.
    workflow.create_order(buy_order("B", 7, 2)).await;
    assert_eq!(workflow.status().message, "Connect wallet first");
    assert_eq!(ledger.write_count(), 1);
}

#[tokio::test]
async fn one_failing_record_does_not_abort_the_load() {
    let (ledger, workflow) = connected_workflow().await;

    workflow.create_order(buy_order("A", 5, 1)).await;
    workflow.create_order(buy_order("B", 7, 2)).await;
    let id_a = record_id(&workflow, "A").await;

    ledger.fail_reads_of(&id_a);
    workflow.load_data().await;

    let snapshot = workflow.snapshot().await;
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].name, "B");
    assert_ne!(workflow.status().message, "Failed to load data");
}

#[tokio::test]
async fn listing_failure_aborts_the_load_with_one_error() {
    let (ledger, workflow) = connected_workflow().await;
    workflow.create_order(buy_order("A", 5, 1)).await;

    ledger.fail_listings(true);
    workflow.load_data().await;

    let status = workflow.status();
    assert_eq!(status.phase, StatusPhase::Error);
    assert_eq!(status.message, "Failed to load data");

    // The previous snapshot survives; the failed load replaced nothing.
    assert_eq!(workflow.snapshot().await.records.len(), 1);
}

#[tokio::test]
async fn missing_contract_degrades_to_no_data() {
    let ledger = Arc::new(MemoryLedger::new());
    ledger.set_available(false);
    let workflow = OrderWorkflow::new(ledger.clone(), LocalFheProvider::new(), SCOPE);
    workflow.connect(WALLET).await;

    // No error status: an undeployed contract is an empty market.
    assert!(workflow.snapshot().await.records.is_empty());
    assert_ne!(workflow.status().message, "Failed to load data");

    workflow.check_availability().await;
    assert_eq!(workflow.status().message, "Check failed");

    ledger.set_available(true);
    workflow.check_availability().await;
    assert_eq!(workflow.status().message, "Contract available");
}

#[tokio::test]
async fn history_follows_the_connected_account() {
    let (_ledger, workflow) = connected_workflow().await;

    workflow.create_order(buy_order("A", 5, 1)).await;
    workflow.create_order(buy_order("B", 7, 2)).await;
    assert_eq!(workflow.snapshot().await.history.len(), 2);

    // A different account sees none of those orders as its own.
    workflow.disconnect().await;
    workflow
        .connect("0xB0b0000000000000000000000000000000000002")
        .await;
    let snapshot = workflow.snapshot().await;
    assert_eq!(snapshot.records.len(), 2);
    assert!(snapshot.history.is_empty());
}

#[tokio::test]
async fn reveal_of_unknown_record_reports_decryption_failure() {
    let (_ledger, workflow) = connected_workflow().await;

    assert_eq!(workflow.reveal("order-missing").await, None);
    let status = workflow.status();
    assert_eq!(status.phase, StatusPhase::Error);
    assert_eq!(status.message, "Decryption failed");
    assert!(!workflow.is_revealing());
}
