use std::env;
use std::time::Duration;

use anyhow::Result;

use darkpool_config::DarkpoolConfig;
use darkpool_core::{MemoryLedger, NewOrder, OrderKind, OrderWorkflow};
use darkpool_fhe::LocalFheProvider;

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("demo");

    match cmd {
        "demo" => {
            if let Err(e) = run_demo().await {
                eprintln!("❌ Error running demo: {}", e);
                std::process::exit(1);
            }
        }
        "sample-config" => {
            println!("{}", DarkpoolConfig::generate_sample());
        }
        _ => print_usage(),
    }
}

fn print_usage() {
    println!("darkpool - confidential order lifecycle");
    println!();
    println!("Usage:");
    println!("  darkpool demo           Run a scripted order lifecycle against the in-memory ledger");
    println!("  darkpool sample-config  Print a sample config.toml");
}

/// Scripted lifecycle: connect, create two orders, reveal one, show views.
async fn run_demo() -> Result<()> {
    let config = DarkpoolConfig::load()?;

    let ledger = MemoryLedger::with_latency(Duration::from_millis(
        config.simulation.confirm_latency_ms,
    ));
    let workflow = OrderWorkflow::new(ledger, LocalFheProvider::new(), config.contract.address);

    println!("== Connecting wallet {}", config.wallet.address);
    workflow.connect(&config.wallet.address).await;

    workflow.check_availability().await;
    println!("   status: {}", workflow.status().message);

    println!("== Creating orders");
    workflow
        .create_order(NewOrder {
            name: "Golden Ape #42".into(),
            value: 120,
            token_id: 42,
            kind: OrderKind::Buy,
            description: "Bid held dark until reveal".into(),
        })
        .await;
    println!("   status: {}", workflow.status().message);

    workflow
        .create_order(NewOrder {
            name: "Silver Ape #7".into(),
            value: 95,
            token_id: 7,
            kind: OrderKind::Sell,
            description: String::new(),
        })
        .await;
    println!("   status: {}", workflow.status().message);

    let snapshot = workflow.snapshot().await;
    println!("== Order book ({} orders)", snapshot.records.len());
    for record in &snapshot.records {
        println!(
            "   {} {} token={} {} {}",
            record.id,
            record.name,
            record.token_id,
            record.kind.as_str(),
            if record.verified {
                format!("revealed={}", record.revealed_value)
            } else {
                "encrypted".to_string()
            }
        );
    }

    let first = snapshot
        .records
        .first()
        .map(|r| r.id.clone())
        .expect("demo created orders");

    println!("== Revealing {first}");
    match workflow.reveal(&first).await {
        Some(value) => println!("   clear value: {value}"),
        None => println!("   no value returned"),
    }
    println!("   status: {}", workflow.status().message);

    // A second reveal never issues another transaction.
    println!("== Revealing {first} again");
    match workflow.reveal(&first).await {
        Some(value) => println!("   stored value: {value}"),
        None => println!("   no value returned"),
    }
    println!("   status: {}", workflow.status().message);

    let snapshot = workflow.snapshot().await;
    println!("== Market stats");
    println!("{}", serde_json::to_string_pretty(&snapshot.stats)?);

    println!("== Your history ({} orders)", snapshot.history.len());

    workflow.disconnect().await;
    println!("== Disconnected");

    Ok(())
}
