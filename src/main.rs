use clap::Parser;
use marketledger::application::withdrawals::WithdrawalService;
use marketledger::config::EngineConfig;
use marketledger::domain::account::BalanceDelta;
use marketledger::domain::ids::{SellerId, StoreId, WithdrawalId};
use marketledger::domain::ports::LedgerStoreRef;
use marketledger::domain::withdrawal::BankDetails;
use marketledger::error::{EngineError, Result as EngineResult};
use marketledger::infrastructure::in_memory::InMemoryLedgerStore;
use marketledger::infrastructure::notifier::LoggingNotifier;
use marketledger::interfaces::csv::account_writer::AccountWriter;
use marketledger::interfaces::csv::event_reader::{EventReader, LedgerEvent, LedgerEventType};
use miette::{IntoDiagnostic, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Replays a ledger event export against the seller ledger and prints the
/// final account balances as CSV.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input ledger events CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env();
    let ledger = open_ledger(cli.db_path)?;
    let withdrawals =
        WithdrawalService::new(config, Arc::clone(&ledger), Arc::new(LoggingNotifier));

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    // Maps the file's own references to the ids generated for its requests.
    let mut requests: HashMap<String, WithdrawalId> = HashMap::new();

    for event_result in reader.events() {
        match event_result {
            Ok(event) => {
                if let Err(e) = apply_event(&withdrawals, &ledger, &mut requests, event).await {
                    eprintln!("Error applying event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    let accounts = ledger.all_accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(accounts).into_diagnostic()?;

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerStoreRef> {
    use marketledger::infrastructure::rocksdb::RocksDBStore;
    Ok(match db_path {
        Some(path) => Arc::new(RocksDBStore::open(path).into_diagnostic()?),
        None => Arc::new(InMemoryLedgerStore::new()),
    })
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerStoreRef> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Arc::new(InMemoryLedgerStore::new()))
}

async fn apply_event(
    withdrawals: &WithdrawalService,
    ledger: &LedgerStoreRef,
    requests: &mut HashMap<String, WithdrawalId>,
    event: LedgerEvent,
) -> EngineResult<()> {
    let store_id = StoreId::from(event.store.as_str());
    match event.r#type {
        LedgerEventType::Credit => {
            let amount = event
                .amount
                .ok_or_else(|| EngineError::Validation("credit event missing amount".into()))?;
            if amount <= rust_decimal::Decimal::ZERO {
                return Err(EngineError::Validation(
                    "credit amount must be positive".into(),
                ));
            }
            ledger
                .apply_delta(&store_id, BalanceDelta::credit(amount))
                .await?;
        }
        LedgerEventType::Request => {
            let amount = event
                .amount
                .ok_or_else(|| EngineError::Validation("request event missing amount".into()))?;
            let seller = SellerId::from(event.seller.unwrap_or_default());
            let withdrawal = withdrawals
                .request(store_id, seller, amount, BankDetails::default())
                .await?;
            if let Some(reference) = event.reference {
                requests.insert(reference, withdrawal.id);
            }
        }
        LedgerEventType::Approve | LedgerEventType::Reject => {
            let reference = event.reference.ok_or_else(|| {
                EngineError::Validation("resolution event missing reference".into())
            })?;
            let id = requests.get(&reference).ok_or_else(|| {
                EngineError::Validation(format!("unknown withdrawal reference {reference}"))
            })?;
            if event.r#type == LedgerEventType::Approve {
                withdrawals.approve(id).await?;
            } else {
                withdrawals.reject(id).await?;
            }
        }
    }
    Ok(())
}
