use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wager_ledger::application::engine::LedgerEngine;
use wager_ledger::config::LedgerConfig;
use wager_ledger::domain::money::FeeRate;
use wager_ledger::domain::ports::LedgerStoreRef;
use wager_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use wager_ledger::interfaces::csv::account_writer::{AccountState, AccountWriter};
use wager_ledger::interfaces::csv::command_reader::CommandReader;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input command script (CSV)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured platform fee rate.
    #[arg(long)]
    fee_rate: Option<Decimal>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("wager_ledger=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => LedgerConfig::from_path(path).into_diagnostic()?,
        None => LedgerConfig::default(),
    };
    if let Some(rate) = cli.fee_rate {
        config.fee_rate = FeeRate::new(rate).into_diagnostic()?;
    }

    let store = open_store(cli.db_path.as_deref()).into_diagnostic()?;
    let engine = LedgerEngine::new(store, config);
    engine.bootstrap().await.into_diagnostic()?;

    // Replay the script
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                if let Err(e) = command.apply(&engine).await {
                    error!(op = ?command.op, "Error processing command: {}", e);
                }
            }
            Err(e) => {
                error!("Error reading command: {}", e);
            }
        }
    }

    // Output final state
    let mut accounts: Vec<AccountState> = engine
        .users()
        .await
        .into_diagnostic()?
        .iter()
        .map(AccountState::from)
        .collect();
    let platform = engine.wallet().platform_balance().await.into_diagnostic()?;
    accounts.push(AccountState::platform(platform));

    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(accounts).into_diagnostic()?;

    let report = engine.ledger().verify_integrity().await.into_diagnostic()?;
    info!(accounts = report.accounts_checked, "ledger reconciled");
    Ok(())
}

fn open_store(db_path: Option<&Path>) -> wager_ledger::error::Result<LedgerStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = wager_ledger::infrastructure::rocksdb::RocksDBStore::open(path)?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Arc::new(InMemoryLedgerStore::new())),
    }
}
