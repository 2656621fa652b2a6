use chrono::NaiveDate;
use clap::Parser;
use loan_ledger::application::engine::LoanEngine;
use loan_ledger::domain::access::Actor;
use loan_ledger::domain::ports::{ClockBox, LedgerStoreBox};
use loan_ledger::infrastructure::clock::{FixedClock, SystemClock};
use loan_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use loan_ledger::infrastructure::policy::RolePolicy;
use loan_ledger::interfaces::csv::command_reader::CommandReader;
use loan_ledger::interfaces::csv::loan_writer::LoanWriter;
use loan_ledger::interfaces::script::ScriptRunner;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing::error;
#[cfg(not(feature = "storage-rocksdb"))]
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command script CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Pin the clock to midnight UTC of this date (YYYY-MM-DD)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreBox> {
    match db_path {
        Some(db_path) => open_persistent(db_path),
        None => Ok(Box::new(InMemoryLedgerStore::new())),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_persistent(db_path: PathBuf) -> Result<LedgerStoreBox> {
    use loan_ledger::infrastructure::rocksdb::RocksDBStore;

    let store = RocksDBStore::open(db_path).into_diagnostic()?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_persistent(db_path: PathBuf) -> Result<LedgerStoreBox> {
    warn!(
        db_path = %db_path.display(),
        "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
    );
    Ok(Box::new(InMemoryLedgerStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let clock: ClockBox = match cli.today {
        Some(date) => Box::new(FixedClock::on(date)),
        None => Box::new(SystemClock),
    };
    let engine = LoanEngine::new(open_store(cli.db_path)?, Box::new(RolePolicy), clock);

    // Process commands
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let mut runner = ScriptRunner::new(&engine);
    for (line, command) in reader.commands().enumerate() {
        match command {
            Ok(command) => {
                let kind = command.r#type;
                if let Err(e) = runner.execute(command).await {
                    error!(line = line + 1, command = ?kind, "Error processing command: {}", e);
                }
            }
            Err(e) => {
                error!(line = line + 1, "Error reading command: {}", e);
            }
        }
    }

    // Report every loan in the ledger
    let report = runner.report(&Actor::admin(0)).await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = LoanWriter::new(stdout.lock());
    writer.write_loans(&report).into_diagnostic()?;

    Ok(())
}
