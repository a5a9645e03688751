//! Load a saved copy of the transaction feed into a database file.
//!
//! Useful for working offline: the server can then be started on the same
//! database without calling the seed endpoint.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use sales_insights::{
    FileTransactionFeed, QueryService, TransactionStore, count_transactions,
};

/// Import product transactions from a JSON file into the application database.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DB_PATH")]
    db_path: PathBuf,

    /// File path to a JSON array of product transaction records.
    #[arg(long)]
    feed_file: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let store = TransactionStore::open(&args.db_path, TransactionStore::DEFAULT_TIMEOUT)
        .unwrap_or_else(|error| {
            eprintln!("Could not open {}: {error}", args.db_path.display());
            std::process::exit(1);
        });
    let service = QueryService::new(store.clone());
    let feed = FileTransactionFeed::new(&args.feed_file);

    let inserted = match service.seed(&feed).await {
        Ok(inserted) => inserted,
        Err(error) => {
            eprintln!("Could not import {}: {error}", args.feed_file.display());
            std::process::exit(1);
        }
    };

    match store.read(count_transactions).await {
        Ok(total) => println!(
            "Imported {inserted} transactions, the database now holds {total} transactions."
        ),
        Err(error) => eprintln!("Imported {inserted} transactions, but could not count them: {error}"),
    }

    drop(service);
    if let Err(error) = store.close() {
        eprintln!("Could not close the database: {error}");
    }
}
