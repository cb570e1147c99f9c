//! LeafWise - Maize leaf disease scanner
//!
//! Classifies a leaf image through the analysis backend and keeps a
//! durable, bounded scan history that survives restarts.

use clap::Parser;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use leafwise::cache::Environment;
use leafwise::classify::{image_to_data_uri, DiseaseClient, Prediction};
use leafwise::cli::{Cli, Command};
use leafwise::history::HistoryLedger;
use leafwise::store::{FileStore, MemoryStore, SharedStore};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Without a durable location the ledger degrades to memory-only; the
    // commands still work within the invocation.
    let (store, environment) = match cli
        .data_dir
        .clone()
        .map(FileStore::with_dir)
        .or_else(FileStore::new)
    {
        Some(backend) => (SharedStore::new(backend), Environment::Interactive),
        None => {
            warn!("no data directory available, scan history will not persist");
            (SharedStore::new(MemoryStore::new()), Environment::Headless)
        }
    };
    let ledger = HistoryLedger::new(store, environment);

    match cli.command {
        Command::Scan { image } => {
            let data_uri = match image_to_data_uri(&image) {
                Ok(uri) => uri,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            };

            println!("Analyzing {}...", image.display());
            let client = DiseaseClient::with_base_url(&cli.backend);
            let prediction = client.detect(&data_uri).await;
            print_prediction(&prediction);

            // Failed analyses are shown but never recorded
            match ledger.record_scan(image.display().to_string(), prediction) {
                Some(_) => {
                    println!("Recorded in scan history.");
                    ExitCode::SUCCESS
                }
                None => ExitCode::FAILURE,
            }
        }
        Command::History => {
            print_history(&ledger);
            ExitCode::SUCCESS
        }
        Command::Clear => {
            ledger.clear();
            println!("Scan history cleared.");
            ExitCode::SUCCESS
        }
    }
}

/// Prints one prediction in a readable block
fn print_prediction(prediction: &Prediction) {
    println!();
    println!(
        "{}  ({:.0}% confidence)",
        prediction.disease_name,
        prediction.confidence * 100.0
    );
    println!("{}", prediction.description);
    if !prediction.solutions.is_empty() {
        println!();
        println!("Solutions:");
        for solution in &prediction.solutions {
            println!("  - {}", solution);
        }
    }
    if !prediction.preventive_measures.is_empty() {
        println!();
        println!("Preventive measures:");
        for measure in &prediction.preventive_measures {
            println!("  - {}", measure);
        }
    }
    println!();
}

/// Prints the scan history, most recent first
fn print_history(ledger: &HistoryLedger) {
    let history = ledger.current();
    if history.is_empty() {
        println!("No scans recorded yet.");
        return;
    }
    println!("{} scan(s), most recent first:", history.len());
    println!();
    for record in &history {
        println!(
            "{}  {}  ({:.0}% confidence)",
            record.date,
            record.disease_name,
            record.confidence * 100.0
        );
        println!("    image: {}", record.image_url);
    }
}
