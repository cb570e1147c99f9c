//! Integration tests for the scan history over the file-backed store
//!
//! Exercises the full stack (ledger, cache cell, shared store, file
//! backend) the way the application uses it: record scans, reload in a new
//! "session", and observe changes from a second context.

use std::sync::Arc;
use tempfile::TempDir;

use leafwise::cache::Environment;
use leafwise::classify::Prediction;
use leafwise::history::{HistoryLedger, ScanRecord, MAX_SCANS};
use leafwise::store::{FileStore, SharedStore};

fn prediction(name: &str, confidence: f64) -> Prediction {
    Prediction {
        disease_name: name.to_string(),
        confidence,
        description: format!("{} detected", name),
        solutions: vec!["Apply fungicide".to_string()],
        preventive_measures: vec!["Rotate crops".to_string()],
    }
}

fn ledger_in(dir: &TempDir) -> HistoryLedger {
    let store = SharedStore::new(FileStore::with_dir(dir.path().to_path_buf()));
    HistoryLedger::new(store, Environment::Interactive)
}

#[test]
fn test_history_round_trips_across_sessions() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    let first_session = ledger_in(&temp_dir);
    first_session
        .record_scan("leaf-a.jpg", prediction("Leaf Blight", 0.95))
        .expect("Scan should be recorded");
    first_session
        .record_scan("leaf-b.jpg", prediction("Healthy", 0.40))
        .expect("Scan should be recorded");
    let before = first_session.current();
    drop(first_session);

    // Simulated reload: a fresh ledger over the same directory
    let second_session = ledger_in(&temp_dir);
    let after = second_session.current();

    assert_eq!(after, before, "History must survive a reload deep-equal");
    assert_eq!(after[0].disease_name, "Healthy");
    assert_eq!(after[1].disease_name, "Leaf Blight");
}

#[test]
fn test_capacity_bound_holds_across_sessions() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    {
        let session = ledger_in(&temp_dir);
        for i in 0..15 {
            session.append(ScanRecord::new(
                format!("leaf-{}.jpg", i),
                prediction(&format!("Disease {}", i), 0.5),
            ));
        }
    }
    {
        let session = ledger_in(&temp_dir);
        for i in 15..25 {
            session.append(ScanRecord::new(
                format!("leaf-{}.jpg", i),
                prediction(&format!("Disease {}", i), 0.5),
            ));
        }
    }

    let session = ledger_in(&temp_dir);
    let history = session.current();
    assert_eq!(history.len(), MAX_SCANS);
    assert_eq!(history[0].disease_name, "Disease 24");
    assert_eq!(history[MAX_SCANS - 1].disease_name, "Disease 5");
}

#[test]
fn test_two_contexts_on_one_store_converge() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let store = SharedStore::new(FileStore::with_dir(temp_dir.path().to_path_buf()));

    let tab_a = HistoryLedger::new(Arc::clone(&store), Environment::Interactive);
    let tab_b = HistoryLedger::new(store, Environment::Interactive);

    tab_a
        .record_scan("leaf.jpg", prediction("Common Rust", 0.88))
        .expect("Scan should be recorded");

    // tab B observes the append without any explicit re-read
    let seen = tab_b.current();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].disease_name, "Common Rust");

    tab_b.clear();
    assert!(tab_a.current().is_empty(), "Clear propagates back to tab A");
}

#[test]
fn test_sentinel_never_persisted() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");

    {
        let session = ledger_in(&temp_dir);
        session
            .record_scan("leaf.jpg", prediction("Leaf Blight", 0.95))
            .expect("Scan should be recorded");
        assert!(session
            .record_scan("leaf.jpg", Prediction::analysis_error("backend down"))
            .is_none());
    }

    let session = ledger_in(&temp_dir);
    let history = session.current();
    assert_eq!(history.len(), 1);
    assert!(history.iter().all(|r| !r.prediction.is_analysis_error()));
}

#[test]
fn test_corrupt_history_file_degrades_to_empty() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    std::fs::write(temp_dir.path().join("scanHistory.json"), "{definitely not json")
        .expect("Should write corrupt file");

    let session = ledger_in(&temp_dir);

    assert!(
        session.current().is_empty(),
        "Corrupt persisted history falls back to the default"
    );

    // And the ledger still works from there
    session
        .record_scan("leaf.jpg", prediction("Gray Leaf Spot", 0.72))
        .expect("Scan should be recorded");
    assert_eq!(session.current().len(), 1);
}
