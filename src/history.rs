//! Scan history ledger
//!
//! Maintains the bounded, most-recent-first list of scan records on top of
//! the persistent cache. The ledger enforces the capacity bound on every
//! mutation and guards against recording failed classifications.

use chrono::{Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::cache::{Environment, PersistentCell, SubscriptionId};
use crate::classify::Prediction;
use crate::store::SharedStore;

/// Store key the history is persisted under
pub const HISTORY_KEY: &str = "scanHistory";

/// Maximum number of records the history retains
pub const MAX_SCANS: usize = 20;

/// Distinguishes records created within the same millisecond
static RECORD_SEQ: AtomicU64 = AtomicU64::new(0);

/// One completed scan in the history
///
/// Immutable once created; it leaves the history only through capacity
/// eviction or an explicit clear. Serialized camelCase, matching the
/// persisted layout (`id`/`date`/`imageUrl`/`diseaseName`/`confidence`/
/// `prediction`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    /// Unique identifier, timestamp-derived with a sequence suffix
    pub id: String,
    /// Date the scan was performed
    pub date: String,
    /// Reference to the scanned image (URL or data URI)
    pub image_url: String,
    /// Predicted disease name, duplicated from the prediction for display
    pub disease_name: String,
    /// Confidence score in [0, 1], duplicated from the prediction
    pub confidence: f64,
    /// The full classifier output
    pub prediction: Prediction,
}

impl ScanRecord {
    /// Builds a record for a completed scan.
    ///
    /// The id combines an RFC 3339 timestamp with a process-local sequence
    /// number, so rapid successive scans within one millisecond still get
    /// distinct ids.
    pub fn new(image_url: impl Into<String>, prediction: Prediction) -> Self {
        let seq = RECORD_SEQ.fetch_add(1, Ordering::Relaxed);
        let id = format!(
            "{}-{}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            seq
        );
        Self {
            id,
            date: Local::now().format("%Y-%m-%d").to_string(),
            image_url: image_url.into(),
            disease_name: prediction.disease_name.clone(),
            confidence: prediction.confidence,
            prediction,
        }
    }
}

/// Bounded, most-recent-first scan history over the persistent cache
///
/// After any mutation the history holds at most [`MAX_SCANS`] records, the
/// newest first. Appends from two contexts can race at the store with
/// last-write-wins semantics; one append can be lost. That weak consistency
/// is deliberate, there is no cross-context lock.
pub struct HistoryLedger {
    cell: PersistentCell<Vec<ScanRecord>>,
}

impl HistoryLedger {
    /// Creates a ledger over the given store, loading any persisted history.
    pub fn new(store: Arc<SharedStore>, environment: Environment) -> Self {
        Self {
            cell: PersistentCell::new(store, HISTORY_KEY, Vec::new(), environment),
        }
    }

    /// Prepends a record and trims the history to [`MAX_SCANS`] entries.
    ///
    /// Record fields are not validated here; their validity is the
    /// classifier's responsibility.
    pub fn append(&self, record: ScanRecord) {
        self.cell.update(|history| {
            let mut next = Vec::with_capacity((history.len() + 1).min(MAX_SCANS));
            next.push(record.clone());
            next.extend(history.iter().take(MAX_SCANS - 1).cloned());
            next
        });
    }

    /// Discards all records. Safe to call on an empty history.
    pub fn clear(&self) {
        self.cell.set(Vec::new());
    }

    /// Returns the current history, newest first.
    pub fn current(&self) -> Vec<ScanRecord> {
        self.cell.get()
    }

    /// Records a completed scan, unless the prediction is the in-band
    /// failure sentinel.
    ///
    /// Returns the appended record, or `None` (history untouched) when the
    /// classifier reported an analysis error.
    pub fn record_scan(
        &self,
        image_url: impl Into<String>,
        prediction: Prediction,
    ) -> Option<ScanRecord> {
        if prediction.is_analysis_error() {
            return None;
        }
        let record = ScanRecord::new(image_url, prediction);
        self.append(record.clone());
        Some(record)
    }

    /// Registers an observer called after every history change, local or
    /// external.
    pub fn subscribe(
        &self,
        f: impl Fn(&Vec<ScanRecord>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.cell.subscribe(f)
    }

    /// Removes a previously registered observer.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.cell.unsubscribe(id);
    }

    /// Re-reads the persisted history once, for contexts whose store became
    /// reachable after construction or to converge with another process.
    pub fn rehydrate(&self) {
        self.cell.rehydrate();
    }
}
