//! Append-only store of per-symbol outcome records.

use crate::domain::record::ResultRecord;

/// The growing collection of completed job outcomes for one run.
///
/// Append-only while a run is active; cleared only when a new run starts.
/// Readers take cloned snapshots, never views into the live buffer, so the
/// single writing loop never races a reader mid-mutation. No deduplication:
/// a symbol dispatched twice yields two records.
#[derive(Debug, Default)]
pub struct ResultStore {
    records: Vec<ResultRecord>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: ResultRecord) {
        self.records.push(record);
    }

    /// Snapshot of all records in insertion order.
    pub fn snapshot(&self) -> Vec<ResultRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops all records. Called when a new run takes ownership of the store.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
