//! Observer contract between the orchestrator and its consumers.

use crate::domain::orchestrator::RunOutcome;
use crate::domain::progress::Progress;
use crate::domain::record::ResultRecord;

/// Receives each classified record as the run produces it.
///
/// The orchestrator emits one `(record, progress)` event per dispatched job,
/// in strict input order, then exactly one terminal outcome. Consumers own
/// their repaint policy; the orchestrator never touches presentation state.
pub trait ResultSink: Send + Sync {
    fn record_ready(&self, record: ResultRecord, progress: &Progress);

    fn run_finished(&self, outcome: &RunOutcome);
}

/// Sink that discards everything. Useful as a default observer.
pub struct NullSink;

impl ResultSink for NullSink {
    fn record_ready(&self, _record: ResultRecord, _progress: &Progress) {}

    fn run_finished(&self, _outcome: &RunOutcome) {}
}
