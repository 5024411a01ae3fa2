//! Sequential job runner with cooperative cancellation.

use crate::domain::error::SweepError;
use crate::domain::params::{Job, StrategyParams};
use crate::domain::progress::Progress;
use crate::domain::record::ResultRecord;
use crate::ports::backtest_port::{BacktestPort, BacktestReply};
use crate::ports::sink_port::ResultSink;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Pause between consecutive backtest calls. Deliberate backpressure against
/// the rate-limited remote service; applied after failures too.
pub const INTER_JOB_DELAY: Duration = Duration::from_millis(500);

/// Live state of one run. Mutated only by the run loop and by stop requests;
/// reset when the run ends.
#[derive(Debug, Default)]
pub struct RunState {
    running: AtomicBool,
    stop_requested: AtomicBool,
    cursor: AtomicUsize,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the state for a new run. Fails if a run is already active.
    fn try_begin(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        self.cursor.store(0, Ordering::SeqCst);
        true
    }

    /// Advisory stop. Honored at the top of the next loop iteration; never
    /// aborts a call already in flight.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    fn set_cursor(&self, index: usize) {
        self.cursor.store(index, Ordering::SeqCst);
    }

    fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every symbol was dispatched.
    Completed { dispatched: usize },
    /// A stop request took effect before the list was exhausted.
    Stopped { dispatched: usize },
    /// The run task died before reaching a terminal state.
    Aborted { reason: String },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Completed { dispatched } => write!(f, "completed ({dispatched} jobs)"),
            RunOutcome::Stopped { dispatched } => {
                write!(f, "stopped by request after {dispatched} jobs")
            }
            RunOutcome::Aborted { reason } => write!(f, "aborted: {reason}"),
        }
    }
}

/// Handle to a spawned run.
#[derive(Debug)]
pub struct RunHandle {
    state: Arc<RunState>,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn request_stop(&self) {
        self.state.request_stop();
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Waits for the run to reach a terminal state.
    pub async fn wait(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.state.finish();
                RunOutcome::Aborted {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Drives one backtest call at a time over an ordered symbol list.
///
/// One orchestrator owns one [`RunState`]; at most one run may be active on
/// it. Each dispatched job is classified into exactly one record and handed
/// to the sink before the next job starts.
pub struct Orchestrator {
    port: Arc<dyn BacktestPort>,
    state: Arc<RunState>,
    inter_job_delay: Duration,
}

impl Orchestrator {
    pub fn new(port: Arc<dyn BacktestPort>) -> Self {
        Self::with_delay(port, INTER_JOB_DELAY)
    }

    pub(crate) fn with_delay(port: Arc<dyn BacktestPort>, inter_job_delay: Duration) -> Self {
        Self {
            port,
            state: Arc::new(RunState::new()),
            inter_job_delay,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn request_stop(&self) {
        self.state.request_stop();
    }

    /// Starts a run over `symbols` in order. Rejects without mutating any
    /// state when the parameters are invalid, the list is empty, or a run is
    /// already active.
    pub fn start(
        &self,
        symbols: Vec<String>,
        params: StrategyParams,
        sink: Arc<dyn ResultSink>,
    ) -> Result<RunHandle, SweepError> {
        params.validate()?;
        if symbols.is_empty() {
            return Err(SweepError::InvalidParams {
                field: "symbols".to_string(),
                reason: "at least one symbol is required".to_string(),
            });
        }
        if !self.state.try_begin() {
            return Err(SweepError::RunActive);
        }

        let state = Arc::clone(&self.state);
        let port = Arc::clone(&self.port);
        let delay = self.inter_job_delay;
        let task = tokio::spawn(run_loop(port, Arc::clone(&state), symbols, params, sink, delay));

        Ok(RunHandle { state, task })
    }
}

async fn run_loop(
    port: Arc<dyn BacktestPort>,
    state: Arc<RunState>,
    symbols: Vec<String>,
    params: StrategyParams,
    sink: Arc<dyn ResultSink>,
    delay: Duration,
) -> RunOutcome {
    let total = symbols.len();
    let mut dispatched = 0usize;
    let mut stopped = false;

    for (index, symbol) in symbols.iter().enumerate() {
        // Stop is honored here only: an in-flight job always finishes and
        // its record lands before the flag is seen.
        if state.stop_requested() {
            stopped = true;
            break;
        }
        state.set_cursor(index);

        let job = Job::new(symbol.clone(), params.clone());
        tracing::debug!(%symbol, position = index + 1, total, "dispatching backtest");

        let record = match port.run_backtest(&job).await {
            Ok(BacktestReply::Completed(summary)) => {
                ResultRecord::success(symbol, &summary.statistics)
            }
            Ok(BacktestReply::Rejected { reason }) => {
                tracing::warn!(%symbol, %reason, "backtest rejected by service");
                ResultRecord::failed(symbol, reason)
            }
            Err(err) => {
                tracing::warn!(%symbol, error = %err, "backtest call failed");
                ResultRecord::error(symbol, err.to_string())
            }
        };
        dispatched += 1;

        let progress = Progress::new(index + 1, total, Some(symbol));
        sink.record_ready(record, &progress);

        if index + 1 < total && !state.stop_requested() {
            tokio::time::sleep(delay).await;
        }
    }

    state.finish();
    let outcome = if stopped {
        RunOutcome::Stopped { dispatched }
    } else {
        RunOutcome::Completed { dispatched }
    };
    tracing::info!(%outcome, "run finished");
    sink.run_finished(&outcome);
    outcome
}
