//! Remote backtest service port trait.

use crate::domain::error::SweepError;
use crate::domain::params::Job;
use crate::domain::record::BacktestSummary;
use crate::domain::symbols::SymbolInfo;
use async_trait::async_trait;

/// Outcome of one backtest call, before the orchestrator classifies it.
///
/// An `Err` from the port is a transport failure (the call itself failed);
/// `Rejected` is the service answering cleanly with a business-level refusal.
#[derive(Debug)]
pub enum BacktestReply {
    Completed(Box<BacktestSummary>),
    Rejected { reason: String },
}

/// The remote strategy-testing service. At most one call is in flight at a
/// time; the orchestrator serializes dispatch and throttles between calls.
#[async_trait]
pub trait BacktestPort: Send + Sync {
    /// Runs one backtest for `job`. May suspend for as long as the remote
    /// side takes; there is no per-call timeout at this seam.
    async fn run_backtest(&self, job: &Job) -> Result<BacktestReply, SweepError>;

    /// Fetches the tradable-symbol catalog used to seed a whole-market run.
    async fn list_symbols(&self) -> Result<Vec<SymbolInfo>, SweepError>;
}
