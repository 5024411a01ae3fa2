//! Control surface tying orchestrator, store and view together for a caller.

use crate::domain::error::SweepError;
use crate::domain::orchestrator::{Orchestrator, RunHandle, RunOutcome};
use crate::domain::params::StrategyParams;
use crate::domain::progress::Progress;
use crate::domain::record::ResultRecord;
use crate::domain::store::ResultStore;
use crate::domain::view::{self, Page, SortKey, SortOrder, ViewState};
use crate::ports::backtest_port::BacktestPort;
use crate::ports::export_port::ExportPort;
use crate::ports::sink_port::ResultSink;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct SessionShared {
    store: Mutex<ResultStore>,
    view: Mutex<ViewState>,
    progress: Mutex<Progress>,
    last_outcome: Mutex<Option<RunOutcome>>,
    observer: Option<Arc<dyn ResultSink>>,
}

/// Sink installed by the session: applies each record to the shared store,
/// refreshes the progress text, then forwards to the external observer so
/// the presentation layer can repaint on its own terms.
struct SessionSink {
    shared: Arc<SessionShared>,
}

impl ResultSink for SessionSink {
    fn record_ready(&self, record: ResultRecord, progress: &Progress) {
        lock(&self.shared.store).add(record.clone());
        *lock(&self.shared.progress) = progress.clone();
        if let Some(observer) = &self.shared.observer {
            observer.record_ready(record, progress);
        }
    }

    fn run_finished(&self, outcome: &RunOutcome) {
        *lock(&self.shared.last_outcome) = Some(outcome.clone());
        if let Some(observer) = &self.shared.observer {
            observer.run_finished(outcome);
        }
    }
}

/// One interactive sweep session: owns the store, the view state and a single
/// run slot. Holds no presentation state beyond [`ViewState`]; rendering
/// collaborators subscribe through the observer and the read accessors.
pub struct SweepSession {
    orchestrator: Orchestrator,
    port: Arc<dyn BacktestPort>,
    exporter: Arc<dyn ExportPort + Send + Sync>,
    shared: Arc<SessionShared>,
    handle: Mutex<Option<RunHandle>>,
}

impl SweepSession {
    pub fn new(
        port: Arc<dyn BacktestPort>,
        exporter: Arc<dyn ExportPort + Send + Sync>,
    ) -> Self {
        Self::build(port, exporter, None)
    }

    /// Like [`SweepSession::new`] with an external observer that receives
    /// every `(record, progress)` event and the terminal outcome.
    pub fn with_observer(
        port: Arc<dyn BacktestPort>,
        exporter: Arc<dyn ExportPort + Send + Sync>,
        observer: Arc<dyn ResultSink>,
    ) -> Self {
        Self::build(port, exporter, Some(observer))
    }

    fn build(
        port: Arc<dyn BacktestPort>,
        exporter: Arc<dyn ExportPort + Send + Sync>,
        observer: Option<Arc<dyn ResultSink>>,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(Arc::clone(&port)),
            port,
            exporter,
            shared: Arc::new(SessionShared {
                store: Mutex::new(ResultStore::new()),
                view: Mutex::new(ViewState::default()),
                progress: Mutex::new(Progress::idle()),
                last_outcome: Mutex::new(None),
                observer,
            }),
            handle: Mutex::new(None),
        }
    }

    #[cfg(test)]
    fn with_orchestrator(
        orchestrator: Orchestrator,
        port: Arc<dyn BacktestPort>,
        exporter: Arc<dyn ExportPort + Send + Sync>,
    ) -> Self {
        Self {
            orchestrator,
            port,
            exporter,
            shared: Arc::new(SessionShared {
                store: Mutex::new(ResultStore::new()),
                view: Mutex::new(ViewState::default()),
                progress: Mutex::new(Progress::idle()),
                last_outcome: Mutex::new(None),
                observer: None,
            }),
            handle: Mutex::new(None),
        }
    }

    /// Starts a run over an explicit symbol list. The store is cleared only
    /// after validation passes; a rejected start leaves previous results
    /// intact.
    pub fn start_run(
        &self,
        symbols: Vec<String>,
        params: StrategyParams,
    ) -> Result<(), SweepError> {
        let mut slot = lock(&self.handle);
        if self.orchestrator.is_running() {
            return Err(SweepError::RunActive);
        }
        params.validate()?;
        if symbols.is_empty() {
            return Err(SweepError::InvalidParams {
                field: "symbols".to_string(),
                reason: "at least one symbol is required".to_string(),
            });
        }

        let total = symbols.len();
        lock(&self.shared.store).clear();
        *lock(&self.shared.progress) = Progress::new(0, total, None);
        *lock(&self.shared.last_outcome) = None;

        let sink: Arc<dyn ResultSink> = Arc::new(SessionSink {
            shared: Arc::clone(&self.shared),
        });
        let handle = self.orchestrator.start(symbols, params, sink)?;
        tracing::info!(total, "run started");
        *slot = Some(handle);
        Ok(())
    }

    /// Seeds the symbol list from the remote catalog, then starts the run.
    /// A catalog failure aborts before any job is dispatched, distinct from
    /// any per-job error.
    pub async fn start_run_all(&self, params: StrategyParams) -> Result<usize, SweepError> {
        if self.orchestrator.is_running() {
            return Err(SweepError::RunActive);
        }
        let catalog = self
            .port
            .list_symbols()
            .await
            .map_err(|err| match err {
                SweepError::CatalogFetch { .. } => err,
                other => SweepError::CatalogFetch {
                    reason: other.to_string(),
                },
            })?;
        if catalog.is_empty() {
            return Err(SweepError::CatalogFetch {
                reason: "catalog returned no symbols".to_string(),
            });
        }
        let symbols: Vec<String> = catalog.into_iter().map(|s| s.symbol).collect();
        let count = symbols.len();
        self.start_run(symbols, params)?;
        Ok(count)
    }

    /// Advisory stop; the in-flight job finishes and its record is kept.
    pub fn request_stop(&self) {
        tracing::info!("stop requested");
        self.orchestrator.request_stop();
    }

    pub fn is_running(&self) -> bool {
        self.orchestrator.is_running()
    }

    /// Waits for the active run to finish. Returns `None` when no run was
    /// started since the last wait.
    pub async fn wait(&self) -> Option<RunOutcome> {
        let handle = lock(&self.handle).take()?;
        let outcome = handle.wait().await;
        if matches!(outcome, RunOutcome::Aborted { .. }) {
            // A panicked task never reported through the sink.
            *lock(&self.shared.last_outcome) = Some(outcome.clone());
        }
        Some(outcome)
    }

    pub fn set_filter(&self, filter: impl Into<String>) {
        lock(&self.shared.view).set_filter(filter);
    }

    pub fn set_sort(&self, key: SortKey, order: SortOrder) {
        lock(&self.shared.view).set_sort(key, order);
    }

    pub fn set_page(&self, page_number: usize) {
        lock(&self.shared.view).set_page(page_number);
    }

    /// Projects the current store snapshot through the current view state.
    pub fn current_page(&self) -> Page {
        let records = lock(&self.shared.store).snapshot();
        let view = lock(&self.shared.view).clone();
        view::project(&records, &view)
    }

    pub fn record_count(&self) -> usize {
        lock(&self.shared.store).len()
    }

    /// Full store snapshot in insertion order, as the exporter sees it.
    pub fn results(&self) -> Vec<ResultRecord> {
        lock(&self.shared.store).snapshot()
    }

    pub fn progress_text(&self) -> String {
        lock(&self.shared.progress).format()
    }

    pub fn last_outcome(&self) -> Option<RunOutcome> {
        lock(&self.shared.last_outcome).clone()
    }

    /// Renders the full unfiltered store. A warned no-op when empty.
    pub fn export_current_results(&self) -> Result<Option<String>, SweepError> {
        let records = lock(&self.shared.store).snapshot();
        if records.is_empty() {
            tracing::warn!("export requested with no results");
            return Ok(None);
        }
        self.exporter.render(&records).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::params::Job;
    use crate::domain::record::{BacktestSummary, RecordStatus, TradeStatistics};
    use crate::domain::symbols::SymbolInfo;
    use crate::ports::backtest_port::BacktestReply;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::time::Duration;

    struct StubPort {
        replies: HashMap<String, Result<f64, String>>,
        catalog: Result<Vec<SymbolInfo>, String>,
    }

    impl StubPort {
        fn new() -> Self {
            Self {
                replies: HashMap::new(),
                catalog: Ok(vec![]),
            }
        }

        fn with_return(mut self, symbol: &str, total_return: f64) -> Self {
            self.replies.insert(symbol.to_string(), Ok(total_return));
            self
        }

        fn with_rejection(mut self, symbol: &str, reason: &str) -> Self {
            self.replies
                .insert(symbol.to_string(), Err(reason.to_string()));
            self
        }

        fn with_catalog(mut self, symbols: &[&str]) -> Self {
            self.catalog = Ok(symbols
                .iter()
                .map(|s| SymbolInfo {
                    symbol: s.to_string(),
                    base_asset: s.trim_end_matches("USDT").to_string(),
                    quote_asset: "USDT".to_string(),
                })
                .collect());
            self
        }

        fn with_catalog_error(mut self, reason: &str) -> Self {
            self.catalog = Err(reason.to_string());
            self
        }
    }

    #[async_trait]
    impl BacktestPort for StubPort {
        async fn run_backtest(&self, job: &Job) -> Result<BacktestReply, SweepError> {
            match self.replies.get(&job.symbol) {
                Some(Ok(total_return)) => Ok(BacktestReply::Completed(Box::new(BacktestSummary {
                    statistics: TradeStatistics {
                        total_return: *total_return,
                        total_trades: 4,
                        win_rate: 50.0,
                        final_balance: 10_000.0,
                        ..TradeStatistics::default()
                    },
                    ..BacktestSummary::default()
                }))),
                Some(Err(reason)) => Ok(BacktestReply::Rejected {
                    reason: reason.clone(),
                }),
                None => Err(SweepError::Transport {
                    reason: "unexpected symbol".to_string(),
                }),
            }
        }

        async fn list_symbols(&self) -> Result<Vec<SymbolInfo>, SweepError> {
            match &self.catalog {
                Ok(symbols) => Ok(symbols.clone()),
                Err(reason) => Err(SweepError::CatalogFetch {
                    reason: reason.clone(),
                }),
            }
        }
    }

    struct PlainExporter;

    impl ExportPort for PlainExporter {
        fn render(&self, records: &[ResultRecord]) -> Result<String, SweepError> {
            Ok(records
                .iter()
                .map(|r| format!("{},{}", r.symbol, r.status))
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_params() -> StrategyParams {
        StrategyParams::defaults(date(2024, 1, 1), date(2024, 6, 30))
    }

    fn fast_session(port: StubPort) -> SweepSession {
        let port: Arc<dyn BacktestPort> = Arc::new(port);
        SweepSession::with_orchestrator(
            Orchestrator::with_delay(Arc::clone(&port), Duration::from_millis(1)),
            port,
            Arc::new(PlainExporter),
        )
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn run_populates_store_in_order() {
        let session = fast_session(
            StubPort::new()
                .with_return("AAA", 10.0)
                .with_rejection("BBB", "insufficient data"),
        );

        session
            .start_run(symbols(&["AAA", "BBB"]), sample_params())
            .unwrap();
        let outcome = session.wait().await.unwrap();

        assert_eq!(outcome, RunOutcome::Completed { dispatched: 2 });
        let page = session.current_page();
        assert_eq!(page.total_filtered, 2);
        assert_eq!(page.records[0].symbol, "AAA");
        assert_eq!(page.records[0].status, RecordStatus::Success);
        assert_eq!(page.records[1].symbol, "BBB");
        assert_eq!(
            page.records[1].status,
            RecordStatus::Failed("insufficient data".into())
        );
    }

    #[tokio::test]
    async fn new_run_starts_from_an_empty_store() {
        let session = fast_session(StubPort::new().with_return("AAA", 1.0));

        session.start_run(symbols(&["AAA"]), sample_params()).unwrap();
        session.wait().await;
        assert_eq!(session.record_count(), 1);

        session.start_run(symbols(&["AAA"]), sample_params()).unwrap();
        session.wait().await;
        assert_eq!(session.record_count(), 1);
    }

    #[tokio::test]
    async fn invalid_params_leave_previous_results_intact() {
        let session = fast_session(StubPort::new().with_return("AAA", 1.0));
        session.start_run(symbols(&["AAA"]), sample_params()).unwrap();
        session.wait().await;

        let bad = StrategyParams {
            margin_percent: 0.0,
            ..sample_params()
        };
        let err = session.start_run(symbols(&["AAA"]), bad).unwrap_err();
        assert!(matches!(err, SweepError::InvalidParams { .. }));
        assert_eq!(session.record_count(), 1);
    }

    #[tokio::test]
    async fn catalog_seeds_a_whole_market_run() {
        let session = fast_session(
            StubPort::new()
                .with_catalog(&["AAAUSDT", "BBBUSDT"])
                .with_return("AAAUSDT", 1.0)
                .with_return("BBBUSDT", 2.0),
        );

        let count = session.start_run_all(sample_params()).await.unwrap();
        assert_eq!(count, 2);
        session.wait().await;
        assert_eq!(session.record_count(), 2);
    }

    #[tokio::test]
    async fn catalog_failure_aborts_with_no_records() {
        let session = fast_session(StubPort::new().with_catalog_error("service unavailable"));

        let err = session.start_run_all(sample_params()).await.unwrap_err();
        assert!(matches!(err, SweepError::CatalogFetch { .. }));
        assert_eq!(session.record_count(), 0);
        assert!(!session.is_running());
    }

    #[tokio::test]
    async fn filter_change_resets_page() {
        let session = fast_session(StubPort::new());
        session.set_page(7);
        session.set_filter("BTC");
        let page = session.current_page();
        assert!(page.records.is_empty());
        assert_eq!(lock(&session.shared.view).page_number, 1);
    }

    #[tokio::test]
    async fn export_on_empty_store_is_a_noop() {
        let session = fast_session(StubPort::new());
        assert_eq!(session.export_current_results().unwrap(), None);
    }

    #[tokio::test]
    async fn export_renders_full_store() {
        let session = fast_session(
            StubPort::new()
                .with_return("AAA", 1.0)
                .with_rejection("BBB", "no data"),
        );
        session
            .start_run(symbols(&["AAA", "BBB"]), sample_params())
            .unwrap();
        session.wait().await;

        let text = session.export_current_results().unwrap().unwrap();
        assert_eq!(text, "AAA,Success\nBBB,Failed: no data");
    }

    #[tokio::test]
    async fn progress_text_reflects_last_record() {
        let session = fast_session(StubPort::new().with_return("AAA", 1.0));
        assert_eq!(session.progress_text(), "No backtests in progress");

        session.start_run(symbols(&["AAA"]), sample_params()).unwrap();
        session.wait().await;
        let text = session.progress_text();
        assert!(text.contains("AAA"));
        assert!(text.contains("1/1"));
    }

    #[tokio::test]
    async fn last_outcome_distinguishes_completion() {
        let session = fast_session(StubPort::new().with_return("AAA", 1.0));
        assert_eq!(session.last_outcome(), None);
        session.start_run(symbols(&["AAA"]), sample_params()).unwrap();
        session.wait().await;
        assert_eq!(
            session.last_outcome(),
            Some(RunOutcome::Completed { dispatched: 1 })
        );
    }
}
