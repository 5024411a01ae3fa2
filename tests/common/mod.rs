#![allow(dead_code)]

use async_trait::async_trait;
use backsweep::domain::error::SweepError;
use backsweep::domain::params::{Job, StrategyParams};
use backsweep::domain::record::{BacktestSummary, ResultRecord, TradeStatistics};
use backsweep::domain::symbols::SymbolInfo;
use backsweep::ports::backtest_port::{BacktestPort, BacktestReply};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub enum MockReply {
    Success(TradeStatistics),
    Rejected(String),
    Transport(String),
}

/// Scripted [`BacktestPort`] for end-to-end sweeps without a network.
pub struct MockBacktestPort {
    pub replies: HashMap<String, MockReply>,
    pub catalog: Result<Vec<SymbolInfo>, String>,
    pub latency: Duration,
    pub calls: Mutex<Vec<String>>,
}

impl MockBacktestPort {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            catalog: Ok(vec![]),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_stats(mut self, symbol: &str, stats: TradeStatistics) -> Self {
        self.replies
            .insert(symbol.to_string(), MockReply::Success(stats));
        self
    }

    pub fn with_return(self, symbol: &str, total_return: f64) -> Self {
        self.with_stats(symbol, make_stats(total_return))
    }

    pub fn with_rejection(mut self, symbol: &str, reason: &str) -> Self {
        self.replies
            .insert(symbol.to_string(), MockReply::Rejected(reason.to_string()));
        self
    }

    pub fn with_transport_error(mut self, symbol: &str, reason: &str) -> Self {
        self.replies
            .insert(symbol.to_string(), MockReply::Transport(reason.to_string()));
        self
    }

    pub fn with_catalog(mut self, symbols: &[&str]) -> Self {
        self.catalog = Ok(symbols.iter().map(|s| make_symbol_info(s)).collect());
        self
    }

    pub fn with_catalog_error(mut self, reason: &str) -> Self {
        self.catalog = Err(reason.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BacktestPort for MockBacktestPort {
    async fn run_backtest(&self, job: &Job) -> Result<BacktestReply, SweepError> {
        self.calls.lock().unwrap().push(job.symbol.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.replies.get(&job.symbol) {
            Some(MockReply::Success(stats)) => {
                Ok(BacktestReply::Completed(Box::new(BacktestSummary {
                    statistics: stats.clone(),
                    ..BacktestSummary::default()
                })))
            }
            Some(MockReply::Rejected(reason)) => Ok(BacktestReply::Rejected {
                reason: reason.clone(),
            }),
            Some(MockReply::Transport(reason)) => Err(SweepError::Transport {
                reason: reason.clone(),
            }),
            None => Ok(BacktestReply::Rejected {
                reason: format!("no market data for {}", job.symbol),
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

pub fn make_stats(total_return: f64) -> TradeStatistics {
    TradeStatistics {
        initial_balance: 10_000.0,
        final_balance: 10_000.0 * (1.0 + total_return / 100.0),
        total_return,
        total_pnl: 10_000.0 * total_return / 100.0,
        total_trades: 12,
        winning_trades: 7,
        win_rate: 58.33,
        max_drawdown: 6.5,
        leverage_used: 1.0,
    }
}

pub fn make_symbol_info(symbol: &str) -> SymbolInfo {
    SymbolInfo {
        symbol: symbol.to_string(),
        base_asset: symbol.trim_end_matches("USDT").to_string(),
        quote_asset: "USDT".to_string(),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn sample_params() -> StrategyParams {
    StrategyParams::defaults(date(2024, 1, 1), date(2024, 6, 30))
}

pub fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn symbols_of(records: &[ResultRecord]) -> Vec<String> {
    records.iter().map(|r| r.symbol.clone()).collect()
}
