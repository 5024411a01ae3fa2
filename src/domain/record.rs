//! Per-symbol outcome records and the service result payloads they summarize.

use serde::Deserialize;
use std::fmt;

/// Trade statistics block returned by the backtest service.
///
/// All fields default to zero so a sparse or older server payload still
/// decodes; the record constructors below only copy the headline figures.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TradeStatistics {
    #[serde(default)]
    pub initial_balance: f64,
    #[serde(default)]
    pub final_balance: f64,
    #[serde(default)]
    pub total_return: f64,
    #[serde(default)]
    pub total_pnl: f64,
    #[serde(default)]
    pub total_trades: u64,
    #[serde(default)]
    pub winning_trades: u64,
    #[serde(default)]
    pub win_rate: f64,
    #[serde(default)]
    pub max_drawdown: f64,
    #[serde(default)]
    pub leverage_used: f64,
}

/// One closed trade from the service's trade list.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeRow {
    pub entry_time: String,
    pub exit_time: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub position: String,
    pub pnl: f64,
    #[serde(default)]
    pub commission: f64,
    #[serde(default)]
    pub exit_reason: Option<String>,
    #[serde(default)]
    pub size_closed: Option<f64>,
}

/// A single take-profit level attached to an entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TpLevel {
    pub price: f64,
    #[serde(default)]
    pub close_percent: f64,
}

/// TP/SL levels recorded when a position was opened, for chart overlays.
#[derive(Debug, Clone, Deserialize)]
pub struct TpSlLevels {
    pub timestamp: String,
    pub entry_price: f64,
    pub direction: i8,
    #[serde(default)]
    pub tp_levels: Vec<TpLevel>,
    #[serde(default)]
    pub sl_level: f64,
}

/// One candle of chart data with indicator values and the signal fired on it.
#[derive(Debug, Clone, Deserialize)]
pub struct ChartCandle {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub macd: Option<f64>,
    #[serde(default)]
    pub macd_signal: Option<f64>,
    #[serde(default)]
    pub macd_histogram: Option<f64>,
    #[serde(default)]
    pub fast_ma: Option<f64>,
    #[serde(default)]
    pub slow_ma: Option<f64>,
    #[serde(default)]
    pub very_slow_ma: Option<f64>,
    #[serde(default)]
    pub signal: i8,
    #[serde(default)]
    pub signal_strength: f64,
}

/// Full decoded payload of one successful backtest call.
#[derive(Debug, Clone, Default)]
pub struct BacktestSummary {
    pub statistics: TradeStatistics,
    pub trades: Vec<TradeRow>,
    pub tp_sl_levels: Vec<TpSlLevels>,
    pub chart_data: Vec<ChartCandle>,
}

/// Outcome classification of one job. Exactly one of three forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    Success,
    Failed(String),
    Error(String),
}

impl RecordStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RecordStatus::Success)
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Success => write!(f, "Success"),
            RecordStatus::Failed(reason) => write!(f, "Failed: {reason}"),
            RecordStatus::Error(reason) => write!(f, "Error: {reason}"),
        }
    }
}

/// The outcome of one job, uniform in shape regardless of success or failure.
///
/// Every dispatched job produces exactly one record. Failure records carry
/// zeroed metrics rather than omitting them, so the collection stays 1:1 with
/// the dispatched prefix of the symbol list.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub symbol: String,
    pub total_return: f64,
    pub win_rate: f64,
    pub total_trades: u64,
    pub final_balance: f64,
    pub max_drawdown: f64,
    pub status: RecordStatus,
}

impl ResultRecord {
    pub fn success(symbol: impl Into<String>, stats: &TradeStatistics) -> Self {
        Self {
            symbol: symbol.into(),
            total_return: stats.total_return,
            win_rate: stats.win_rate,
            total_trades: stats.total_trades,
            final_balance: stats.final_balance,
            max_drawdown: stats.max_drawdown,
            status: RecordStatus::Success,
        }
    }

    /// Business-level rejection reported by the service.
    pub fn failed(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::zeroed(symbol.into(), RecordStatus::Failed(reason.into()))
    }

    /// Transport-level failure of the call itself.
    pub fn error(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::zeroed(symbol.into(), RecordStatus::Error(reason.into()))
    }

    fn zeroed(symbol: String, status: RecordStatus) -> Self {
        Self {
            symbol,
            total_return: 0.0,
            win_rate: 0.0,
            total_trades: 0,
            final_balance: 0.0,
            max_drawdown: 0.0,
            status,
        }
    }
}
