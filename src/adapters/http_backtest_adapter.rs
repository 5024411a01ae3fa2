//! HTTP adapter for the remote backtest service.

use crate::domain::error::SweepError;
use crate::domain::params::Job;
use crate::domain::record::{BacktestSummary, ChartCandle, TpSlLevels, TradeRow, TradeStatistics};
use crate::domain::symbols::SymbolInfo;
use crate::ports::backtest_port::{BacktestPort, BacktestReply};
use crate::ports::config_port::ConfigPort;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// [`BacktestPort`] over the service's JSON API.
///
/// The HTTP status code is not the failure signal; the response envelope is.
/// A body that fails to decode is a transport failure, `success: false` a
/// business failure. The client carries no request timeout: a hung remote
/// call stalls the run, matching the service contract.
pub struct HttpBacktestAdapter {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct BacktestRequest<'a> {
    symbol: &'a str,
    interval: &'a str,
    start_date: String,
    end_date: String,
    leverage: f64,
    margin: f64,
    balance: f64,
    macd_fast: u32,
    macd_slow: u32,
    macd_signal: u32,
    sma_length: u32,
    tp_base: f64,
    stop_loss: f64,
    max_tps: u32,
    tp_close: f64,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::Deserialize<'de>"))]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BacktestData {
    results: BacktestResults,
    #[serde(default)]
    chart_data: Vec<ChartCandle>,
}

#[derive(Debug, Deserialize)]
struct BacktestResults {
    #[serde(default)]
    statistics: TradeStatistics,
    #[serde(default)]
    trades: Vec<TradeRow>,
    #[serde(default)]
    tp_sl_levels: Vec<TpSlLevels>,
}

#[derive(Debug, Deserialize)]
struct SymbolEntry {
    symbol: String,
    #[serde(rename = "baseAsset", default)]
    base_asset: String,
    #[serde(rename = "quoteAsset", default)]
    quote_asset: String,
}

impl HttpBacktestAdapter {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SweepError> {
        // No .timeout() here: an individual call may outlive any sane bound
        // and the run loop owns pacing, not this client.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SweepError::Transport {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SweepError> {
        let base_url =
            config
                .get_string("service", "base_url")
                .ok_or_else(|| SweepError::ConfigMissing {
                    section: "service".to_string(),
                    key: "base_url".to_string(),
                })?;
        Self::new(base_url)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request_body<'a>(job: &'a Job) -> BacktestRequest<'a> {
        let params = &job.params;
        BacktestRequest {
            symbol: &job.symbol,
            interval: &params.interval,
            start_date: params.start_date.format("%Y-%m-%d").to_string(),
            end_date: params.end_date.format("%Y-%m-%d").to_string(),
            leverage: params.leverage,
            margin: params.margin_percent,
            balance: params.balance,
            macd_fast: params.macd_fast,
            macd_slow: params.macd_slow,
            macd_signal: params.macd_signal,
            sma_length: params.sma_length,
            tp_base: params.tp_base,
            stop_loss: params.stop_loss,
            max_tps: params.max_tps,
            tp_close: params.tp_close,
        }
    }
}

#[async_trait]
impl BacktestPort for HttpBacktestAdapter {
    async fn run_backtest(&self, job: &Job) -> Result<BacktestReply, SweepError> {
        let response = self
            .client
            .post(self.endpoint("/api/backtest"))
            .json(&Self::request_body(job))
            .send()
            .await
            .map_err(|e| SweepError::Transport {
                reason: e.to_string(),
            })?;

        let envelope: Envelope<BacktestData> =
            response.json().await.map_err(|e| SweepError::Transport {
                reason: format!("malformed response: {e}"),
            })?;

        if !envelope.success {
            return Ok(BacktestReply::Rejected {
                reason: envelope
                    .error
                    .unwrap_or_else(|| "unspecified service error".to_string()),
            });
        }

        let data = envelope.data.ok_or_else(|| SweepError::Transport {
            reason: "success response carried no data".to_string(),
        })?;

        Ok(BacktestReply::Completed(Box::new(BacktestSummary {
            statistics: data.results.statistics,
            trades: data.results.trades,
            tp_sl_levels: data.results.tp_sl_levels,
            chart_data: data.chart_data,
        })))
    }

    async fn list_symbols(&self) -> Result<Vec<SymbolInfo>, SweepError> {
        let response = self
            .client
            .get(self.endpoint("/api/symbols"))
            .send()
            .await
            .map_err(|e| SweepError::CatalogFetch {
                reason: e.to_string(),
            })?;

        let envelope: Envelope<Vec<SymbolEntry>> =
            response
                .json()
                .await
                .map_err(|e| SweepError::CatalogFetch {
                    reason: format!("malformed response: {e}"),
                })?;

        if !envelope.success {
            return Err(SweepError::CatalogFetch {
                reason: envelope
                    .error
                    .unwrap_or_else(|| "unspecified service error".to_string()),
            });
        }

        Ok(envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|entry| SymbolInfo {
                symbol: entry.symbol,
                base_asset: entry.base_asset,
                quote_asset: entry.quote_asset,
            })
            .collect())
    }
}
