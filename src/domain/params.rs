//! Per-run strategy parameters and job construction.

use crate::domain::error::SweepError;
use chrono::NaiveDate;

pub const MIN_LEVERAGE: f64 = 1.0;
pub const MAX_LEVERAGE: f64 = 125.0;
pub const MIN_MARGIN_PERCENT: f64 = 1.0;
pub const MAX_MARGIN_PERCENT: f64 = 100.0;

/// Parameters shared by every job in a run. Identical across all symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub interval: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leverage: f64,
    pub margin_percent: f64,
    pub balance: f64,
    pub macd_fast: u32,
    pub macd_slow: u32,
    pub macd_signal: u32,
    pub sma_length: u32,
    pub tp_base: f64,
    pub stop_loss: f64,
    pub max_tps: u32,
    pub tp_close: f64,
}

impl StrategyParams {
    /// Defaults matching the remote service's own fallbacks.
    pub fn defaults(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            interval: "1h".to_string(),
            start_date,
            end_date,
            leverage: 1.0,
            margin_percent: 10.0,
            balance: 10_000.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            sma_length: 200,
            tp_base: 0.75,
            stop_loss: 1.50,
            max_tps: 10,
            tp_close: 25.0,
        }
    }

    /// Rejects out-of-range parameters before any job is dispatched.
    pub fn validate(&self) -> Result<(), SweepError> {
        if self.start_date >= self.end_date {
            return Err(SweepError::InvalidParams {
                field: "start_date".to_string(),
                reason: "start_date must be before end_date".to_string(),
            });
        }
        if !(MIN_LEVERAGE..=MAX_LEVERAGE).contains(&self.leverage) {
            return Err(SweepError::InvalidParams {
                field: "leverage".to_string(),
                reason: format!(
                    "leverage must be between {} and {}",
                    MIN_LEVERAGE, MAX_LEVERAGE
                ),
            });
        }
        if !(MIN_MARGIN_PERCENT..=MAX_MARGIN_PERCENT).contains(&self.margin_percent) {
            return Err(SweepError::InvalidParams {
                field: "margin_percent".to_string(),
                reason: format!(
                    "margin_percent must be between {} and {}",
                    MIN_MARGIN_PERCENT, MAX_MARGIN_PERCENT
                ),
            });
        }
        Ok(())
    }
}

/// One unit of work: a symbol plus the run's fixed parameter set.
/// Immutable once constructed; consumed exactly once by the orchestrator.
#[derive(Debug, Clone)]
pub struct Job {
    pub symbol: String,
    pub params: StrategyParams,
}

impl Job {
    pub fn new(symbol: impl Into<String>, params: StrategyParams) -> Self {
        Self {
            symbol: symbol.into(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_params() -> StrategyParams {
        StrategyParams::defaults(date(2024, 1, 1), date(2024, 6, 30))
    }

    #[test]
    fn defaults_are_valid() {
        assert!(sample_params().validate().is_ok());
    }

    #[test]
    fn start_date_must_precede_end_date() {
        let params = StrategyParams {
            start_date: date(2024, 6, 30),
            end_date: date(2024, 1, 1),
            ..sample_params()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, SweepError::InvalidParams { field, .. } if field == "start_date"));
    }

    #[test]
    fn equal_dates_rejected() {
        let params = StrategyParams {
            start_date: date(2024, 1, 1),
            end_date: date(2024, 1, 1),
            ..sample_params()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn leverage_bounds() {
        for leverage in [0.5, 126.0] {
            let params = StrategyParams {
                leverage,
                ..sample_params()
            };
            let err = params.validate().unwrap_err();
            assert!(matches!(err, SweepError::InvalidParams { field, .. } if field == "leverage"));
        }
        for leverage in [1.0, 125.0] {
            let params = StrategyParams {
                leverage,
                ..sample_params()
            };
            assert!(params.validate().is_ok());
        }
    }

    #[test]
    fn margin_percent_bounds() {
        for margin_percent in [0.0, 100.5] {
            let params = StrategyParams {
                margin_percent,
                ..sample_params()
            };
            let err = params.validate().unwrap_err();
            assert!(
                matches!(err, SweepError::InvalidParams { field, .. } if field == "margin_percent")
            );
        }
        let params = StrategyParams {
            margin_percent: 100.0,
            ..sample_params()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn job_carries_symbol_and_params() {
        let job = Job::new("BTCUSDT", sample_params());
        assert_eq!(job.symbol, "BTCUSDT");
        assert_eq!(job.params.macd_fast, 12);
    }
}
