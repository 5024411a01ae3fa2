//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_export::CsvExporter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::http_backtest_adapter::HttpBacktestAdapter;
use crate::domain::error::SweepError;
use crate::domain::orchestrator::RunOutcome;
use crate::domain::progress::Progress;
use crate::domain::record::{RecordStatus, ResultRecord};
use crate::domain::session::SweepSession;
use crate::domain::symbols::parse_symbols;
use crate::ports::backtest_port::BacktestPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::sink_port::ResultSink;

#[derive(Parser, Debug)]
#[command(
    name = "backsweep",
    about = "Batch backtest runner for a remote strategy-testing service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run backtests across a symbol list
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated symbol list, overriding the config
        #[arg(long)]
        symbols: Option<String>,
        /// Single symbol, overriding the config
        #[arg(long, conflicts_with = "symbols")]
        symbol: Option<String>,
        /// Sweep every symbol in the remote catalog
        #[arg(long, conflicts_with_all = ["symbol", "symbols"])]
        all: bool,
        /// Write a CSV export of the full result set here
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// List tradable symbols from the backtest service
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a run configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            symbols,
            symbol,
            all,
            output,
            dry_run,
        } => run_sweep(
            &config,
            symbols.as_deref(),
            symbol.as_deref(),
            all,
            output.as_ref(),
            dry_run,
        ),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SweepError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Builds the per-run parameter set from config, with the service's own
/// defaults for everything except the date range.
pub fn build_params(config: &dyn ConfigPort) -> Result<crate::domain::params::StrategyParams, SweepError> {
    use crate::domain::params::StrategyParams;

    let start_date = parse_date(config, "start_date")?;
    let end_date = parse_date(config, "end_date")?;

    Ok(StrategyParams {
        interval: config
            .get_string("backtest", "interval")
            .unwrap_or_else(|| "1h".to_string()),
        start_date,
        end_date,
        leverage: config.get_double("backtest", "leverage", 1.0),
        margin_percent: config.get_double("backtest", "margin_percent", 10.0),
        balance: config.get_double("backtest", "balance", 10_000.0),
        macd_fast: config.get_int("strategy", "macd_fast", 12) as u32,
        macd_slow: config.get_int("strategy", "macd_slow", 26) as u32,
        macd_signal: config.get_int("strategy", "macd_signal", 9) as u32,
        sma_length: config.get_int("strategy", "sma_length", 200) as u32,
        tp_base: config.get_double("tp_sl", "tp_base", 0.75),
        stop_loss: config.get_double("tp_sl", "stop_loss", 1.50),
        max_tps: config.get_int("tp_sl", "max_tps", 10) as u32,
        tp_close: config.get_double("tp_sl", "tp_close", 25.0),
    })
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, SweepError> {
    let value = config
        .get_string("backtest", key)
        .ok_or_else(|| SweepError::ConfigMissing {
            section: "backtest".to_string(),
            key: key.to_string(),
        })?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| SweepError::ConfigInvalid {
        section: "backtest".to_string(),
        key: key.to_string(),
        reason: format!("invalid {} format, expected YYYY-MM-DD", key),
    })
}

/// Resolves the symbol list: CLI single-symbol override, then CLI list
/// override, then the `[run] symbols` config key.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    symbols_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, SweepError> {
    if let Some(symbol) = symbol_override {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(SweepError::InvalidParams {
                field: "symbol".to_string(),
                reason: "symbol must not be empty".to_string(),
            });
        }
        return Ok(vec![symbol.to_uppercase()]);
    }

    let list = match symbols_override {
        Some(list) => list.to_string(),
        None => config.get_string("run", "symbols").ok_or_else(|| {
            SweepError::ConfigMissing {
                section: "run".to_string(),
                key: "symbols".to_string(),
            }
        })?,
    };

    parse_symbols(&list).map_err(|e| SweepError::InvalidParams {
        field: "symbols".to_string(),
        reason: e.to_string(),
    })
}

/// Streams per-record lines to stderr as the run progresses.
struct ConsoleSink;

impl ResultSink for ConsoleSink {
    fn record_ready(&self, record: ResultRecord, progress: &Progress) {
        eprintln!(
            "  [{:>3.0}%] {}: {}",
            progress.percent(),
            record.symbol,
            record.status
        );
    }

    fn run_finished(&self, _outcome: &RunOutcome) {}
}

fn run_sweep(
    config_path: &PathBuf,
    symbols_override: Option<&str>,
    symbol_override: Option<&str>,
    all: bool,
    output_path: Option<&PathBuf>,
    dry_run: bool,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Build and validate run parameters
    let params = match build_params(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Err(e) = params.validate() {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 3: Resolve the symbol list (the catalog-seeded case defers to
    // the service and cannot be resolved offline)
    let symbols = if all {
        None
    } else {
        match resolve_symbols(symbol_override, symbols_override, &adapter) {
            Ok(s) => Some(s),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    };

    if dry_run {
        return print_dry_run(&params, symbols.as_deref());
    }

    // Stage 4: Wire the session
    let port = match HttpBacktestAdapter::from_config(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let session = Arc::new(SweepSession::with_observer(
        Arc::new(port),
        Arc::new(CsvExporter::new()),
        Arc::new(ConsoleSink),
    ));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    // Stage 5: Run to a terminal state, honoring ctrl-c as a stop request
    let result = runtime.block_on(async {
        if let Some(symbols) = symbols {
            eprintln!("Backtesting {} symbols...", symbols.len());
            session.start_run(symbols, params)?;
        } else {
            eprintln!("Fetching symbol catalog...");
            let count = session.start_run_all(params).await?;
            eprintln!("Backtesting {} catalog symbols...", count);
        }

        let stopper = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("\nStop requested; letting the in-flight job finish");
                    session.request_stop();
                }
            })
        };

        let outcome = session.wait().await;
        stopper.abort();
        Ok::<_, SweepError>(outcome)
    });

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 6: Summarize
    print_summary(&session.results());
    if let Some(outcome) = outcome {
        eprintln!("\nRun {}", outcome);
    }

    // Stage 7: Export
    if let Some(path) = output_path {
        match session.export_current_results() {
            Ok(Some(text)) => {
                if let Err(e) = fs::write(path, text) {
                    eprintln!("error: failed to write export: {e}");
                    return ExitCode::from(1);
                }
                eprintln!("Results exported to: {}", path.display());
            }
            Ok(None) => eprintln!("warning: no results to export"),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    ExitCode::SUCCESS
}

fn print_dry_run(
    params: &crate::domain::params::StrategyParams,
    symbols: Option<&[String]>,
) -> ExitCode {
    eprintln!("\nRun parameters:");
    eprintln!("  interval:   {}", params.interval);
    eprintln!("  dates:      {} to {}", params.start_date, params.end_date);
    eprintln!("  leverage:   {}x", params.leverage);
    eprintln!("  margin:     {}%", params.margin_percent);
    eprintln!("  balance:    {}", params.balance);
    eprintln!(
        "  MACD:       {}/{}/{}, SMA {}",
        params.macd_fast, params.macd_slow, params.macd_signal, params.sma_length
    );
    eprintln!(
        "  TP/SL:      base {}%, stop {}%, max TPs {}, close {}%",
        params.tp_base, params.stop_loss, params.max_tps, params.tp_close
    );

    eprintln!("\nSymbols:");
    match symbols {
        Some(symbols) => eprintln!("  {}", symbols.join(", ")),
        None => eprintln!("  (entire remote catalog)"),
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn print_summary(records: &[ResultRecord]) {
    if records.is_empty() {
        eprintln!("\nNo results collected");
        return;
    }

    eprintln!("\n=== Sweep Results ===");
    let mut succeeded = 0usize;
    for record in records {
        match &record.status {
            RecordStatus::Success => {
                succeeded += 1;
                let sign = if record.total_return >= 0.0 { "+" } else { "" };
                eprintln!(
                    "  {}:  {}{:.2}% return, {:.1}% win rate, {} trades, {:.1}% max drawdown",
                    record.symbol,
                    sign,
                    record.total_return,
                    record.win_rate,
                    record.total_trades,
                    record.max_drawdown,
                );
            }
            status => eprintln!("  {}:  {}", record.symbol, status),
        }
    }
    eprintln!("{} of {} symbols succeeded", succeeded, records.len());
}

fn run_list_symbols(config_path: &PathBuf) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let adapter = match HttpBacktestAdapter::from_config(&config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(adapter.list_symbols()) {
        Ok(symbols) => {
            if symbols.is_empty() {
                eprintln!("No symbols found");
            } else {
                for info in &symbols {
                    println!("{}", info.symbol);
                }
                eprintln!("{} symbols found", symbols.len());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let params = match build_params(&adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Err(e) = params.validate() {
        eprintln!("error: {e}");
        return (&e).into();
    }

    if adapter.get_string("service", "base_url").is_none() {
        let e = SweepError::ConfigMissing {
            section: "service".to_string(),
            key: "base_url".to_string(),
        };
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("Configuration is valid");
    ExitCode::SUCCESS
}
