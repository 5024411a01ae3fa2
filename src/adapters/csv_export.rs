//! CSV export adapter.

use crate::domain::error::SweepError;
use crate::domain::record::ResultRecord;
use crate::ports::export_port::ExportPort;

pub const EXPORT_HEADER: [&str; 7] = [
    "Symbol",
    "Total Return (%)",
    "Win Rate (%)",
    "Total Trades",
    "Final Balance",
    "Max Drawdown (%)",
    "Status",
];

/// Renders the record store as CSV: one header row, one row per record in
/// store order, numeric fields to two decimals and the status field always
/// double-quoted (the status text is the one field that may carry commas).
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

fn quote_status(status: &str) -> String {
    format!("\"{}\"", status.replace('"', "\"\""))
}

impl ExportPort for CsvExporter {
    fn render(&self, records: &[ResultRecord]) -> Result<String, SweepError> {
        // Quoting is handled by hand for the status column; every other
        // field is a plain symbol or a formatted number.
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Never)
            .from_writer(Vec::new());

        writer
            .write_record(EXPORT_HEADER)
            .map_err(|e| SweepError::Export {
                reason: e.to_string(),
            })?;

        for record in records {
            writer
                .write_record(&[
                    record.symbol.clone(),
                    format!("{:.2}", record.total_return),
                    format!("{:.2}", record.win_rate),
                    record.total_trades.to_string(),
                    format!("{:.2}", record.final_balance),
                    format!("{:.2}", record.max_drawdown),
                    quote_status(&record.status.to_string()),
                ])
                .map_err(|e| SweepError::Export {
                    reason: e.to_string(),
                })?;
        }

        let bytes = writer.into_inner().map_err(|e| SweepError::Export {
            reason: e.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|e| SweepError::Export {
            reason: e.to_string(),
        })
    }
}
