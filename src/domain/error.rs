//! Domain error types.

/// Top-level error type for backsweep.
///
/// Per-job backtest failures are not represented here: the orchestrator
/// classifies them into [`crate::domain::record::ResultRecord`] entries and
/// the run continues. Only pre-run and run-level conditions surface as errors.
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid parameter {field}: {reason}")]
    InvalidParams { field: String, reason: String },

    #[error("symbol catalog fetch failed: {reason}")]
    CatalogFetch { reason: String },

    #[error("backtest service error: {reason}")]
    Service { reason: String },

    #[error("transport error: {reason}")]
    Transport { reason: String },

    #[error("a run is already active")]
    RunActive,

    #[error("export failed: {reason}")]
    Export { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SweepError> for std::process::ExitCode {
    fn from(err: &SweepError) -> Self {
        let code: u8 = match err {
            SweepError::Io(_) | SweepError::Export { .. } => 1,
            SweepError::ConfigParse { .. }
            | SweepError::ConfigMissing { .. }
            | SweepError::ConfigInvalid { .. }
            | SweepError::InvalidParams { .. } => 2,
            SweepError::CatalogFetch { .. } => 3,
            SweepError::Service { .. } | SweepError::Transport { .. } => 4,
            SweepError::RunActive => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = SweepError::CatalogFetch {
            reason: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "symbol catalog fetch failed: connection refused"
        );
    }

    #[test]
    fn config_errors_name_section_and_key() {
        let err = SweepError::ConfigMissing {
            section: "backtest".into(),
            key: "start_date".into(),
        };
        assert_eq!(err.to_string(), "missing config key [backtest] start_date");
    }
}
