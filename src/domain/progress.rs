//! Human-readable run progress for the presentation layer.

use std::fmt;

/// Position within a run: jobs completed so far out of the total, plus the
/// symbol most recently processed. Stateless; a fresh value is produced for
/// every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub symbol: Option<String>,
}

impl Progress {
    pub fn new(current: usize, total: usize, symbol: Option<&str>) -> Self {
        Self {
            current,
            total,
            symbol: symbol.map(str::to_string),
        }
    }

    /// Idle state shown before any run has started.
    pub fn idle() -> Self {
        Self::new(0, 0, None)
    }

    /// Completion percentage for a progress bar. Zero when no jobs exist.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.current as f64 / self.total as f64 * 100.0
        }
    }

    pub fn format(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total == 0 {
            return write!(f, "No backtests in progress");
        }
        match &self.symbol {
            Some(symbol) => write!(
                f,
                "Backtested {symbol} ({current}/{total}, {percent:.0}%)",
                current = self.current,
                total = self.total,
                percent = self.percent()
            ),
            None => write!(
                f,
                "Backtested {current}/{total} ({percent:.0}%)",
                current = self.current,
                total = self.total,
                percent = self.percent()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn format_names_counts_and_symbol() {
        let text = Progress::new(2, 5, Some("ETHUSDT")).format();
        assert!(text.contains('2'));
        assert!(text.contains('5'));
        assert!(text.contains("ETHUSDT"));
    }

    #[test]
    fn zero_total_is_defined() {
        let progress = Progress::new(0, 0, None);
        assert_eq!(progress.percent(), 0.0);
        assert_eq!(progress.format(), "No backtests in progress");
    }

    #[test]
    fn percent_is_ratio_of_current_to_total() {
        assert_relative_eq!(Progress::new(2, 5, None).percent(), 40.0);
        assert_relative_eq!(Progress::new(5, 5, None).percent(), 100.0);
    }

    #[test]
    fn format_without_symbol() {
        let text = Progress::new(1, 4, None).format();
        assert!(text.contains('1'));
        assert!(text.contains('4'));
    }

    #[test]
    fn idle_matches_zero_total() {
        assert_eq!(Progress::idle(), Progress::new(0, 0, None));
    }
}
