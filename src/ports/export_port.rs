//! Flat-file export port trait.

use crate::domain::error::SweepError;
use crate::domain::record::ResultRecord;
use std::fs;

/// Port for serializing the full record set to a flat text document.
///
/// Export always covers the records as given, in store order; filtering and
/// sorting belong to the view, never to the export.
pub trait ExportPort {
    fn render(&self, records: &[ResultRecord]) -> Result<String, SweepError>;

    /// Default implementation: renders and writes to `output_path`.
    fn write(&self, records: &[ResultRecord], output_path: &str) -> Result<(), SweepError> {
        let text = self.render(records)?;
        fs::write(output_path, text)?;
        Ok(())
    }
}
