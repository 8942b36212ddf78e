use std::path::Path;

use crate::error::Result;
use crate::models::Observation;

/// Writes stored observations out as CSV for external tooling.
#[derive(Default)]
pub struct CsvWriter;

impl CsvWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write one row per observation. Missing-value markers are written
    /// verbatim, not blanked or zeroed.
    pub fn write_observations(&self, observations: &[Observation], path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["sample_date", "max_temp", "min_temp", "mean_temp", "location"])?;

        for observation in observations {
            writer.write_record([
                observation.date.to_string(),
                observation.temps.max.to_string(),
                observation.temps.min.to_string(),
                observation.temps.mean.to_string(),
                observation.location.clone(),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }
}
