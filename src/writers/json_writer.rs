use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::models::Observation;

/// Writes stored observations out as a JSON array.
#[derive(Default)]
pub struct JsonWriter;

impl JsonWriter {
    pub fn new() -> Self {
        Self
    }

    /// Serialize one object per observation. Recorded readings come out as
    /// numbers, missing-value markers as their marker string.
    pub fn write_observations(&self, observations: &[Observation], path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, observations)?;
        writer.flush()?;
        Ok(())
    }
}
