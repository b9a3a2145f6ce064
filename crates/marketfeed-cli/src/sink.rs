//! CSV output for command results.

use std::path::{Path, PathBuf};

use marketfeed_core::{Candle, Ticker};
use tracing::{info, warn};

use crate::error::CliError;

/// A record that can be written as one CSV row under a fixed header.
pub trait CsvRecord {
    const HEADER: &'static [&'static str];

    fn row(&self) -> Vec<String>;
}

impl CsvRecord for Ticker {
    const HEADER: &'static [&'static str] = &Ticker::FIELD_NAMES;

    fn row(&self) -> Vec<String> {
        self.to_row()
    }
}

impl CsvRecord for Candle {
    const HEADER: &'static [&'static str] = &Candle::FIELD_NAMES;

    fn row(&self) -> Vec<String> {
        self.to_row()
    }
}

/// Writes result files into one output directory.
#[derive(Debug, Clone)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `records` to `file_name` and returns the path written.
    ///
    /// Nothing is written for an empty slice; `Ok(None)` is returned instead.
    pub fn write<R: CsvRecord>(
        &self,
        file_name: &str,
        records: &[R],
    ) -> Result<Option<PathBuf>, CliError> {
        if records.is_empty() {
            warn!(file = file_name, "no records to write");
            return Ok(None);
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(R::HEADER)?;
        for record in records {
            writer.write_record(record.row())?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = records.len(), "wrote csv");
        Ok(Some(path))
    }
}
