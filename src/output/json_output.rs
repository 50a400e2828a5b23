//! JSON file sink
//!
//! Writes every destination as a pretty-printed `<destination>.json` file in a
//! single output directory.

use crate::orchestrator::{CrawlReport, HarvestOutcome};
use crate::output::traits::{OutputError, OutputResult, RecordSink};
use crate::record::Record;
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Timestamp format used in output file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Sink writing JSON files into a directory
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write<T: Serialize + ?Sized>(&self, value: &T, destination: &str) -> OutputResult<PathBuf> {
        if destination.is_empty() || destination.contains(['/', '\\']) {
            return Err(OutputError::Destination(destination.to_string()));
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", destination));
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;

        tracing::info!("Saved {}", path.display());
        Ok(path)
    }
}

impl RecordSink for JsonFileSink {
    fn save_records(&self, records: &[Record], destination: &str) -> OutputResult<PathBuf> {
        self.write(records, destination)
    }

    fn save_report(&self, report: &CrawlReport, destination: &str) -> OutputResult<PathBuf> {
        self.write(report, destination)
    }
}

/// Current local time in file-name form
pub fn run_timestamp() -> String {
    Local::now().format(FILE_TIMESTAMP_FORMAT).to_string()
}

/// Saves a whole run: each non-empty platform's records, the merged records,
/// and the report
///
/// # Arguments
///
/// * `sink` - Where to write
/// * `outcome` - The finished run
/// * `timestamp` - Shared timestamp embedded in every destination name
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - Everything written, in write order
/// * `Err(OutputError)` - The first failed write
pub fn save_outcome(
    sink: &dyn RecordSink,
    outcome: &HarvestOutcome,
    timestamp: &str,
) -> OutputResult<Vec<PathBuf>> {
    let mut written = Vec::new();

    for (platform, records) in &outcome.platform_data {
        if records.is_empty() {
            continue;
        }
        written.push(sink.save_records(records, &format!("{}_{}_raw", platform, timestamp))?);
    }

    if !outcome.merged.is_empty() {
        written.push(sink.save_records(
            &outcome.merged,
            &format!("all_platforms_{}_merged", timestamp),
        )?);
    }

    written.push(sink.save_report(&outcome.report, &format!("crawl_report_{}", timestamp))?);
    Ok(written)
}
