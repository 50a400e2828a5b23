//! Persistence sink trait and output errors
//!
//! The orchestrator only hands out in-memory records and reports; writing them
//! anywhere goes through a [`RecordSink`].

use crate::orchestrator::CrawlReport;
use crate::record::Record;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid destination: {0}")]
    Destination(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for harvested records and crawl reports
///
/// `destination` is a logical name such as `taobao_20240101_120000_raw`; the
/// sink decides where and in which format it lands.
pub trait RecordSink {
    /// Saves a batch of records
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Where the records were written
    /// * `Err(OutputError)` - Serialization or IO failure
    fn save_records(&self, records: &[Record], destination: &str) -> OutputResult<PathBuf>;

    /// Saves a crawl report
    fn save_report(&self, report: &CrawlReport, destination: &str) -> OutputResult<PathBuf>;
}
