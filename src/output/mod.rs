//! Output module for crawl reports and harvested records
//!
//! This module handles:
//! - Printing human-readable crawl reports
//! - The [`RecordSink`] persistence boundary
//! - Writing records and reports as JSON files

mod json_output;
pub mod stats;
mod traits;

pub use json_output::{run_timestamp, save_outcome, JsonFileSink, FILE_TIMESTAMP_FORMAT};
pub use stats::{format_report, print_report};
pub use traits::{OutputError, OutputResult, RecordSink};
