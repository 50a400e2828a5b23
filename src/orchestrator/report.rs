use crate::quality::ValidationReport;
use serde::Serialize;
use std::collections::BTreeMap;

/// Quality report for one platform's final records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformReport {
    pub platform_name: String,
    #[serde(flatten)]
    pub validation: ValidationReport,
}

/// Totals across all configured platforms
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlSummary {
    pub total_platforms: usize,
    /// Platforms that produced at least one record
    pub active_platforms: usize,
    pub total_records: usize,
    /// `total_records / active_platforms`, 0 when no platform produced anything
    pub avg_records_per_active_platform: f64,
}

impl CrawlSummary {
    pub fn new(total_platforms: usize, active_platforms: usize, total_records: usize) -> Self {
        let avg_records_per_active_platform = if active_platforms == 0 {
            0.0
        } else {
            total_records as f64 / active_platforms as f64
        };

        Self {
            total_platforms,
            active_platforms,
            total_records,
            avg_records_per_active_platform,
        }
    }
}

/// Report generated at the end of a crawl run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlReport {
    pub crawl_time: String,
    /// SHA-256 of the configuration file the run was started with
    pub config_hash: Option<String>,
    /// Keyed by platform id
    pub platforms: BTreeMap<String, PlatformReport>,
    pub summary: CrawlSummary,
}
