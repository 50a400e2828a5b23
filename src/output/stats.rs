//! Human-readable crawl report
//!
//! Formats a [`CrawlReport`] for the terminal: run totals first, then one block
//! per platform with its validity rate and most frequent error categories.

use crate::orchestrator::CrawlReport;

/// Error categories listed per platform
const TOP_ERRORS: usize = 3;

/// Formats a crawl report as plain text, one line per entry
pub fn format_report(report: &CrawlReport) -> String {
    let rule = "=".repeat(60);
    let summary = &report.summary;

    let mut lines = vec![
        rule.clone(),
        "Listing harvest report".to_string(),
        rule.clone(),
        format!("Crawl time: {}", report.crawl_time),
    ];
    if let Some(hash) = &report.config_hash {
        lines.push(format!("Config hash: {}", hash));
    }
    lines.push(format!("Platforms: {}", summary.total_platforms));
    lines.push(format!("Active platforms: {}", summary.active_platforms));
    lines.push(format!("Total records: {}", summary.total_records));
    lines.push(format!(
        "Average per active platform: {:.1}",
        summary.avg_records_per_active_platform
    ));

    lines.push(String::new());
    lines.push("Per platform:".to_string());
    lines.push("-".repeat(60));
    for (id, platform) in &report.platforms {
        let validation = &platform.validation;
        lines.push(format!("{} ({}):", platform.platform_name, id));
        lines.push(format!("  Total: {}", validation.total));
        lines.push(format!("  Valid: {}", validation.valid));
        lines.push(format!("  Validity rate: {:.1}%", validation.validity_rate()));

        let top: Vec<String> = validation
            .top_errors(TOP_ERRORS)
            .iter()
            .map(|(category, count)| format!("{} ({})", category, count))
            .collect();
        if !top.is_empty() {
            lines.push(format!("  Top errors: {}", top.join(", ")));
        }
    }
    lines.push(rule);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Prints a crawl report to stdout
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{CrawlSummary, PlatformReport};
    use crate::quality::ValidationReport;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_report_lists_platforms_and_errors() {
        let mut error_histogram = BTreeMap::new();
        error_histogram.insert("price below minimum".to_string(), 2);
        error_histogram.insert("missing required field".to_string(), 5);

        let mut platforms = BTreeMap::new();
        platforms.insert(
            "taobao".to_string(),
            PlatformReport {
                platform_name: "淘宝".to_string(),
                validation: ValidationReport {
                    total: 10,
                    valid: 8,
                    invalid: 2,
                    error_histogram,
                    field_completeness: BTreeMap::new(),
                },
            },
        );

        let report = CrawlReport {
            crawl_time: "2024-01-01 12:00:00".to_string(),
            config_hash: None,
            platforms,
            summary: CrawlSummary::new(3, 1, 10),
        };

        let text = format_report(&report);
        assert!(text.contains("Active platforms: 1"));
        assert!(text.contains("Average per active platform: 10.0"));
        assert!(text.contains("淘宝 (taobao):"));
        assert!(text.contains("Validity rate: 80.0%"));
        assert!(text.contains("Top errors: missing required field (5), price below minimum (2)"));
        assert!(!text.contains("Config hash"));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "Listing harvest report");
        assert_eq!(lines[3], "Crawl time: 2024-01-01 12:00:00");
        assert_eq!(lines[4], "Platforms: 3");
        assert!(text.ends_with(&format!("{}\n", "=".repeat(60))));
    }

    #[test]
    fn test_format_report_without_platforms() {
        let report = CrawlReport {
            crawl_time: "2024-01-01 12:00:00".to_string(),
            config_hash: Some("abc123".to_string()),
            platforms: BTreeMap::new(),
            summary: CrawlSummary::new(0, 0, 0),
        };

        let text = format_report(&report);
        assert!(text.contains("Config hash: abc123"));
        assert!(text.contains("Average per active platform: 0.0"));
        assert!(!text.contains("Top errors"));
    }
}
