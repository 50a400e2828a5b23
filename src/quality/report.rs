use serde::Serialize;
use std::collections::BTreeMap;

/// Quality summary of one record batch
///
/// Produced fresh by [`RecordValidator::validate_dataset`] and never mutated
/// afterwards.
///
/// [`RecordValidator::validate_dataset`]: crate::quality::RecordValidator::validate_dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,

    /// Error count per category prefix
    pub error_histogram: BTreeMap<String, usize>,

    /// Per-field completion rate, as a percentage of `total`
    pub field_completeness: BTreeMap<String, f64>,
}

impl ValidationReport {
    /// Share of valid records, as a percentage
    pub fn validity_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.valid as f64 / self.total as f64 * 100.0
        }
    }

    /// Error categories, most frequent first
    pub fn top_errors(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut errors: Vec<_> = self
            .error_histogram
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        errors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        errors.truncate(limit);
        errors
    }
}
