//! Rule-driven record validation
//!
//! Validation never fails with an `Err` that aborts work: violations are
//! returned as data, one [`ValidationError`] per problem.

use crate::quality::report::ValidationReport;
use crate::quality::rules::{RuleSet, ValidationRule};
use crate::record::{FieldRef, Record, OPTIONAL_FIELDS, REQUIRED_FIELDS};
use std::collections::BTreeMap;
use thiserror::Error;

/// A single field-level violation
///
/// The rendered message is `"<category>: <detail>"`; the text before the first
/// `:` is the bucket used by the dataset histogram.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("{field} too short: {length} < {min} characters")]
    TooShort {
        field: String,
        length: usize,
        min: usize,
    },

    #[error("{field} too long: {length} > {max} characters")]
    TooLong {
        field: String,
        length: usize,
        max: usize,
    },

    #[error("{field} format mismatch: matches none of {patterns} required pattern(s)")]
    PatternMismatch { field: String, patterns: usize },

    #[error("{field} below minimum: {value} < {min}")]
    BelowMinimum { field: String, value: f64, min: f64 },

    #[error("{field} above maximum: {value} > {max}")]
    AboveMaximum { field: String, value: f64, max: f64 },
}

impl ValidationError {
    /// Histogram bucket: the message text before its first `:`
    pub fn category(&self) -> String {
        let message = self.to_string();
        match message.split_once(':') {
            Some((prefix, _)) => prefix.to_string(),
            None => message,
        }
    }
}

/// Validates records against a [`RuleSet`]
#[derive(Debug, Clone)]
pub struct RecordValidator {
    rules: RuleSet,
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new(RuleSet::standard())
    }
}

impl RecordValidator {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Checks one field value against its rule
    ///
    /// Text rules check length bounds first, then require at least one
    /// pattern match. Numeric rules check inclusive bounds.
    pub fn validate_field(&self, name: &str, value: FieldRef<'_>) -> Result<(), ValidationError> {
        let Some(rule) = self.rules.get(name) else {
            return Ok(());
        };

        match (rule, value) {
            (
                ValidationRule::Text {
                    min_length,
                    max_length,
                    patterns,
                },
                FieldRef::Text(text),
            ) => {
                let length = text.chars().count();
                if let Some(min) = *min_length {
                    if length < min {
                        return Err(ValidationError::TooShort {
                            field: name.to_string(),
                            length,
                            min,
                        });
                    }
                }
                if let Some(max) = *max_length {
                    if length > max {
                        return Err(ValidationError::TooLong {
                            field: name.to_string(),
                            length,
                            max,
                        });
                    }
                }
                if !patterns.is_empty() && !patterns.iter().any(|p| p.is_match(text)) {
                    return Err(ValidationError::PatternMismatch {
                        field: name.to_string(),
                        patterns: patterns.len(),
                    });
                }
                Ok(())
            }
            (ValidationRule::Numeric { min, max }, FieldRef::Value(v)) => {
                let Some(value) = v.as_number() else {
                    return Ok(());
                };
                if let Some(min) = *min {
                    if value < min {
                        return Err(ValidationError::BelowMinimum {
                            field: name.to_string(),
                            value,
                            min,
                        });
                    }
                }
                if let Some(max) = *max {
                    if value > max {
                        return Err(ValidationError::AboveMaximum {
                            field: name.to_string(),
                            value,
                            max,
                        });
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Validates every field of a record
    ///
    /// Each missing required field contributes its own error; nothing is
    /// short-circuited. Present optional fields are rule-checked too.
    pub fn validate_record(&self, record: &Record) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for &field in REQUIRED_FIELDS {
            match record.field(field) {
                Some(value) if !value.is_empty() => {
                    if let Err(e) = self.validate_field(field, value) {
                        errors.push(e);
                    }
                }
                _ => errors.push(ValidationError::MissingField {
                    field: field.to_string(),
                }),
            }
        }

        for &field in OPTIONAL_FIELDS {
            if let Some(value) = record.field(field) {
                if let Err(e) = self.validate_field(field, value) {
                    errors.push(e);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_valid(&self, record: &Record) -> bool {
        self.validate_record(record).is_ok()
    }

    /// Builds a fresh quality report for a batch of records
    pub fn validate_dataset(&self, records: &[Record]) -> ValidationReport {
        let mut valid = 0;
        let mut error_histogram: BTreeMap<String, usize> = BTreeMap::new();

        for record in records {
            match self.validate_record(record) {
                Ok(()) => valid += 1,
                Err(errors) => {
                    for error in errors {
                        *error_histogram.entry(error.category()).or_insert(0) += 1;
                    }
                }
            }
        }

        ValidationReport {
            total: records.len(),
            valid,
            invalid: records.len() - valid,
            error_histogram,
            field_completeness: field_completeness(records),
        }
    }
}

/// Percentage of records with each schema field present and non-empty
fn field_completeness(records: &[Record]) -> BTreeMap<String, f64> {
    if records.is_empty() {
        return BTreeMap::new();
    }

    let total = records.len() as f64;
    REQUIRED_FIELDS
        .iter()
        .chain(OPTIONAL_FIELDS)
        .map(|&field| {
            let present = records.iter().filter(|r| r.has_value(field)).count();
            (field.to_string(), present as f64 / total * 100.0)
        })
        .collect()
}
