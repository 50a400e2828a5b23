//! Quality pipeline
//!
//! This module contains:
//! - Declarative field rules ([`RuleSet`])
//! - The [`RecordValidator`] and the [`ValidationReport`] it produces
//! - The idempotent [`RecordCleaner`]

mod cleaner;
mod report;
mod rules;
mod validator;

pub use cleaner::{clean_count, clean_price, clean_text, RecordCleaner};
pub use report::ValidationReport;
pub use rules::{RuleSet, ValidationRule};
pub use validator::{RecordValidator, ValidationError};
