//! Declarative, field-keyed validation rules

use crate::config::ValidationConfig;
use crate::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// At least one CJK unified ideograph
static CJK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{4e00}-\u{9fff}]").expect("CJK pattern is valid"));

/// Constraint attached to one field
///
/// A text rule ignores numeric values and a numeric rule ignores text values:
/// each only constrains the shape it describes.
#[derive(Debug, Clone)]
pub enum ValidationRule {
    Text {
        min_length: Option<usize>,
        max_length: Option<usize>,
        /// The value must match at least one of these; empty means no constraint
        patterns: Vec<Regex>,
    },
    Numeric {
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl ValidationRule {
    pub fn length(min: usize, max: usize) -> Self {
        Self::Text {
            min_length: Some(min),
            max_length: Some(max),
            patterns: Vec::new(),
        }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Self::Numeric {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Adds required patterns to a text rule; no-op on numeric rules
    pub fn with_patterns(mut self, extra: Vec<Regex>) -> Self {
        if let Self::Text { patterns, .. } = &mut self {
            patterns.extend(extra);
        }
        self
    }
}

/// Rules keyed by field name; a field without a rule is always valid
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: BTreeMap<String, ValidationRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, field: impl Into<String>, rule: ValidationRule) -> Self {
        self.rules.insert(field.into(), rule);
        self
    }

    pub fn get(&self, field: &str) -> Option<&ValidationRule> {
        self.rules.get(field)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The standard listing rules with the default bounds
    pub fn standard() -> Self {
        let defaults = ValidationConfig::default();
        Self::with_bounds(&defaults, vec![CJK_PATTERN.clone()])
    }

    /// Builds the standard listing rules from configured bounds
    pub fn from_config(config: &ValidationConfig) -> Result<Self, ConfigError> {
        let patterns = config
            .title_patterns
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_bounds(config, patterns))
    }

    fn with_bounds(config: &ValidationConfig, title_patterns: Vec<Regex>) -> Self {
        Self::new()
            .with_rule(
                "title",
                ValidationRule::length(config.title_min_length, config.title_max_length)
                    .with_patterns(title_patterns),
            )
            .with_rule(
                "content",
                ValidationRule::length(config.content_min_length, config.content_max_length),
            )
            .with_rule("price", ValidationRule::range(0.0, config.max_price))
            .with_rule("sales", ValidationRule::range(0.0, config.max_sales))
            .with_rule("likes", ValidationRule::range(0.0, config.max_likes))
            .with_rule(
                "comments_count",
                ValidationRule::range(0.0, config.max_comments),
            )
    }
}
