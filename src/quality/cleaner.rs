//! Deterministic record normalization
//!
//! Cleaning is idempotent: `clean(clean(r)) == clean(r)`. Every step maps its
//! own output to itself, and numeric fields leave the cleaner in their final
//! shape (`Int` for counts, `Float` for price).

use crate::config::Config;
use crate::quality::validator::RecordValidator;
use crate::record::{FieldValue, Record};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Characters outside CJK ideographs, ASCII digits and letters, fullwidth
/// forms, CJK punctuation and whitespace
static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\u{4e00}-\u{9fff}0-9A-Za-z\u{ff01}-\u{ff5e}\u{3000}-\u{303f}\s]")
        .expect("allow-list pattern is valid")
});

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static PRICE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.?\d*").expect("price pattern is valid"));

/// A number directly followed by a magnitude suffix, e.g. `5万` or `2.5k`
static UNIT_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)(?:\.(\d+))?\s*([万千kK])").expect("unit count pattern is valid")
});

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit pattern is valid"));

/// Qualifiers stripped from count text, longest first
const COUNT_QUALIFIERS: &[&str] = &["人付款", "人", "+"];

/// Drops disallowed characters, then collapses whitespace and trims
///
/// Filtering happens first so that removing a character can never leave
/// behind a whitespace run that a second pass would collapse.
pub fn clean_text(text: &str) -> String {
    let filtered = DISALLOWED_CHARS.replace_all(text, "");
    WHITESPACE_RUN
        .replace_all(&filtered, " ")
        .trim()
        .to_string()
}

/// Normalizes a price to a float, `0.0` when nothing usable is found
pub fn clean_price(value: Option<&FieldValue>) -> f64 {
    let price = match value {
        None => 0.0,
        Some(FieldValue::Int(i)) => *i as f64,
        Some(FieldValue::Float(f)) => *f,
        Some(FieldValue::Text(text)) => {
            let text = text.replace(',', "");
            PRICE_TOKEN
                .find(&text)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        }
    };

    if price.is_finite() {
        price
    } else {
        0.0
    }
}

/// Normalizes an engagement or sales count to an integer, `0` on failure
///
/// Text counts understand the `万` (10 000), `千`, `k` and `K` (1 000)
/// suffixes, including a decimal mantissa: `"2.5k"` is 2500.
pub fn clean_count(value: Option<&FieldValue>) -> i64 {
    match value {
        None => 0,
        Some(FieldValue::Int(i)) => *i,
        // `as` truncates toward zero and maps NaN to 0
        Some(FieldValue::Float(f)) => *f as i64,
        Some(FieldValue::Text(text)) => parse_count_text(text),
    }
}

fn parse_count_text(text: &str) -> i64 {
    let text = text.replace(',', "");

    if let Some(caps) = UNIT_COUNT.captures(&text) {
        let multiplier: i64 = match &caps[3] {
            "万" => 10_000,
            _ => 1_000,
        };
        let whole = caps[1].parse::<i64>().ok();
        let fraction = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        return whole
            .and_then(|w| w.checked_mul(multiplier))
            .and_then(|w| w.checked_add(scale_fraction(fraction, multiplier)))
            .unwrap_or(0);
    }

    let mut stripped = text;
    for qualifier in COUNT_QUALIFIERS {
        stripped = stripped.replace(qualifier, "");
    }
    DIGIT_RUN
        .find(&stripped)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(0)
}

/// Integer value of `0.<digits> * multiplier`, truncated
fn scale_fraction(digits: &str, multiplier: i64) -> i64 {
    let mut scaled = 0;
    let mut place = multiplier;
    for digit in digits.chars().filter_map(|c| c.to_digit(10)) {
        place /= 10;
        if place == 0 {
            break;
        }
        scaled += i64::from(digit) * place;
    }
    scaled
}

/// Normalizes records field by field
#[derive(Debug, Clone)]
pub struct RecordCleaner {
    known_categories: BTreeSet<String>,
    default_category: String,
}

impl RecordCleaner {
    /// Creates a cleaner accepting `categories` plus the default category
    pub fn new<I, S>(categories: I, default_category: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let default_category = default_category.into();
        let mut known_categories: BTreeSet<String> =
            categories.into_iter().map(Into::into).collect();
        known_categories.insert(default_category.clone());
        Self {
            known_categories,
            default_category,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.categories.iter().map(|c| c.name.clone()),
            config.default_category.clone(),
        )
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    /// Returns a cleaned copy of `record`
    pub fn clean(&self, record: &Record) -> Record {
        let mut cleaned = record.clone();

        cleaned.title = clean_text(&record.title);
        cleaned.content = clean_text(&record.content);
        cleaned.shop_name = clean_optional_text(&record.shop_name);
        cleaned.location = clean_optional_text(&record.location);
        cleaned.author_name = clean_optional_text(&record.author_name);

        cleaned.price = Some(FieldValue::Float(clean_price(record.price.as_ref())));
        cleaned.sales = Some(FieldValue::Int(clean_count(record.sales.as_ref())));
        cleaned.likes = Some(FieldValue::Int(clean_count(record.likes.as_ref())));
        cleaned.comments_count = Some(FieldValue::Int(clean_count(
            record.comments_count.as_ref(),
        )));
        cleaned.shares = Some(FieldValue::Int(clean_count(record.shares.as_ref())));

        cleaned.product_type = match &record.product_type {
            Some(category) if self.known_categories.contains(category) => Some(category.clone()),
            _ => Some(self.default_category.clone()),
        };

        cleaned.tags = record
            .tags
            .iter()
            .map(|tag| clean_text(tag))
            .filter(|tag| !tag.is_empty())
            .collect();

        cleaned
    }

    /// Cleans every record and keeps only those that validate afterwards
    pub fn clean_dataset(&self, records: &[Record], validator: &RecordValidator) -> Vec<Record> {
        let cleaned: Vec<Record> = records
            .iter()
            .map(|record| self.clean(record))
            .filter(|record| validator.is_valid(record))
            .collect();

        if cleaned.len() < records.len() {
            tracing::debug!(
                "Dropped {} of {} records that failed validation after cleaning",
                records.len() - cleaned.len(),
                records.len()
            );
        }
        cleaned
    }
}

fn clean_optional_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(clean_text)
        .filter(|text| !text.is_empty())
}
