//! Canonical record schema
//!
//! Every platform variant produces [`Record`] values. Optional fields stay
//! `None` (an explicit absent marker, never zero) until the cleaner has run.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Fields every record must carry with a non-empty value
pub const REQUIRED_FIELDS: &[&str] = &["platform", "title", "content"];

/// Fields that may be absent
pub const OPTIONAL_FIELDS: &[&str] = &[
    "product_type",
    "tags",
    "likes",
    "comments_count",
    "shares",
    "sales",
    "price",
    "publish_date",
    "source_url",
    "crawl_time",
    "shop_name",
    "location",
    "author_id",
    "author_name",
];

/// Format used for `crawl_time`
pub const CRAWL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format used for `publish_date`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A loosely typed numeric field as it arrives from a platform
///
/// Platforms report counts and prices as integers, floats, or display text
/// such as `"5万+人付款"`. The cleaner folds all of these into `Int` (counts)
/// or `Float` (price).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value, `None` for text
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Borrowed view of a single record field, used by the validator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    Text(&'a str),
    Value(&'a FieldValue),
    Tags(&'a BTreeSet<String>),
}

impl FieldRef<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Value(v) => v.is_empty(),
            Self::Tags(t) => t.is_empty(),
        }
    }
}

/// One harvested listing or post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub platform: String,
    pub title: String,
    pub content: String,
    pub product_type: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub likes: Option<FieldValue>,
    pub comments_count: Option<FieldValue>,
    pub shares: Option<FieldValue>,
    pub sales: Option<FieldValue>,
    pub price: Option<FieldValue>,
    pub publish_date: Option<String>,
    pub source_url: Option<String>,
    pub crawl_time: Option<String>,
    pub shop_name: Option<String>,
    pub location: Option<String>,
    pub author_id: Option<String>,
    pub author_name: Option<String>,
}

impl Record {
    /// Creates a record with the required fields set and everything else absent
    pub fn new(
        platform: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// Sets `crawl_time` to the current local time
    pub fn stamp_crawl_time(&mut self) {
        self.crawl_time = Some(Local::now().format(CRAWL_TIME_FORMAT).to_string());
    }

    /// Looks up a field by its schema name
    ///
    /// Returns `None` for absent optional fields and for unknown names.
    /// Required text fields are always returned, even when empty.
    pub fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "platform" => Some(FieldRef::Text(&self.platform)),
            "title" => Some(FieldRef::Text(&self.title)),
            "content" => Some(FieldRef::Text(&self.content)),
            "product_type" => self.product_type.as_deref().map(FieldRef::Text),
            "tags" if self.tags.is_empty() => None,
            "tags" => Some(FieldRef::Tags(&self.tags)),
            "likes" => self.likes.as_ref().map(FieldRef::Value),
            "comments_count" => self.comments_count.as_ref().map(FieldRef::Value),
            "shares" => self.shares.as_ref().map(FieldRef::Value),
            "sales" => self.sales.as_ref().map(FieldRef::Value),
            "price" => self.price.as_ref().map(FieldRef::Value),
            "publish_date" => text_field(&self.publish_date),
            "source_url" => text_field(&self.source_url),
            "crawl_time" => text_field(&self.crawl_time),
            "shop_name" => text_field(&self.shop_name),
            "location" => text_field(&self.location),
            "author_id" => text_field(&self.author_id),
            "author_name" => text_field(&self.author_name),
            _ => None,
        }
    }

    /// True when the named field is present and non-empty
    pub fn has_value(&self, name: &str) -> bool {
        self.field(name).is_some_and(|f| !f.is_empty())
    }
}

fn text_field(value: &Option<String>) -> Option<FieldRef<'_>> {
    value.as_deref().map(FieldRef::Text)
}
