//! Page-level item extraction
//!
//! An [`ItemSource`] turns one fetched page into discrete [`RawItem`]s. Crawler
//! variants only ever see one item at a time and never inspect the page.
//!
//! Two sources exist:
//! - [`HtmlItemSource`]: CSS selectors tried in order, first non-empty wins
//! - [`NoteFeedSource`]: JSON search payloads, or an HTML page carrying a
//!   `window.__INITIAL_STATE__` script

use crate::fetch::RawResponse;
use crate::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};

static UNDEFINED_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bundefined\b").expect("undefined pattern is valid"));

const INITIAL_STATE_MARKER: &str = "window.__INITIAL_STATE__";

/// One opaque item as handed to a crawler's `parse_item`
#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    /// Outer HTML of a single listing element
    Html(String),
    /// A single decoded JSON object
    Json(Value),
}

/// Splits a page payload into raw items
pub trait ItemSource: Send + Sync {
    /// Returns the page's items; an empty list means the page had none
    fn extract_items(&self, response: &RawResponse) -> Result<Vec<RawItem>, ParseError>;
}

/// Extracts listing elements from an HTML page
#[derive(Debug)]
pub struct HtmlItemSource {
    selectors: Vec<Selector>,
}

impl HtmlItemSource {
    /// Builds a source from selectors tried in order
    ///
    /// # Arguments
    ///
    /// * `selectors` - CSS selectors; the first one matching anything is used
    ///
    /// # Returns
    ///
    /// * `Ok(HtmlItemSource)` - All selectors parsed
    /// * `Err(ParseError::Selector)` - A selector is malformed
    pub fn new(selectors: &[&str]) -> Result<Self, ParseError> {
        let selectors = selectors
            .iter()
            .map(|s| Selector::parse(s).map_err(|e| ParseError::Selector(format!("{}: {:?}", s, e))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { selectors })
    }
}

impl ItemSource for HtmlItemSource {
    fn extract_items(&self, response: &RawResponse) -> Result<Vec<RawItem>, ParseError> {
        let document = Html::parse_document(&response.body);

        for selector in &self.selectors {
            let items: Vec<RawItem> = document
                .select(selector)
                .map(|element| RawItem::Html(element.html()))
                .collect();
            if !items.is_empty() {
                return Ok(items);
            }
        }

        Ok(Vec::new())
    }
}

/// Extracts note objects from search API responses and initial-state pages
///
/// - A JSON body yields `data.notes`, or `data` itself when it is an array
/// - An HTML body is scanned for the `window.__INITIAL_STATE__` script; its
///   object literal is decoded with `undefined` read as `null` and items come
///   from `search.notes` or `search.feeds`
///
/// Items wrapped in `note_card` / `noteCard` are unwrapped, keeping the outer
/// `id` when the card has none.
#[derive(Debug, Default)]
pub struct NoteFeedSource;

impl NoteFeedSource {
    pub fn new() -> Self {
        Self
    }

    fn from_json_body(&self, body: &str) -> Result<Vec<RawItem>, ParseError> {
        let payload: Value =
            serde_json::from_str(body).map_err(|e| ParseError::Json(e.to_string()))?;

        let notes = match payload.get("data") {
            Some(data) => match data.get("notes") {
                Some(notes) => as_item_array(notes),
                None => as_item_array(data),
            },
            None => None,
        };

        Ok(notes.map(collect_notes).unwrap_or_default())
    }

    fn from_initial_state(&self, body: &str) -> Result<Vec<RawItem>, ParseError> {
        let Some(blob) = initial_state_blob(body) else {
            return Ok(Vec::new());
        };

        let normalized = UNDEFINED_TOKEN.replace_all(&blob, "null");
        let state: Value =
            serde_json::from_str(&normalized).map_err(|e| ParseError::Json(e.to_string()))?;

        let search = state.get("search");
        let notes = search
            .and_then(|s| s.get("notes"))
            .and_then(as_item_array)
            .filter(|notes| !notes.is_empty())
            .or_else(|| search.and_then(|s| s.get("feeds")).and_then(as_item_array));

        Ok(notes.map(collect_notes).unwrap_or_default())
    }
}

impl ItemSource for NoteFeedSource {
    fn extract_items(&self, response: &RawResponse) -> Result<Vec<RawItem>, ParseError> {
        let body = response.body.trim_start();
        if response.is_json() || body.starts_with('{') {
            self.from_json_body(body)
        } else {
            self.from_initial_state(body)
        }
    }
}

/// Object literal assigned to `window.__INITIAL_STATE__`, if the page has one
fn initial_state_blob(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").ok()?;

    document
        .select(&selector)
        .map(|script| script.text().collect::<String>())
        .find(|text| text.contains(INITIAL_STATE_MARKER))
        .and_then(|text| {
            let start = text.find('{')?;
            let end = text.rfind('}')?;
            (start < end).then(|| text[start..=end].to_string())
        })
}

/// Reads an item array, looking through reactive `_rawValue` / `_value` wrappers
fn as_item_array(value: &Value) -> Option<&[Value]> {
    match value {
        Value::Array(items) => Some(items.as_slice()),
        Value::Object(map) => map
            .get("_rawValue")
            .or_else(|| map.get("_value"))
            .and_then(Value::as_array)
            .map(Vec::as_slice),
        _ => None,
    }
}

fn collect_notes(items: &[Value]) -> Vec<RawItem> {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|item| RawItem::Json(Value::Object(unwrap_note_card(item))))
        .collect()
}

fn unwrap_note_card(item: &Map<String, Value>) -> Map<String, Value> {
    let card = item
        .get("note_card")
        .or_else(|| item.get("noteCard"))
        .and_then(Value::as_object);

    match card {
        Some(card) => {
            let mut note = card.clone();
            if !note.contains_key("id") {
                if let Some(id) = item.get("id") {
                    note.insert("id".to_string(), id.clone());
                }
            }
            note
        }
        None => item.clone(),
    }
}
