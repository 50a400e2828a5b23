//! Xiaohongshu notes
//!
//! Search results come from the JSON search endpoint (or an initial-state page
//! when the endpoint answers with HTML). Each note carries its own engagement
//! counters, author and topic tags; notes have no price or sales.

use crate::platform::crawler::{search_endpoint, CrawlerContext, PlatformCrawler};
use crate::platform::items::{ItemSource, NoteFeedSource, RawItem};
use crate::record::{FieldValue, Record, DATE_FORMAT};
use crate::ParseError;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// `#topic#` markers inside note text
static TOPIC_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([^#\s]+)#").expect("topic pattern is valid"));

/// Fields holding the note body, in order of preference
const CONTENT_FIELDS: &[&str] = &["desc", "content", "note_card", "title"];

/// Characters of content reused as a title when a note has none
const DERIVED_TITLE_CHARS: usize = 50;

const NOTE_URL_PREFIX: &str = "https://www.xiaohongshu.com/explore/";

/// Unix timestamps above this are in milliseconds
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

pub struct XiaohongshuCrawler {
    context: CrawlerContext,
    items: NoteFeedSource,
}

impl XiaohongshuCrawler {
    pub fn new(context: CrawlerContext) -> Self {
        Self {
            context,
            items: NoteFeedSource::new(),
        }
    }
}

#[async_trait]
impl PlatformCrawler for XiaohongshuCrawler {
    fn context(&self) -> &CrawlerContext {
        &self.context
    }

    fn item_source(&self) -> &dyn ItemSource {
        &self.items
    }

    fn build_search_url(&self, keyword: &str, page: u32) -> crate::Result<Url> {
        let mut url = search_endpoint(&self.context.config)?;
        url.query_pairs_mut()
            .append_pair("keyword", keyword)
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &self.context.config.page_size.to_string())
            .append_pair("sort", "general")
            .append_pair("note_type", "0");
        Ok(url)
    }

    fn parse_item(&self, item: &RawItem) -> Result<Record, ParseError> {
        let RawItem::Json(Value::Object(note)) = item else {
            return Err(ParseError::UnexpectedShape(
                "expected a JSON note object".to_string(),
            ));
        };

        let content = note_content(note);
        let title = match non_empty_str(note.get("display_title")) {
            Some(title) => title.to_string(),
            None => derive_title(&content),
        };
        if title.is_empty() {
            return Err(ParseError::MissingField("title"));
        }
        if content.is_empty() {
            return Err(ParseError::MissingField("content"));
        }

        let mut record = Record::new(self.display_name(), title, content);
        let interact = note.get("interact_info").and_then(Value::as_object);

        record.likes = counter(note, interact, "liked_count", "liked_count");
        record.comments_count = counter(note, interact, "comment_count", "comment_count");
        record.shares = counter(note, interact, "share_count", "shared_count");
        record.tags = note_tags(note, &record.content);
        record.publish_date = Some(publish_date(note.get("time")));
        record.product_type = Some(self.classify(&record.title, &record.content));

        let id = non_empty_str(note.get("id")).or_else(|| non_empty_str(note.get("note_id")));
        record.source_url = id.map(|id| format!("{}{}", NOTE_URL_PREFIX, id));

        if let Some(user) = note.get("user").and_then(Value::as_object) {
            record.author_id = user
                .get("user_id")
                .or_else(|| user.get("userId"))
                .and_then(scalar_string);
            record.author_name = user
                .get("nickname")
                .or_else(|| user.get("nickName"))
                .and_then(scalar_string);
        }

        Ok(record)
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// Strings as-is, numbers in decimal form; anything else is absent
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-empty body field, with markup stripped and whitespace collapsed
fn note_content(note: &Map<String, Value>) -> String {
    let raw = CONTENT_FIELDS.iter().find_map(|&field| match note.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        Some(Value::Object(card)) => non_empty_str(card.get("text")),
        _ => None,
    });

    match raw {
        Some(raw) => {
            let stripped = HTML_TAG.replace_all(raw, "");
            WHITESPACE_RUN
                .replace_all(&stripped, " ")
                .trim()
                .to_string()
        }
        None => String::new(),
    }
}

fn derive_title(content: &str) -> String {
    if content.chars().count() > DERIVED_TITLE_CHARS {
        let head: String = content.chars().take(DERIVED_TITLE_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}

/// Engagement counter from the note itself or its `interact_info` block
fn counter(
    note: &Map<String, Value>,
    interact: Option<&Map<String, Value>>,
    top_level: &str,
    nested: &str,
) -> Option<FieldValue> {
    note.get(top_level)
        .or_else(|| interact.and_then(|i| i.get(nested)))
        .and_then(field_value)
}

fn field_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(FieldValue::Int)
            .or_else(|| n.as_f64().map(FieldValue::Float)),
        Value::String(s) if !s.is_empty() => Some(FieldValue::Text(s.clone())),
        _ => None,
    }
}

/// Names from `tag_list` plus `#topic#` markers found in the content
fn note_tags(note: &Map<String, Value>, content: &str) -> std::collections::BTreeSet<String> {
    let listed = note
        .get("tag_list")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|tag| match tag {
            Value::String(name) => Some(name.clone()),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(String::from),
            _ => None,
        });

    let topics = TOPIC_TAG
        .captures_iter(content)
        .map(|caps| caps[1].to_string());

    listed.chain(topics).filter(|t| !t.is_empty()).collect()
}

/// Publish date from a unix timestamp or a date-prefixed string, else today
fn publish_date(value: Option<&Value>) -> String {
    let today = || Local::now().format(DATE_FORMAT).to_string();

    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ts| {
                let (secs, nanos) = if ts > MILLIS_THRESHOLD {
                    (ts / 1000, (ts % 1000) as u32 * 1_000_000)
                } else {
                    (ts, 0)
                };
                DateTime::from_timestamp(secs, nanos)
            })
            .map(|dt| dt.with_timezone(&Local).format(DATE_FORMAT).to_string())
            .unwrap_or_else(today),
        Some(Value::String(s)) if !s.is_empty() => s.chars().take(10).collect(),
        _ => today(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{defaults, Config, FetchConfig};
    use crate::fetch::{Headers, RawResponse, RetryingRequester, Transport};
    use crate::platform::category::CategoryTable;
    use crate::TransportError;
    use serde_json::json;
    use std::sync::Arc;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn get(&self, _url: &str, _headers: &Headers) -> Result<RawResponse, TransportError> {
            Err(TransportError::Other("offline".to_string()))
        }
    }

    fn crawler() -> XiaohongshuCrawler {
        XiaohongshuCrawler::new(CrawlerContext {
            config: defaults::xiaohongshu(),
            requester: RetryingRequester::with_seed(
                Arc::new(NoTransport),
                FetchConfig::default(),
                Headers::new(),
                1,
            ),
            categories: CategoryTable::from_config(&Config::default()),
        })
    }

    fn parse(note: Value) -> Result<Record, ParseError> {
        crawler().parse_item(&RawItem::Json(note))
    }

    #[test]
    fn test_search_url_params() {
        let url = crawler().build_search_url("AI音箱评测", 2).unwrap();
        assert_eq!(url.path(), "/search_result");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("keyword".to_string(), "AI音箱评测".to_string()),
                ("page".to_string(), "2".to_string()),
                ("page_size".to_string(), "20".to_string()),
                ("sort".to_string(), "general".to_string()),
                ("note_type".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_complete_note() {
        let record = parse(json!({
            "id": "64f0c0",
            "display_title": "天猫精灵开箱",
            "desc": "<p>用了一周的 #AI音箱# 体验</p>\n很好",
            "interact_info": {"liked_count": "1.2万", "comment_count": 88},
            "tag_list": [{"name": "智能家居"}, "数码"],
            "user": {"user_id": 123, "nickname": "小红"},
            "time": 1_700_000_000
        }))
        .unwrap();

        assert_eq!(record.platform, "小红书");
        assert_eq!(record.title, "天猫精灵开箱");
        assert_eq!(record.content, "用了一周的 #AI音箱# 体验 很好");
        assert_eq!(record.likes, Some(FieldValue::from("1.2万")));
        assert_eq!(record.comments_count, Some(FieldValue::Int(88)));
        assert!(record.shares.is_none());
        assert!(record.price.is_none());
        let tags: Vec<&str> = record.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["AI音箱", "数码", "智能家居"]);
        assert_eq!(
            record.source_url.as_deref(),
            Some("https://www.xiaohongshu.com/explore/64f0c0")
        );
        assert_eq!(record.author_id.as_deref(), Some("123"));
        assert_eq!(record.author_name.as_deref(), Some("小红"));
        assert_eq!(record.product_type.as_deref(), Some("AI音箱"));
        assert_eq!(record.publish_date.as_ref().map(String::len), Some(10));
    }

    #[test]
    fn test_top_level_counters_win() {
        let record = parse(json!({
            "display_title": "标题",
            "desc": "内容",
            "liked_count": 5,
            "interact_info": {"liked_count": 9}
        }))
        .unwrap();
        assert_eq!(record.likes, Some(FieldValue::Int(5)));
    }

    #[test]
    fn test_title_derived_from_long_content() {
        let content = "智".repeat(60);
        let record = parse(json!({"desc": content})).unwrap();
        assert_eq!(record.title.chars().count(), 53);
        assert!(record.title.ends_with("..."));

        let record = parse(json!({"desc": "短内容"})).unwrap();
        assert_eq!(record.title, "短内容");
    }

    #[test]
    fn test_content_from_note_card_text() {
        let record = parse(json!({
            "display_title": "AI陪伴机器人",
            "note_card": {"text": "每天陪我聊天"}
        }))
        .unwrap();
        assert_eq!(record.content, "每天陪我聊天");
    }

    #[test]
    fn test_publish_date_string_prefix() {
        let record = parse(json!({
            "display_title": "标题",
            "desc": "内容",
            "time": "2024-03-15 10:20:30"
        }))
        .unwrap();
        assert_eq!(record.publish_date.as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn test_empty_note_fails() {
        assert!(matches!(
            parse(json!({"id": "x"})),
            Err(ParseError::MissingField("title"))
        ));
        assert!(matches!(
            parse(json!({"display_title": "只有标题"})),
            Err(ParseError::MissingField("content"))
        ));
    }

    #[test]
    fn test_non_object_item_rejected() {
        assert!(matches!(
            parse(json!(["not", "a", "note"])),
            Err(ParseError::UnexpectedShape(_))
        ));
        assert!(matches!(
            crawler().parse_item(&RawItem::Html("<div></div>".to_string())),
            Err(ParseError::UnexpectedShape(_))
        ));
    }
}
