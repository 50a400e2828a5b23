//! The platform crawler contract
//!
//! A variant supplies the platform-specific pieces (search URL, item parsing)
//! and inherits the paginated search and keyword loop, which carry the failure
//! isolation rules:
//! - a failed page fetch or an unreadable page is logged and skipped
//! - an item that fails to parse is logged and skipped
//! - a keyword whose search fails is logged and skipped

use crate::config::PlatformConfig;
use crate::fetch::{FetchOptions, RetryingRequester};
use crate::platform::category::CategoryTable;
use crate::platform::items::{ItemSource, RawItem};
use crate::record::{Record, REQUIRED_FIELDS};
use crate::ParseError;
use async_trait::async_trait;
use serde::Serialize;
use url::Url;

/// Read-only state shared by every crawler variant
pub struct CrawlerContext {
    pub config: PlatformConfig,
    pub requester: RetryingRequester,
    pub categories: CategoryTable,
}

/// Summary of one crawler's output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlStats {
    pub platform: String,
    pub total: usize,
    /// Records with every required field present
    pub valid: usize,
    /// `valid / total` as a percentage, 0 for an empty batch
    pub validity_rate: f64,
}

#[async_trait]
pub trait PlatformCrawler: Send + Sync {
    fn context(&self) -> &CrawlerContext;

    fn item_source(&self) -> &dyn ItemSource;

    /// Search URL for one page (1-based) of one keyword
    fn build_search_url(&self, keyword: &str, page: u32) -> crate::Result<Url>;

    /// Turns one raw item into a record
    fn parse_item(&self, item: &RawItem) -> Result<Record, ParseError>;

    fn config(&self) -> &PlatformConfig {
        &self.context().config
    }

    fn id(&self) -> &str {
        &self.context().config.id
    }

    fn display_name(&self) -> &str {
        &self.context().config.name
    }

    fn keywords(&self) -> &[String] {
        &self.context().config.keywords
    }

    fn classify(&self, title: &str, content: &str) -> String {
        self.context().categories.classify(title, content)
    }

    /// Crawls up to `max_pages` result pages for one keyword
    ///
    /// Page-level and item-level failures never abort the loop; only a search
    /// URL that cannot be built fails the whole keyword.
    async fn search(&self, keyword: &str, max_pages: u32) -> crate::Result<Vec<Record>> {
        let mut records = Vec::new();
        tracing::info!("Searching {} for '{}'", self.display_name(), keyword);

        for page in 1..=max_pages {
            let url = self.build_search_url(keyword, page)?;
            tracing::debug!("Fetching page {} of '{}': {}", page, keyword, url);

            match self
                .context()
                .requester
                .fetch(url.as_str(), &FetchOptions::default())
                .await
            {
                Err(e) => {
                    tracing::warn!("Skipping page {} of '{}': {}", page, keyword, e);
                }
                Ok(response) => match self.item_source().extract_items(&response) {
                    Err(e) => {
                        tracing::warn!("Unreadable page {} of '{}': {}", page, keyword, e);
                    }
                    Ok(items) if items.is_empty() => {
                        tracing::warn!("No items found on page {} of '{}'", page, keyword);
                    }
                    Ok(items) => {
                        let found = items.len();
                        let before = records.len();
                        for item in &items {
                            match self.parse_item(item) {
                                Ok(mut record) => {
                                    record.stamp_crawl_time();
                                    records.push(record);
                                }
                                Err(e) => tracing::warn!("Skipping item: {}", e),
                            }
                        }
                        tracing::info!(
                            "Page {} of '{}': parsed {} of {} items",
                            page,
                            keyword,
                            records.len() - before,
                            found
                        );
                    }
                },
            }

            if page < max_pages {
                tokio::time::sleep(self.config().page_delay()).await;
            }
        }

        tracing::info!(
            "Search for '{}' finished with {} records",
            keyword,
            records.len()
        );
        Ok(records)
    }

    /// Runs `search` for every configured keyword and concatenates the results
    async fn crawl_all_keywords(&self, max_pages_per_keyword: u32) -> Vec<Record> {
        let keywords = self.keywords();
        let mut all = Vec::new();
        tracing::info!("Crawling {} keywords", keywords.len());

        for (i, keyword) in keywords.iter().enumerate() {
            tracing::info!("[{}/{}] Keyword '{}'", i + 1, keywords.len(), keyword);

            match self.search(keyword, max_pages_per_keyword).await {
                Ok(records) => all.extend(records),
                Err(e) => tracing::warn!("Keyword '{}' failed: {}", keyword, e),
            }

            if i + 1 < keywords.len() {
                tokio::time::sleep(self.config().keyword_delay()).await;
            }
        }

        tracing::info!("All keywords done: {} records", all.len());
        all
    }

    fn crawl_stats(&self, records: &[Record]) -> CrawlStats {
        let valid = records
            .iter()
            .filter(|r| REQUIRED_FIELDS.iter().all(|f| r.has_value(f)))
            .count();
        let validity_rate = if records.is_empty() {
            0.0
        } else {
            valid as f64 / records.len() as f64 * 100.0
        };

        CrawlStats {
            platform: self.display_name().to_string(),
            total: records.len(),
            valid,
            validity_rate,
        }
    }
}

/// Base URL joined with the platform's search path
pub(crate) fn search_endpoint(config: &PlatformConfig) -> crate::Result<Url> {
    Ok(Url::parse(&config.base_url)?.join(&config.search_path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{defaults, FetchConfig};
    use crate::fetch::{Headers, RawResponse, Transport};
    use crate::platform::items::NoteFeedSource;
    use crate::TransportError;
    use serde_json::Value;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    const PAGE_DELAY: Duration = Duration::from_secs(1);
    const KEYWORD_DELAY: Duration = Duration::from_secs(5);

    /// Answers every request with one JSON note and counts requests
    #[derive(Default)]
    struct OneNoteTransport {
        requests: AtomicU32,
    }

    #[async_trait]
    impl Transport for OneNoteTransport {
        async fn get(&self, _url: &str, _headers: &Headers) -> Result<RawResponse, TransportError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(RawResponse::new(200, r#"{"data": [{"title": "智能音箱开箱"}]}"#)
                .with_content_type("application/json"))
        }
    }

    struct NoteCrawler {
        context: CrawlerContext,
        items: NoteFeedSource,
    }

    #[async_trait]
    impl PlatformCrawler for NoteCrawler {
        fn context(&self) -> &CrawlerContext {
            &self.context
        }

        fn item_source(&self) -> &dyn ItemSource {
            &self.items
        }

        fn build_search_url(&self, keyword: &str, page: u32) -> crate::Result<Url> {
            if keyword == "bad" {
                return Ok(Url::parse("not a url")?);
            }
            Ok(Url::parse_with_params(
                "https://notes.invalid/search",
                &[("q", keyword), ("page", &page.to_string())],
            )?)
        }

        fn parse_item(&self, item: &RawItem) -> Result<Record, ParseError> {
            let title = match item {
                RawItem::Json(note) => note.get("title").and_then(Value::as_str),
                RawItem::Html(_) => None,
            }
            .ok_or(ParseError::MissingField("title"))?;
            Ok(Record::new(self.display_name(), title, title))
        }
    }

    fn note_crawler(keywords: &[&str], transport: Arc<OneNoteTransport>) -> NoteCrawler {
        let mut platform = defaults::xiaohongshu();
        platform.keywords = keywords.iter().map(|k| k.to_string()).collect();
        platform.page_delay_ms = PAGE_DELAY.as_millis() as u64;
        platform.keyword_delay_ms = KEYWORD_DELAY.as_millis() as u64;

        let fetch = FetchConfig {
            delay_min_ms: 0,
            delay_max_ms: 0,
            max_retries: 1,
            backoff_unit_ms: 0,
            ..FetchConfig::default()
        };

        NoteCrawler {
            context: CrawlerContext {
                config: platform,
                requester: RetryingRequester::new(transport, fetch, Headers::new()),
                categories: CategoryTable::new(&defaults::categories(), defaults::DEFAULT_CATEGORY),
            },
            items: NoteFeedSource::new(),
        }
    }

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(500),
            "expected {:?}, took {:?}",
            expected,
            elapsed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_waits_between_pages_only() {
        let transport = Arc::new(OneNoteTransport::default());
        let crawler = note_crawler(&["智能音箱"], transport.clone());

        let start = Instant::now();
        let records = crawler.search("智能音箱", 3).await.unwrap();

        assert_elapsed(start, PAGE_DELAY * 2);
        assert_eq!(transport.requests.load(Ordering::SeqCst), 3);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.crawl_time.is_some()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keyword_delay_between_keywords_only() {
        let transport = Arc::new(OneNoteTransport::default());
        let crawler = note_crawler(&["一", "二", "三"], transport.clone());

        let start = Instant::now();
        let records = crawler.crawl_all_keywords(2).await;

        // One page gap per keyword, two keyword gaps
        assert_elapsed(start, PAGE_DELAY * 3 + KEYWORD_DELAY * 2);
        assert_eq!(transport.requests.load(Ordering::SeqCst), 6);
        assert_eq!(records.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keyword_with_bad_search_url_is_skipped() {
        let transport = Arc::new(OneNoteTransport::default());
        let crawler = note_crawler(&["first", "bad", "last"], transport.clone());

        assert!(crawler.search("bad", 1).await.is_err());

        let start = Instant::now();
        let records = crawler.crawl_all_keywords(1).await;

        assert_elapsed(start, KEYWORD_DELAY * 2);
        assert_eq!(transport.requests.load(Ordering::SeqCst), 2);
        assert_eq!(records.len(), 2);
    }
}
