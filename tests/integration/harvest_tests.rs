//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! fetch, parse, clean, merge and report cycle end-to-end.

use async_trait::async_trait;
use listing_harvester::config::{Config, FetchConfig};
use listing_harvester::fetch::{FetchOptions, Headers, ReqwestTransport, RetryingRequester};
use listing_harvester::orchestrator::RunPhase;
use listing_harvester::output::{save_outcome, JsonFileSink};
use listing_harvester::platform::{
    CategoryTable, CrawlerContext, ItemSource, NoteFeedSource, PlatformCrawler, RawItem,
};
use listing_harvester::{CrawlMode, CrawlOrchestrator, FieldValue, ParseError, Record};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TAOBAO_PAGE: &str = r#"<html><body>
<div class="item">
  <a class="title" href="//item.taobao.com/item.htm?id=1">AI智能音箱 小爱同学</a>
  <span class="price">¥299.00</span>
  <span class="deal-cnt">5万+人付款</span>
  <a class="shopname">小米官方旗舰店</a>
  <span class="location">北京</span>
</div>
<div class="item">
  <a class="title" href="/item.htm?id=2">音箱</a>
  <span class="price">¥99</span>
</div>
<div class="item">
  <span class="price">¥10</span>
</div>
</body></html>"#;

fn fast_fetch_config() -> FetchConfig {
    FetchConfig {
        delay_min_ms: 0,
        delay_max_ms: 0,
        max_retries: 2,
        backoff_unit_ms: 0,
        timeout_secs: 5,
        user_agents: vec!["HarvestTest/1.0".to_string()],
    }
}

/// Default platforms pointed at the mock server, one keyword each, no pauses
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.fetch = fast_fetch_config();
    config.orchestrator.platform_cooldown_secs = 0;

    for platform in &mut config.platforms {
        platform.base_url = base_url.to_string();
        platform.page_delay_ms = 0;
        platform.keyword_delay_ms = 0;
        match platform.id.as_str() {
            "taobao" => platform.keywords = vec!["智能音箱".to_string()],
            "xiaohongshu" => {
                platform.keywords = vec!["AI助手".to_string()];
                platform.search_path = "/api/sns/search".to_string();
            }
            _ => {}
        }
    }

    config
}

async fn mount_platforms(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "智能音箱"))
        .and(query_param("s", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TAOBAO_PAGE))
        .expect(1)
        .mount(server)
        .await;

    let notes = json!({
        "data": {
            "notes": [
                {
                    "id": "n1",
                    "display_title": "AI助手使用心得分享",
                    "desc": "今天试用了AI助手 #效率工具# 非常好用",
                    "liked_count": "1.2万",
                    "comment_count": 35,
                    "time": 1700000000,
                    "user": {"user_id": "u1", "nickname": "小红"}
                },
                {"id": "n2", "display_title": "好", "desc": "短"}
            ]
        }
    });

    Mock::given(method("GET"))
        .and(path("/api/sns/search"))
        .and(query_param("keyword", "AI助手"))
        .respond_with(ResponseTemplate::new(200).set_body_json(notes))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_requester_sends_rotated_agent_and_base_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/probe"))
        .and(header("User-Agent", "HarvestTest/1.0"))
        .and(header("X-Trace", "on"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = fast_fetch_config();
    let transport = Arc::new(ReqwestTransport::new(&config).unwrap());
    let mut base_headers = Headers::new();
    base_headers.insert("X-Trace".to_string(), "on".to_string());
    let requester = RetryingRequester::new(transport, config, base_headers);

    let response = requester
        .fetch(&format!("{}/probe", mock_server.uri()), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "ok");
}

#[tokio::test]
async fn test_requester_gives_up_after_max_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = fast_fetch_config();
    let transport = Arc::new(ReqwestTransport::new(&config).unwrap());
    let requester = RetryingRequester::new(transport, config, Headers::new());

    let err = requester
        .fetch(&format!("{}/flaky", mock_server.uri()), &FetchOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.attempts, 2);
    assert!(err.cause.contains("503"));
}

#[tokio::test]
async fn test_full_harvest_sequential() {
    let mock_server = MockServer::start().await;
    mount_platforms(&mock_server).await;

    let config = create_test_config(&mock_server.uri());
    let orchestrator = CrawlOrchestrator::new(config)
        .unwrap()
        .with_config_hash("test-hash");

    assert_eq!(orchestrator.active_platforms(), vec!["taobao", "xiaohongshu"]);

    let outcome = orchestrator.run(1, CrawlMode::Sequential).await;
    assert_eq!(orchestrator.phase(), RunPhase::Done);

    // One entry per configured platform; the variant-less platform stays empty
    assert_eq!(outcome.platform_data.len(), 3);
    assert!(outcome.platform_data["douyin"].is_empty());

    let taobao = &outcome.platform_data["taobao"];
    assert_eq!(taobao.len(), 1);
    let listing = &taobao[0];
    assert_eq!(listing.title, "AI智能音箱 小爱同学");
    assert_eq!(listing.price, Some(FieldValue::Float(299.0)));
    assert_eq!(listing.sales, Some(FieldValue::Int(50_000)));
    assert_eq!(listing.shop_name.as_deref(), Some("小米官方旗舰店"));
    assert_eq!(
        listing.source_url.as_deref(),
        Some("https://item.taobao.com/item.htm?id=1")
    );
    assert!(listing.product_type.is_some());
    assert!(listing.crawl_time.is_some());

    let notes = &outcome.platform_data["xiaohongshu"];
    assert_eq!(notes.len(), 1);
    let note = &notes[0];
    assert_eq!(note.title, "AI助手使用心得分享");
    assert_eq!(note.likes, Some(FieldValue::Int(12_000)));
    assert_eq!(note.comments_count, Some(FieldValue::Int(35)));
    assert_eq!(note.author_name.as_deref(), Some("小红"));
    assert_eq!(
        note.source_url.as_deref(),
        Some("https://www.xiaohongshu.com/explore/n1")
    );
    assert!(note.tags.contains("效率工具"));

    let platforms: Vec<&str> = outcome.merged.iter().map(|r| r.platform.as_str()).collect();
    assert_eq!(platforms, vec!["淘宝", "小红书"]);

    let report = &outcome.report;
    assert_eq!(report.config_hash.as_deref(), Some("test-hash"));
    assert_eq!(report.summary.total_platforms, 3);
    assert_eq!(report.summary.active_platforms, 2);
    assert_eq!(report.summary.total_records, 2);
    assert_eq!(report.summary.avg_records_per_active_platform, 1.0);
    assert_eq!(report.platforms["taobao"].validation.valid, 1);
    assert_eq!(report.platforms["douyin"].validation.total, 0);
}

#[tokio::test]
async fn test_failing_platform_does_not_stop_others() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/sns/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "n9", "display_title": "AI助手测评合集", "desc": "这是一篇完整的测评"}]
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let orchestrator = CrawlOrchestrator::new(config).unwrap();
    let data = orchestrator.crawl_all_platforms(1, CrawlMode::Parallel).await;

    assert!(data["taobao"].is_empty());
    assert_eq!(data["xiaohongshu"].len(), 1);
    assert!(data["douyin"].is_empty());
}

#[tokio::test]
async fn test_harvest_output_files() {
    let mock_server = MockServer::start().await;
    mount_platforms(&mock_server).await;

    let orchestrator = CrawlOrchestrator::new(create_test_config(&mock_server.uri())).unwrap();
    let outcome = orchestrator.run(1, CrawlMode::Parallel).await;

    let dir = TempDir::new().unwrap();
    let sink = JsonFileSink::new(dir.path());
    let written = save_outcome(&sink, &outcome, "20240101_120000").unwrap();

    assert_eq!(written.len(), 4);
    for name in [
        "taobao_20240101_120000_raw.json",
        "xiaohongshu_20240101_120000_raw.json",
        "all_platforms_20240101_120000_merged.json",
        "crawl_report_20240101_120000.json",
    ] {
        assert!(dir.path().join(name).exists(), "missing {}", name);
    }
    assert!(!dir.path().join("douyin_20240101_120000_raw.json").exists());

    let merged: Vec<Record> = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("all_platforms_20240101_120000_merged.json"))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(merged.len(), 2);
}

/// Crawler that either returns canned records or panics mid-crawl
struct StubCrawler {
    context: CrawlerContext,
    items: NoteFeedSource,
    records: Option<Vec<Record>>,
}

impl StubCrawler {
    fn new(config: &Config, id: &str, records: Option<Vec<Record>>) -> Arc<dyn PlatformCrawler> {
        let transport = Arc::new(ReqwestTransport::new(&config.fetch).unwrap());
        Arc::new(Self {
            context: CrawlerContext {
                config: config.platform(id).unwrap().clone(),
                requester: RetryingRequester::new(transport, config.fetch.clone(), Headers::new()),
                categories: CategoryTable::from_config(config),
            },
            items: NoteFeedSource::new(),
            records,
        })
    }
}

#[async_trait]
impl PlatformCrawler for StubCrawler {
    fn context(&self) -> &CrawlerContext {
        &self.context
    }

    fn item_source(&self) -> &dyn ItemSource {
        &self.items
    }

    fn build_search_url(&self, keyword: &str, page: u32) -> listing_harvester::Result<Url> {
        Ok(Url::parse_with_params(
            "https://stub.invalid/search",
            &[("q", keyword), ("page", &page.to_string())],
        )?)
    }

    fn parse_item(&self, _item: &RawItem) -> Result<Record, ParseError> {
        Err(ParseError::UnexpectedShape("stub".to_string()))
    }

    async fn crawl_all_keywords(&self, _max_pages_per_keyword: u32) -> Vec<Record> {
        match &self.records {
            Some(records) => records.clone(),
            None => panic!("stub crawler exploded"),
        }
    }
}

async fn assert_panic_is_isolated(mode: CrawlMode) {
    let mut config = Config::default();
    config.fetch = fast_fetch_config();
    config.orchestrator.platform_cooldown_secs = 0;

    let note = Record::new("小红书", "AI助手使用心得分享", "今天试用了AI助手非常好用");
    let crawlers = vec![
        StubCrawler::new(&config, "taobao", None),
        StubCrawler::new(&config, "xiaohongshu", Some(vec![note])),
    ];
    let orchestrator = CrawlOrchestrator::with_crawlers(config, crawlers).unwrap();

    let outcome = orchestrator.run(1, mode).await;

    assert_eq!(outcome.platform_data.len(), 3);
    assert!(outcome.platform_data["taobao"].is_empty());
    assert!(outcome.platform_data["douyin"].is_empty());
    assert_eq!(outcome.platform_data["xiaohongshu"].len(), 1);
    assert_eq!(outcome.merged.len(), 1);
    assert_eq!(outcome.report.summary.active_platforms, 1);
}

#[tokio::test]
async fn test_panicking_platform_isolated_sequential() {
    assert_panic_is_isolated(CrawlMode::Sequential).await;
}

#[tokio::test]
async fn test_panicking_platform_isolated_parallel() {
    assert_panic_is_isolated(CrawlMode::Parallel).await;
}
