//! Crawl orchestration
//!
//! This module owns the active crawler set and drives one harvest run:
//! - Building one crawler per configured platform, excluding any that fail
//! - Scheduling platform crawls sequentially (with cooldown) or on a bounded
//!   worker pool
//! - Running each platform's records through validate, clean, re-validate
//! - Merging per-platform results and generating the crawl report

use crate::config::{Config, CrawlMode};
use crate::fetch::{ReqwestTransport, Transport};
use crate::orchestrator::phase::RunPhase;
use crate::orchestrator::report::{CrawlReport, CrawlSummary, PlatformReport};
use crate::platform::{build_crawler, PlatformCrawler};
use crate::quality::{RecordCleaner, RecordValidator, RuleSet};
use crate::record::{Record, CRAWL_TIME_FORMAT};
use crate::HarvestError;
use chrono::Local;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Per-platform results, keyed by platform id
pub type PlatformData = BTreeMap<String, Vec<Record>>;

/// Everything one full run produces
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    pub platform_data: PlatformData,
    pub merged: Vec<Record>,
    pub report: CrawlReport,
}

/// Drives crawls across all configured platforms
///
/// No failure below this boundary escapes `crawl_all_platforms`: fetch, parse
/// and task failures all degrade to empty or partial results plus a log entry,
/// and every configured platform gets exactly one entry in the result map.
pub struct CrawlOrchestrator {
    config: Arc<Config>,
    /// Configured platform ids, in configuration order
    configured: Vec<String>,
    /// Crawlers that were built successfully, keyed by platform id
    crawlers: BTreeMap<String, Arc<dyn PlatformCrawler>>,
    validator: Arc<RecordValidator>,
    cleaner: Arc<RecordCleaner>,
    config_hash: Option<String>,
    phase: Arc<Mutex<RunPhase>>,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator using the reqwest transport
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOrchestrator)` - Ready, possibly with some platforms inactive
    /// * `Err(HarvestError)` - Validation patterns or the HTTP client are unusable
    pub fn new(config: Config) -> crate::Result<Self> {
        let transport = ReqwestTransport::new(&config.fetch)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates an orchestrator whose crawlers share `transport`
    ///
    /// A platform whose crawler cannot be built is logged and left inactive.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> crate::Result<Self> {
        let mut crawlers = Vec::new();

        for platform in &config.platforms {
            match build_crawler(platform, &config, transport.clone()) {
                Ok(crawler) => {
                    tracing::info!("Initialized crawler for {} ({})", platform.name, platform.id);
                    crawlers.push(crawler);
                }
                Err(e) => {
                    tracing::warn!("Platform {} is inactive: {}", platform.id, e);
                }
            }
        }

        Self::with_crawlers(config, crawlers)
    }

    /// Creates an orchestrator from prebuilt crawlers
    ///
    /// Crawlers whose id is not a configured platform are ignored.
    pub fn with_crawlers(
        config: Config,
        crawlers: Vec<Arc<dyn PlatformCrawler>>,
    ) -> crate::Result<Self> {
        let rules = RuleSet::from_config(&config.validation)?;
        let configured: Vec<String> = config.platforms.iter().map(|p| p.id.clone()).collect();

        let mut active = BTreeMap::new();
        for crawler in crawlers {
            let id = crawler.id().to_string();
            if configured.contains(&id) {
                active.insert(id, crawler);
            } else {
                tracing::warn!("Ignoring crawler for unconfigured platform {}", id);
            }
        }

        Ok(Self {
            validator: Arc::new(RecordValidator::new(rules)),
            cleaner: Arc::new(RecordCleaner::from_config(&config)),
            config: Arc::new(config),
            configured,
            crawlers: active,
            config_hash: None,
            phase: Arc::new(Mutex::new(RunPhase::Idle)),
        })
    }

    /// Attaches the configuration hash carried into every report
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn configured_platforms(&self) -> &[String] {
        &self.configured
    }

    /// Ids of platforms with a working crawler, in configuration order
    pub fn active_platforms(&self) -> Vec<&str> {
        self.configured
            .iter()
            .filter(|id| self.crawlers.contains_key(id.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn crawler(&self, platform: &str) -> Option<&Arc<dyn PlatformCrawler>> {
        self.crawlers.get(platform)
    }

    pub fn validator(&self) -> &RecordValidator {
        &self.validator
    }

    pub fn cleaner(&self) -> &RecordCleaner {
        &self.cleaner
    }

    /// Worker pool size parallel mode uses for the active platforms
    pub fn worker_pool(&self) -> usize {
        worker_pool_size(
            self.config.orchestrator.max_parallel_platforms,
            self.crawlers.len(),
        )
    }

    pub fn phase(&self) -> RunPhase {
        lock_phase(&self.phase).clone()
    }

    fn set_phase(&self, next: RunPhase) {
        advance_phase(&self.phase, next);
    }

    /// Crawls one platform and returns its cleaned, validated records
    ///
    /// An inactive or unknown platform yields an empty result and a warning.
    pub async fn crawl_platform(&self, platform: &str, max_pages_per_keyword: u32) -> Vec<Record> {
        let Some(crawler) = self.crawlers.get(platform) else {
            tracing::warn!("Platform {} has no active crawler", platform);
            return Vec::new();
        };

        run_platform(
            crawler.clone(),
            self.validator.clone(),
            self.cleaner.clone(),
            max_pages_per_keyword,
        )
        .await
    }

    /// Crawls every configured platform
    ///
    /// Returns one entry per configured platform; inactive platforms and
    /// platforms whose task failed map to an empty list. Never fails.
    pub async fn crawl_all_platforms(
        &self,
        max_pages_per_keyword: u32,
        mode: CrawlMode,
    ) -> PlatformData {
        tracing::info!("Starting {} crawl of {} platforms", mode, self.configured.len());
        let start = Instant::now();
        self.set_phase(RunPhase::Idle);

        let mut results: PlatformData = self
            .configured
            .iter()
            .map(|id| (id.clone(), Vec::new()))
            .collect();

        for id in &self.configured {
            if !self.crawlers.contains_key(id) {
                tracing::warn!("Platform {} is inactive; its result stays empty", id);
            }
        }

        let crawled = match mode {
            CrawlMode::Sequential => self.crawl_sequential(max_pages_per_keyword).await,
            CrawlMode::Parallel => self.crawl_parallel(max_pages_per_keyword).await,
        };
        results.extend(crawled);

        let total: usize = results.values().map(Vec::len).sum();
        for (id, records) in &results {
            tracing::info!("  {}: {} records", id, records.len());
        }
        tracing::info!(
            "All platforms finished: {} records in {:.2?}",
            total,
            start.elapsed()
        );

        results
    }

    /// One platform at a time in configuration order, cooling down in between
    async fn crawl_sequential(&self, max_pages_per_keyword: u32) -> Vec<(String, Vec<Record>)> {
        let active: Vec<String> = self
            .active_platforms()
            .into_iter()
            .map(String::from)
            .collect();
        let mut results = Vec::with_capacity(active.len());

        for (i, id) in active.iter().enumerate() {
            let Some(crawler) = self.crawlers.get(id) else {
                continue;
            };
            self.set_phase(RunPhase::Crawling(id.clone()));

            let records = guarded(
                id.clone(),
                run_platform(
                    crawler.clone(),
                    self.validator.clone(),
                    self.cleaner.clone(),
                    max_pages_per_keyword,
                ),
            )
            .await;
            results.push((id.clone(), records));

            if i + 1 < active.len() {
                let cooldown = self.config.orchestrator.cooldown();
                tracing::info!("Cooling down {:?} before the next platform", cooldown);
                tokio::time::sleep(cooldown).await;
            }
        }

        results
    }

    /// One task per platform on a bounded worker pool, collected as they finish
    async fn crawl_parallel(&self, max_pages_per_keyword: u32) -> Vec<(String, Vec<Record>)> {
        let active = self.active_platforms();
        let pool = self.worker_pool();
        tracing::info!("Crawling {} platforms on {} workers", active.len(), pool);

        let semaphore = Arc::new(Semaphore::new(pool));
        let mut tasks = JoinSet::new();

        for id in active {
            let Some(crawler) = self.crawlers.get(id) else {
                continue;
            };
            let id = id.to_string();
            let crawler = crawler.clone();
            let validator = self.validator.clone();
            let cleaner = self.cleaner.clone();
            let semaphore = semaphore.clone();
            let phase = self.phase.clone();

            tasks.spawn(async move {
                // Held until this platform's crawl resolves
                let _permit = semaphore.acquire_owned().await.ok();
                advance_phase(&phase, RunPhase::Crawling(id.clone()));
                let records = guarded(
                    id.clone(),
                    run_platform(crawler, validator, cleaner, max_pages_per_keyword),
                )
                .await;
                (id, records)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, records)) => {
                    tracing::info!("Platform {} finished with {} records", id, records.len());
                    results.push((id, records));
                }
                Err(e) => tracing::error!("Worker task failed: {}", e),
            }
        }
        results
    }

    /// Flattens per-platform results, stamping each record with its platform's
    /// display name
    pub fn merge_platform_data(&self, platform_data: &PlatformData) -> Vec<Record> {
        let merged: Vec<Record> = platform_data
            .iter()
            .flat_map(|(id, records)| {
                let name = self.display_name(id).to_string();
                records.iter().cloned().map(move |mut record| {
                    record.platform = name.clone();
                    record
                })
            })
            .collect();

        tracing::info!("Merged {} records", merged.len());
        merged
    }

    /// Builds the per-platform quality reports and the run summary
    pub fn generate_report(&self, platform_data: &PlatformData) -> CrawlReport {
        let platforms: BTreeMap<String, PlatformReport> = platform_data
            .iter()
            .map(|(id, records)| {
                let report = PlatformReport {
                    platform_name: self.display_name(id).to_string(),
                    validation: self.validator.validate_dataset(records),
                };
                (id.clone(), report)
            })
            .collect();

        let total_records = platform_data.values().map(Vec::len).sum();
        let active_platforms = platform_data.values().filter(|r| !r.is_empty()).count();

        CrawlReport {
            crawl_time: Local::now().format(CRAWL_TIME_FORMAT).to_string(),
            config_hash: self.config_hash.clone(),
            platforms,
            summary: CrawlSummary::new(platform_data.len(), active_platforms, total_records),
        }
    }

    /// Crawls, merges and reports in one call
    pub async fn run(&self, max_pages_per_keyword: u32, mode: CrawlMode) -> HarvestOutcome {
        let platform_data = self.crawl_all_platforms(max_pages_per_keyword, mode).await;

        self.set_phase(RunPhase::Merging);
        let merged = self.merge_platform_data(&platform_data);

        self.set_phase(RunPhase::Reporting);
        let report = self.generate_report(&platform_data);

        self.set_phase(RunPhase::Done);
        HarvestOutcome {
            platform_data,
            merged,
            report,
        }
    }

    fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.config
            .platform(id)
            .map(|p| p.name.as_str())
            .unwrap_or(id)
    }
}

/// Worker pool size for `platforms` concurrent crawls
///
/// At least one worker; with more than two platforms the pool is kept
/// strictly smaller than the platform count.
pub fn worker_pool_size(configured: usize, platforms: usize) -> usize {
    let pool = configured.max(1);
    if platforms > 2 {
        pool.min(platforms - 1)
    } else {
        pool
    }
}

/// Crawl, pre-clean report, clean and filter for one platform
async fn run_platform(
    crawler: Arc<dyn PlatformCrawler>,
    validator: Arc<RecordValidator>,
    cleaner: Arc<RecordCleaner>,
    max_pages_per_keyword: u32,
) -> Vec<Record> {
    let span = tracing::info_span!("platform", id = %crawler.id());

    async move {
        tracing::info!("Crawling {}", crawler.display_name());
        let start = Instant::now();

        let raw = crawler.crawl_all_keywords(max_pages_per_keyword).await;
        if raw.is_empty() {
            tracing::warn!("{} returned no records", crawler.display_name());
            return Vec::new();
        }

        let stats = crawler.crawl_stats(&raw);
        let pre_clean = validator.validate_dataset(&raw);
        tracing::info!(
            "Raw records: {} ({} complete), {} pass validation before cleaning",
            stats.total,
            stats.valid,
            pre_clean.valid
        );

        let cleaned = cleaner.clean_dataset(&raw, &validator);
        tracing::info!(
            "{} finished: {} raw, {} kept after cleaning, {:.2?}",
            crawler.display_name(),
            raw.len(),
            cleaned.len(),
            start.elapsed()
        );
        cleaned
    }
    .instrument(span)
    .await
}

/// Runs a platform crawl as its own task
async fn spawn_crawl<F>(platform: &str, crawl: F) -> crate::Result<Vec<Record>>
where
    F: std::future::Future<Output = Vec<Record>> + Send + 'static,
{
    tokio::spawn(crawl).await.map_err(|e| HarvestError::Task {
        platform: platform.to_string(),
        message: e.to_string(),
    })
}

/// Like [`spawn_crawl`], but a failed task becomes an empty result
async fn guarded<F>(platform: String, crawl: F) -> Vec<Record>
where
    F: std::future::Future<Output = Vec<Record>> + Send + 'static,
{
    match spawn_crawl(&platform, crawl).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("{}", e);
            Vec::new()
        }
    }
}

fn lock_phase(phase: &Mutex<RunPhase>) -> std::sync::MutexGuard<'_, RunPhase> {
    phase.lock().unwrap_or_else(|e| e.into_inner())
}

fn advance_phase(phase: &Mutex<RunPhase>, next: RunPhase) {
    let mut current = lock_phase(phase);
    if current.can_advance_to(&next) || next == RunPhase::Idle {
        tracing::debug!("Run phase {} -> {}", *current, next);
        *current = next;
    }
}
