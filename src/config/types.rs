use crate::config::defaults;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub orchestrator: OrchestratorConfig,
    #[serde(rename = "platform")]
    pub platforms: Vec<PlatformConfig>,
    #[serde(rename = "category")]
    pub categories: Vec<CategoryEntry>,
    /// Category assigned when no keyword matches
    pub default_category: String,
    pub validation: ValidationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            platforms: defaults::platforms(),
            categories: defaults::categories(),
            default_category: defaults::DEFAULT_CATEGORY.to_string(),
            validation: ValidationConfig::default(),
        }
    }
}

impl Config {
    /// Looks up a platform by id
    pub fn platform(&self, id: &str) -> Option<&PlatformConfig> {
        self.platforms.iter().find(|p| p.id == id)
    }
}

/// Retrying requester configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetchConfig {
    /// Lower bound of the per-attempt jitter delay (milliseconds)
    pub delay_min_ms: u64,

    /// Upper bound of the per-attempt jitter delay (milliseconds)
    pub delay_max_ms: u64,

    /// Attempts per logical fetch
    pub max_retries: u32,

    /// Backoff after failed attempt `i` is `(i + 1) * backoff_unit_ms`
    pub backoff_unit_ms: u64,

    /// Per-request timeout (seconds)
    pub timeout_secs: u64,

    /// User agents rotated per attempt
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            delay_min_ms: 500,
            delay_max_ms: 3000,
            max_retries: 3,
            backoff_unit_ms: 2000,
            timeout_secs: 10,
            user_agents: defaults::user_agents(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

/// How platforms are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlMode {
    /// One platform at a time, with a cooldown between platforms
    #[default]
    Sequential,

    /// One task per platform on a bounded worker pool
    Parallel,
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}

/// Orchestrator scheduling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OrchestratorConfig {
    /// Pause between platforms in sequential mode (seconds)
    pub platform_cooldown_secs: u64,

    /// Worker pool size in parallel mode
    pub max_parallel_platforms: usize,

    /// Mode used when the caller does not pick one
    pub default_mode: CrawlMode,

    /// Pages requested per keyword
    pub max_pages_per_keyword: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            platform_cooldown_secs: 30,
            max_parallel_platforms: 2,
            default_mode: CrawlMode::Sequential,
            max_pages_per_keyword: 2,
        }
    }
}

impl OrchestratorConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.platform_cooldown_secs)
    }
}

/// Immutable per-platform metadata
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformConfig {
    /// Stable identifier (e.g., "taobao")
    pub id: String,

    /// Display name stamped onto records
    pub name: String,

    pub base_url: String,

    pub search_path: String,

    /// Pause between successive pages of one keyword (milliseconds)
    #[serde(default = "defaults::page_delay_ms")]
    pub page_delay_ms: u64,

    /// Pause between successive keywords (milliseconds)
    #[serde(default = "defaults::keyword_delay_ms")]
    pub keyword_delay_ms: u64,

    /// Items per result page
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub keywords: Vec<String>,

    /// Static headers sent with every request to this platform
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
}

impl PlatformConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn keyword_delay(&self) -> Duration {
        Duration::from_millis(self.keyword_delay_ms)
    }
}

/// One row of the ordered category table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Bounds for the built-in validation rules
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ValidationConfig {
    pub title_min_length: usize,
    pub title_max_length: usize,
    /// Title must contain at least one character matching one of these patterns
    pub title_patterns: Vec<String>,
    pub content_min_length: usize,
    pub content_max_length: usize,
    pub max_price: f64,
    pub max_sales: f64,
    pub max_likes: f64,
    pub max_comments: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            title_min_length: 5,
            title_max_length: 200,
            title_patterns: vec![r"[\u{4e00}-\u{9fff}]".to_string()],
            content_min_length: 5,
            content_max_length: 1000,
            max_price: 100_000.0,
            max_sales: 10_000_000.0,
            max_likes: 10_000_000.0,
            max_comments: 100_000.0,
        }
    }
}
