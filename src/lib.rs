//! Listing Harvester: multi-platform listing collection with a quality gate
//!
//! This crate harvests listing and post records from several independent
//! platforms, normalizes them into a canonical [`Record`], validates and cleans
//! every field, and merges the per-platform results into one dataset with an
//! accompanying quality report.

pub mod config;
pub mod fetch;
pub mod orchestrator;
pub mod output;
pub mod platform;
pub mod quality;
pub mod record;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Platform initialization error: {0}")]
    PlatformInit(#[from] PlatformInitError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Platform task failed for {platform}: {message}")]
    Task { platform: String, message: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern in config: {0}")]
    InvalidPattern(String),
}

/// A logical fetch that exhausted its retries
///
/// Bad status codes and transport failures both end up here; only the
/// human-readable `cause` of the last attempt tells them apart.
#[derive(Debug, Clone, Error)]
#[error("fetch of {url} failed after {attempts} attempt(s): {cause}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    pub cause: String,
}

/// Failure of a single transport round-trip
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport failure: {0}")]
    Other(String),
}

/// Raw item could not be turned into a record
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unexpected item shape: {0}")]
    UnexpectedShape(String),

    #[error("invalid selector: {0}")]
    Selector(String),

    #[error("invalid JSON payload: {0}")]
    Json(String),
}

/// Crawler construction failures, caught when the orchestrator is built
#[derive(Debug, Error)]
pub enum PlatformInitError {
    #[error("no crawler variant for platform '{0}'")]
    UnknownPlatform(String),

    #[error("platform '{0}' is disabled in configuration")]
    Disabled(String),

    #[error("item source for platform '{platform}' could not be built: {message}")]
    ItemSource { platform: String, message: String },

    #[error("invalid base URL for platform '{platform}': {message}")]
    InvalidBaseUrl { platform: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use orchestrator::{CrawlMode, CrawlOrchestrator, CrawlReport};
pub use quality::{RecordCleaner, RecordValidator, ValidationReport};
pub use record::{FieldValue, Record};
