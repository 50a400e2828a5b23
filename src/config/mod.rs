//! Configuration module for the harvester
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every section has built-in defaults, so an empty file (or no file at
//! all, via [`Config::default`]) is a working configuration.
//!
//! # Example
//!
//! ```no_run
//! use listing_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Platforms: {}", config.platforms.len());
//! ```

pub mod defaults;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CategoryEntry, Config, CrawlMode, FetchConfig, OrchestratorConfig, PlatformConfig,
    ValidationConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
