//! Orchestration of a harvest run across platforms
//!
//! This module contains:
//! - The [`CrawlOrchestrator`] and its two scheduling modes
//! - The [`RunPhase`] a run moves through
//! - The [`CrawlReport`] produced at the end of a run

mod coordinator;
mod phase;
mod report;

pub use crate::config::CrawlMode;
pub use coordinator::{worker_pool_size, CrawlOrchestrator, HarvestOutcome, PlatformData};
pub use phase::RunPhase;
pub use report::{CrawlReport, CrawlSummary, PlatformReport};
