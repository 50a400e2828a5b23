//! Platform crawlers
//!
//! This module contains:
//! - The [`PlatformCrawler`] contract with its shared search and keyword loops
//! - Item sources that split fetched pages into raw items
//! - The [`CategoryTable`] classifier
//! - One variant per supported platform, selected by id in [`build_crawler`]

mod category;
mod crawler;
mod items;
mod taobao;
mod xiaohongshu;

pub use category::CategoryTable;
pub use crawler::{CrawlStats, CrawlerContext, PlatformCrawler};
pub use items::{HtmlItemSource, ItemSource, NoteFeedSource, RawItem};
pub use taobao::TaobaoCrawler;
pub use xiaohongshu::XiaohongshuCrawler;

use crate::config::{Config, PlatformConfig};
use crate::fetch::{common_headers, RetryingRequester, Transport};
use crate::PlatformInitError;
use std::sync::Arc;
use url::Url;

/// Platform ids with a crawler variant
pub const SUPPORTED_PLATFORMS: &[&str] = &["taobao", "xiaohongshu"];

/// Builds the crawler variant for one configured platform
///
/// Each crawler gets its own [`RetryingRequester`] (and so its own random
/// generator) on top of the shared transport.
///
/// # Arguments
///
/// * `platform` - The platform's configuration entry
/// * `config` - Full configuration (fetch settings and category table)
/// * `transport` - Transport shared by all crawlers
///
/// # Returns
///
/// * `Ok(Arc<dyn PlatformCrawler>)` - Ready-to-use crawler
/// * `Err(PlatformInitError)` - Disabled, unknown, or misconfigured platform
pub fn build_crawler(
    platform: &PlatformConfig,
    config: &Config,
    transport: Arc<dyn Transport>,
) -> Result<Arc<dyn PlatformCrawler>, PlatformInitError> {
    if !platform.enabled {
        return Err(PlatformInitError::Disabled(platform.id.clone()));
    }
    if !SUPPORTED_PLATFORMS.contains(&platform.id.as_str()) {
        return Err(PlatformInitError::UnknownPlatform(platform.id.clone()));
    }

    Url::parse(&platform.base_url).map_err(|e| PlatformInitError::InvalidBaseUrl {
        platform: platform.id.clone(),
        message: e.to_string(),
    })?;

    let mut headers = common_headers();
    headers.extend(
        platform
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    let context = CrawlerContext {
        config: platform.clone(),
        requester: RetryingRequester::new(transport, config.fetch.clone(), headers),
        categories: CategoryTable::from_config(config),
    };

    let crawler: Arc<dyn PlatformCrawler> = match platform.id.as_str() {
        "taobao" => Arc::new(TaobaoCrawler::new(context).map_err(|e| {
            PlatformInitError::ItemSource {
                platform: platform.id.clone(),
                message: e.to_string(),
            }
        })?),
        "xiaohongshu" => Arc::new(XiaohongshuCrawler::new(context)),
        other => return Err(PlatformInitError::UnknownPlatform(other.to_string())),
    };

    Ok(crawler)
}
