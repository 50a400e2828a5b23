//! Listing Harvester main entry point
//!
//! This is the command-line interface for the multi-platform listing harvester.

use anyhow::{bail, Context};
use clap::Parser;
use listing_harvester::config::{load_config_with_hash, validate, Config};
use listing_harvester::output::{print_report, run_timestamp, save_outcome, JsonFileSink};
use listing_harvester::{CrawlMode, CrawlOrchestrator};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Listing Harvester: collect, validate and merge listings from several platforms
///
/// Each configured platform is searched for its keywords, the records are
/// cleaned and validated, and the merged dataset is written as JSON together
/// with a quality report.
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version)]
#[command(about = "Multi-platform listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Pages requested per keyword (overrides the config)
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Crawl platforms concurrently on a bounded worker pool
    #[arg(long)]
    parallel: bool,

    /// Only crawl these platform ids (repeatable)
    #[arg(long = "platform", value_name = "ID")]
    platforms: Vec<String>,

    /// Directory receiving the JSON output
    #[arg(long, value_name = "DIR", default_value = "data")]
    output_dir: PathBuf,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => {
            tracing::info!("No configuration file given, using built-in defaults");
            (Config::default(), None)
        }
    };

    if !cli.platforms.is_empty() {
        select_platforms(&mut config, &cli.platforms)?;
    }
    validate(&config)?;

    let max_pages = cli
        .max_pages
        .unwrap_or(config.orchestrator.max_pages_per_keyword)
        .max(1);
    let mode = if cli.parallel {
        CrawlMode::Parallel
    } else {
        config.orchestrator.default_mode
    };

    if cli.dry_run {
        return handle_dry_run(config, max_pages, mode, &cli.output_dir);
    }

    handle_crawl(config, config_hash, max_pages, mode, cli.output_dir).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Keeps only the requested platforms, in configuration order
fn select_platforms(config: &mut Config, wanted: &[String]) -> anyhow::Result<()> {
    for id in wanted {
        if config.platform(id).is_none() {
            bail!("platform '{}' is not configured", id);
        }
    }
    config.platforms.retain(|p| wanted.contains(&p.id));
    Ok(())
}

/// Handles the --dry-run mode: shows what would be crawled
///
/// Crawlers are built (no requests are sent) so the worker pool and the
/// inactive platforms shown are the ones a real run would use.
fn handle_dry_run(
    config: Config,
    max_pages: u32,
    mode: CrawlMode,
    output_dir: &Path,
) -> anyhow::Result<()> {
    let orchestrator = CrawlOrchestrator::new(config)?;
    let config = orchestrator.config();
    let active = orchestrator.active_platforms();

    println!("=== Listing Harvester Dry Run ===\n");

    println!("Run:");
    println!("  Mode: {}", mode);
    println!("  Pages per keyword: {}", max_pages);
    println!("  Output directory: {}", output_dir.display());
    if mode == CrawlMode::Parallel {
        println!("  Worker pool: {}", orchestrator.worker_pool());
    } else {
        println!(
            "  Platform cooldown: {}s",
            config.orchestrator.platform_cooldown_secs
        );
    }

    println!("\nFetch:");
    println!(
        "  Delay: {}-{}ms",
        config.fetch.delay_min_ms, config.fetch.delay_max_ms
    );
    println!("  Max retries: {}", config.fetch.max_retries);
    println!("  Timeout: {}s", config.fetch.timeout_secs);

    println!("\nPlatforms ({}):", config.platforms.len());
    for platform in &config.platforms {
        let state = if active.contains(&platform.id.as_str()) {
            ""
        } else {
            " [inactive]"
        };
        println!(
            "  - {} ({}){}: {}",
            platform.name, platform.id, state, platform.base_url
        );
        for keyword in &platform.keywords {
            println!("    * {}", keyword);
        }
    }

    println!("\nCategories ({}):", config.categories.len());
    for category in &config.categories {
        println!("  - {} ({} keywords)", category.name, category.keywords.len());
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} of {} platform(s)",
        active.len(),
        config.platforms.len()
    );

    Ok(())
}

/// Handles the main harvest run
async fn handle_crawl(
    config: Config,
    config_hash: Option<String>,
    max_pages: u32,
    mode: CrawlMode,
    output_dir: PathBuf,
) -> anyhow::Result<()> {
    tracing::info!(
        "Starting {} harvest of {} platform(s), {} page(s) per keyword",
        mode,
        config.platforms.len(),
        max_pages
    );

    let mut orchestrator = CrawlOrchestrator::new(config)?;
    if let Some(hash) = config_hash {
        orchestrator = orchestrator.with_config_hash(hash);
    }
    if orchestrator.active_platforms().is_empty() {
        tracing::warn!("No platform could be initialized; the report will be empty");
    }

    let outcome = orchestrator.run(max_pages, mode).await;

    let sink = JsonFileSink::new(&output_dir);
    let written = save_outcome(&sink, &outcome, &run_timestamp())
        .with_context(|| format!("failed to write output to {}", output_dir.display()))?;
    tracing::info!("Wrote {} file(s) to {}", written.len(), output_dir.display());

    print_report(&outcome.report);
    Ok(())
}
