//! Sitemap-Ripple main entry point
//!
//! This is the command-line interface for the Sitemap-Ripple crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use sitemap_ripple::config::{load_config, validate, Config, OutputFormat};
use sitemap_ripple::crawler::Controller;
use sitemap_ripple::output::{print_statistics, write_output, CrawlStatistics};
use sitemap_ripple::{CrawlPhase, SitemapError};
use tracing_subscriber::EnvFilter;

/// Sitemap-Ripple: a bounded, concurrent sitemap crawler
///
/// Sitemap-Ripple starts from one or more seed URLs, follows in-scope links
/// breadth-first and writes a sitemap of every page it reached.
#[derive(Parser, Debug)]
#[command(name = "sitemap-ripple")]
#[command(version)]
#[command(about = "A bounded, concurrent sitemap crawler", long_about = None)]
struct Cli {
    /// Seed URLs (added to any seeds from the config file)
    #[arg(value_name = "URL")]
    seeds: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Follow links beyond the seed pages
    #[arg(short, long)]
    recursive: bool,

    /// Maximum link depth from the seeds
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Stop after this many pages
    #[arg(long, value_name = "N")]
    max_pages: Option<u64>,

    /// Number of concurrent fetch workers
    #[arg(short = 'j', long, value_name = "N")]
    concurrency: Option<u32>,

    /// Per-request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Retries after a network failure
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Global cap on requests per second
    #[arg(long, value_name = "RPS")]
    rate_limit: Option<f64>,

    /// Treat subdomains of the root domain as in scope
    #[arg(long)]
    include_subdomains: bool,

    /// Only follow URLs whose path starts with this prefix (repeatable)
    #[arg(long = "path-prefix", value_name = "PREFIX")]
    path_prefixes: Vec<String>,

    /// Skip URLs disallowed by robots.txt
    #[arg(long)]
    respect_robots: bool,

    /// Output file path
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Print crawl statistics when done
    #[arg(long)]
    stats: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Xml,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xml => OutputFormat::Xml,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

/// Exit status when every seed was rejected
const EXIT_NO_VALID_SEEDS: u8 = 2;

/// Conventional exit status after SIGINT
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return ExitCode::SUCCESS;
    }

    match handle_crawl(config, cli.stats).await {
        Ok(CrawlPhase::Cancelled) => ExitCode::from(EXIT_CANCELLED),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            match e.downcast_ref::<SitemapError>() {
                Some(SitemapError::NoValidSeeds { .. }) => ExitCode::from(EXIT_NO_VALID_SEEDS),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitemap_ripple=info,warn"),
            1 => EnvFilter::new("sitemap_ripple=debug,info"),
            2 => EnvFilter::new("sitemap_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file (if any), applies command-line overrides and validates
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    config.seeds.extend(cli.seeds.iter().cloned());

    let crawler = &mut config.crawler;
    crawler.recursive |= cli.recursive;
    crawler.respect_robots |= cli.respect_robots;
    if cli.max_depth.is_some() {
        crawler.max_depth = cli.max_depth;
    }
    if cli.max_pages.is_some() {
        crawler.max_pages = cli.max_pages;
    }
    if let Some(concurrency) = cli.concurrency {
        crawler.concurrency = concurrency;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        crawler.request_timeout_ms = timeout_ms;
    }
    if let Some(retries) = cli.retries {
        crawler.max_retries = retries;
    }
    if cli.rate_limit.is_some() {
        crawler.max_requests_per_second = cli.rate_limit;
    }

    config.scope.include_subdomains |= cli.include_subdomains;
    config
        .scope
        .path_prefixes
        .extend(cli.path_prefixes.iter().cloned());

    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
    }
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }

    validate(&config).context("invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Sitemap-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Recursive: {}", config.crawler.recursive);
    println!(
        "  Max depth: {}",
        describe_limit(config.crawler.effective_max_depth())
    );
    println!("  Max pages: {}", describe_limit(config.crawler.max_pages));
    println!("  Workers: {}", config.crawler.concurrency);
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);

    println!("\nScope:");
    println!(
        "  Root domain: {}",
        config
            .scope
            .root_domain
            .as_deref()
            .unwrap_or("(host of the first valid seed)")
    );
    println!("  Include subdomains: {}", config.scope.include_subdomains);
    for prefix in &config.scope.path_prefixes {
        println!("  Path prefix: {}", prefix);
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());
    println!("Output: {} ({:?})", config.output.path, config.output.format);

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }
}

fn describe_limit<T: std::fmt::Display>(limit: Option<T>) -> String {
    limit.map_or_else(|| "unbounded".to_string(), |l| l.to_string())
}

/// Handles the main crawl operation
///
/// The output is written for every terminal phase, so an interrupted crawl
/// still leaves a (partial) sitemap behind.
async fn handle_crawl(config: Config, show_stats: bool) -> anyhow::Result<CrawlPhase> {
    let output_config = config.clone();
    let mut controller = Controller::new(config).context("failed to start crawler")?;

    let cancel = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            cancel.cancel();
        }
    });

    let result = controller.run().await?;

    let output_path = &output_config.output.path;
    write_output(result, &output_config, Path::new(output_path))
        .with_context(|| format!("failed to write {}", output_path))?;

    if show_stats {
        print_statistics(&CrawlStatistics::from_result(result));
    }

    Ok(result.phase())
}
