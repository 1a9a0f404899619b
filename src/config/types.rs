use crate::url::{Normalizer, TrailingSlash};
use serde::Deserialize;

/// Main configuration structure for Sitemap-Ripple
///
/// Every section is optional in the TOML file; command-line flags are merged
/// on top before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seed URLs the crawl starts from (depth 0)
    pub seeds: Vec<String>,
    pub crawler: CrawlerConfig,
    pub scope: ScopeConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Follow links beyond the seeds; `false` fetches only the seeds
    pub recursive: bool,

    /// Maximum depth to crawl from seed URLs (unbounded when absent)
    #[serde(rename = "max-depth")]
    pub max_depth: Option<u32>,

    /// Maximum number of page records (unbounded when absent)
    #[serde(rename = "max-pages")]
    pub max_pages: Option<u64>,

    /// Number of concurrent fetch workers
    pub concurrency: u32,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    /// Retries after a transport failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Base delay for exponential retry backoff (milliseconds)
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Global request rate cap
    #[serde(rename = "max-requests-per-second")]
    pub max_requests_per_second: Option<f64>,

    /// Consult robots.txt before fetching
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            max_depth: None,
            max_pages: None,
            concurrency: 8,
            request_timeout_ms: 10_000,
            max_retries: 0,
            retry_backoff_ms: 500,
            max_requests_per_second: None,
            respect_robots: false,
        }
    }
}

impl CrawlerConfig {
    /// Depth limit in effect, read once when a crawl starts
    ///
    /// Root-only mode pins the limit to 0 regardless of `max_depth`.
    pub fn effective_max_depth(&self) -> Option<u32> {
        if self.recursive {
            self.max_depth
        } else {
            Some(0)
        }
    }
}

/// Crawl boundary configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    #[serde(rename = "allowed-schemes")]
    pub allowed_schemes: Vec<String>,

    /// Root domain; the host of the first valid seed when absent
    #[serde(rename = "root-domain")]
    pub root_domain: Option<String>,

    /// Treat subdomains of the root domain as in scope
    #[serde(rename = "include-subdomains")]
    pub include_subdomains: bool,

    #[serde(rename = "path-prefixes")]
    pub path_prefixes: Vec<String>,

    /// Add every seed's path to the path prefixes
    #[serde(rename = "restrict-to-seed-paths")]
    pub restrict_to_seed_paths: bool,

    #[serde(rename = "trailing-slash")]
    pub trailing_slash: TrailingSlash,

    #[serde(rename = "strip-tracking-params")]
    pub strip_tracking_params: bool,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
            root_domain: None,
            include_subdomains: false,
            path_prefixes: Vec::new(),
            restrict_to_seed_paths: false,
            trailing_slash: TrailingSlash::Strip,
            strip_tracking_params: false,
        }
    }
}

impl ScopeConfig {
    /// The normalizer every URL of a crawl (and its output) goes through
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.trailing_slash, self.strip_tracking_params)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "sitemap-ripple".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Sitemap serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xml,
    Text,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the sitemap file
    pub path: String,

    pub format: OutputFormat,

    /// `<changefreq>` written for every entry
    pub changefreq: String,

    /// `<priority>` for entries not listed in `priority_urls`
    #[serde(rename = "default-priority")]
    pub default_priority: f32,

    /// URLs emitted with priority 1.0
    #[serde(rename = "priority-urls")]
    pub priority_urls: Vec<String>,

    /// Also list non-ok page records in the XML sitemap
    #[serde(rename = "include-errors")]
    pub include_errors: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "sitemap.xml".to_string(),
            format: OutputFormat::Xml,
            changefreq: "daily".to_string(),
            default_priority: 0.8,
            priority_urls: Vec::new(),
            include_errors: false,
        }
    }
}
