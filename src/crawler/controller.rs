//! Crawl controller - owns one crawl from seeding to its terminal state
//!
//! This module handles:
//! - Normalizing and scope-checking the seeds, and deriving the root domain
//! - Driving the `Idle -> Running -> {Completed | Truncated | Cancelled}` lifecycle
//! - Starting the fetch worker pool and collecting its page records
//! - Building the immutable crawl result

use crate::config::{validate, Config};
use crate::crawler::fetcher::{Fetcher, HttpFetcher, RateLimiter, RetryPolicy};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::parser::{HtmlLinkExtractor, LinkExtractor};
use crate::crawler::pool::{CrawlContext, WorkerPool};
use crate::robots::{AllowAll, RobotsPolicy, RobotsTxtPolicy};
use crate::state::{CrawlCounters, CrawlPhase, CrawlResult};
use crate::url::{extract_domain, Normalizer, Scope};
use crate::SitemapError;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Log a progress line every this many page records
const PROGRESS_INTERVAL: usize = 25;

/// Main crawl controller
///
/// A controller runs exactly one crawl. Configuration is read once when the
/// crawl starts; the result is available after [`Controller::run`] returns.
pub struct Controller {
    config: Config,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    robots: Option<Arc<dyn RobotsPolicy>>,
    cancel: CancellationToken,
    phase: CrawlPhase,
    result: Option<CrawlResult>,
}

impl Controller {
    /// Creates a controller with the reqwest fetcher and the scraper link extractor
    ///
    /// # Returns
    ///
    /// * `Ok(Controller)` - Ready to run
    /// * `Err(SitemapError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, SitemapError> {
        let fetcher = HttpFetcher::new(&config.user_agent)?;
        Ok(Self::with_collaborators(
            config,
            Arc::new(fetcher),
            Arc::new(HtmlLinkExtractor::new()),
        ))
    }

    /// Creates a controller around caller-supplied collaborators
    pub fn with_collaborators(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            robots: None,
            cancel: CancellationToken::new(),
            phase: CrawlPhase::Idle,
            result: None,
        }
    }

    /// Replaces the robots.txt policy
    ///
    /// Without one, `respect-robots` selects between a robots.txt-backed policy
    /// over the crawl's fetcher and allowing everything.
    pub fn with_robots(mut self, robots: Arc<dyn RobotsPolicy>) -> Self {
        self.robots = Some(robots);
        self
    }

    /// Token that cancels the crawl when triggered
    ///
    /// In-flight fetches are aborted and produce no page record; records
    /// already produced are kept.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// The crawl result, once the crawl reached a terminal phase
    pub fn result(&self) -> Option<&CrawlResult> {
        self.result.as_ref()
    }

    pub fn into_result(self) -> Option<CrawlResult> {
        self.result
    }

    /// Runs the crawl to a terminal state
    ///
    /// # Returns
    ///
    /// * `Ok(&CrawlResult)` - The crawl finished (completed, truncated or cancelled)
    /// * `Err(SitemapError::InvalidTransition)` - The controller already ran
    /// * `Err(SitemapError::NoValidSeeds)` - Every seed was malformed or out of scope;
    ///   the controller stays idle
    /// * `Err(SitemapError::Config)` - The configuration failed validation
    pub async fn run(&mut self) -> Result<&CrawlResult, SitemapError> {
        if !self.phase.can_transition_to(CrawlPhase::Running) {
            return Err(SitemapError::InvalidTransition {
                from: self.phase,
                to: CrawlPhase::Running,
            });
        }
        validate(&self.config)?;

        let normalizer = self.config.scope.normalizer();
        let (seeds, scope) = self.resolve_seeds(&normalizer)?;

        let started_at = Utc::now();
        let start = Instant::now();
        self.phase = CrawlPhase::Running;

        let crawler = &self.config.crawler;
        let max_depth = crawler.effective_max_depth();
        tracing::info!(
            "Starting crawl of {} ({} seeds, max depth {}, max pages {}, {} workers)",
            scope.root_domain,
            seeds.len(),
            max_depth.map_or("unbounded".to_string(), |d| d.to_string()),
            crawler
                .max_pages
                .map_or("unbounded".to_string(), |p| p.to_string()),
            crawler.concurrency
        );

        let limiter = Arc::new(RateLimiter::new(crawler.max_requests_per_second));
        let ctx = Arc::new(CrawlContext {
            frontier: Frontier::new(),
            counters: CrawlCounters::new(crawler.max_pages),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            robots: self.robots_policy(&limiter),
            normalizer,
            scope,
            max_depth,
            request_timeout: Duration::from_millis(crawler.request_timeout_ms),
            retry: RetryPolicy {
                max_retries: crawler.max_retries,
                base_backoff: Duration::from_millis(crawler.retry_backoff_ms),
            },
            limiter,
            cancel: self.cancel.clone(),
            wake: Notify::new(),
        });

        for seed in seeds {
            let key = seed.key().to_string();
            if !ctx.frontier.try_enqueue(seed) {
                tracing::debug!("Duplicate seed {}", key);
            }
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let pool = WorkerPool::spawn(Arc::clone(&ctx), crawler.concurrency as usize, tx);

        let mut pages = Vec::new();
        while let Some(record) = rx.recv().await {
            pages.push(record);
            if pages.len() % PROGRESS_INTERVAL == 0 {
                let rate = pages.len() as f64 / start.elapsed().as_secs_f64().max(f64::EPSILON);
                tracing::info!(
                    "Progress: {} pages recorded, {} in frontier, {:.2} pages/sec",
                    pages.len(),
                    ctx.frontier.size(),
                    rate
                );
            }
        }
        pool.join().await;

        let stop_reason = ctx.counters.stop_reason();
        let phase = stop_reason.map_or(CrawlPhase::Completed, |reason| reason.phase());
        let discarded = ctx.frontier.discard_pending();
        if discarded > 0 {
            tracing::debug!("Discarded {} pending URLs", discarded);
        }

        let result = CrawlResult::new(phase, stop_reason, pages, &ctx.counters, started_at);
        self.phase = phase;

        match stop_reason {
            Some(reason) => tracing::info!(
                "Crawl {}: {} pages recorded in {:?} ({})",
                phase,
                result.pages().len(),
                start.elapsed(),
                reason
            ),
            None => tracing::info!(
                "Crawl {}: {} pages recorded in {:?}",
                phase,
                result.pages().len(),
                start.elapsed()
            ),
        }

        Ok(self.result.insert(result))
    }

    /// Resolves the seeds and builds the crawl scope
    ///
    /// Malformed seeds and seeds outside the scope are skipped with a warning.
    /// Seeds are fetched as written (`/docs/` stays `/docs/`) and deduplicated
    /// on their URL key.
    fn resolve_seeds(
        &self,
        normalizer: &Normalizer,
    ) -> Result<(Vec<FrontierEntry>, Scope), SitemapError> {
        let attempted = self.config.seeds.len();

        let resolved: Vec<Url> = self
            .config
            .seeds
            .iter()
            .filter_map(|raw| match normalizer.resolve(raw, None) {
                Ok(url) => Some(url),
                Err(e) => {
                    tracing::warn!("Ignoring seed {:?}: {}", raw, e);
                    None
                }
            })
            .collect();

        let scope_config = &self.config.scope;
        let root_domain = match &scope_config.root_domain {
            Some(domain) => domain.to_lowercase(),
            None => match resolved.first().and_then(extract_domain) {
                Some(domain) => domain,
                None => return Err(SitemapError::NoValidSeeds { attempted }),
            },
        };

        // The directory slash of a seed bounds its prefix: `/docs/` excludes `/docsearch`
        let mut path_prefixes = scope_config.path_prefixes.clone();
        if scope_config.restrict_to_seed_paths {
            for seed in &resolved {
                let path = seed.path().to_string();
                if !path_prefixes.contains(&path) {
                    path_prefixes.push(path);
                }
            }
        }

        let scope = Scope {
            allowed_schemes: scope_config
                .allowed_schemes
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
            root_domain,
            include_subdomains: scope_config.include_subdomains,
            path_prefixes,
        };

        let seeds: Vec<FrontierEntry> = resolved
            .into_iter()
            .filter(|seed| {
                let in_scope = scope.contains(seed);
                if !in_scope {
                    tracing::warn!("Ignoring seed {}: outside the crawl scope", seed);
                }
                in_scope
            })
            .map(|seed| {
                let key = normalizer.key_of(&seed);
                FrontierEntry::keyed(seed, &key, 0)
            })
            .collect();

        if seeds.is_empty() {
            return Err(SitemapError::NoValidSeeds { attempted });
        }
        Ok((seeds, scope))
    }

    fn robots_policy(&self, limiter: &Arc<RateLimiter>) -> Arc<dyn RobotsPolicy> {
        if let Some(robots) = &self.robots {
            return Arc::clone(robots);
        }
        if self.config.crawler.respect_robots {
            Arc::new(
                RobotsTxtPolicy::new(
                    Arc::clone(&self.fetcher),
                    self.config.user_agent.crawler_name.clone(),
                    Duration::from_millis(self.config.crawler.request_timeout_ms),
                )
                .with_rate_limiter(Arc::clone(limiter)),
            )
        } else {
            Arc::new(AllowAll)
        }
    }
}
