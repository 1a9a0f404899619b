//! Crawler module: the crawl engine
//!
//! This module contains the core crawling logic, including:
//! - The deduplicating frontier
//! - HTTP fetching with timeouts, retries and a rate cap
//! - HTML link extraction and the link adapter that normalizes and filters links
//! - The fetch worker pool
//! - Overall crawl control

mod controller;
mod fetcher;
mod frontier;
mod links;
mod parser;
mod pool;

#[cfg(test)]
pub(crate) mod test_support;

pub use controller::Controller;
pub use fetcher::{
    build_http_client, fetch_with_retry, FetchError, FetchOutcome, FetchResponse, Fetcher,
    HttpFetcher, RateLimiter, RetryPolicy, MIN_REQUESTS_PER_SECOND,
};
pub use frontier::{Frontier, FrontierEntry};
pub use links::{candidate_links, CandidateLink};
pub use parser::{HtmlLinkExtractor, LinkExtractor, RawLinks};

use crate::config::Config;
use crate::state::CrawlResult;
use crate::SitemapError;

/// Runs a complete crawl with the default collaborators
///
/// This is the main entry point for a one-shot crawl. It will:
/// 1. Build the HTTP client
/// 2. Normalize and scope-check the seeds
/// 3. Fetch pages and follow in-scope links with the worker pool
/// 4. Return the finalized crawl result
///
/// Use [`Controller`] directly to cancel a crawl or to supply other collaborators.
pub async fn crawl(config: Config) -> Result<CrawlResult, SitemapError> {
    let mut controller = Controller::new(config)?;
    let result = controller.run().await?;
    Ok(result.clone())
}
