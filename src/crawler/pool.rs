//! Fetch worker pool
//!
//! A fixed number of tokio tasks pull entries from the shared frontier,
//! fetch them, enqueue their in-scope links and send one page record per
//! fetched URL back to the controller. Workers exit once the frontier is
//! drained (nothing pending, nobody in flight) or a stop reason is set.

use crate::crawler::fetcher::{fetch_with_retry, FetchOutcome, Fetcher, RateLimiter, RetryPolicy};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::links::{candidate_links, CandidateLink};
use crate::crawler::parser::LinkExtractor;
use crate::robots::RobotsPolicy;
use crate::state::{CrawlCounters, PageRecord, StopReason};
use crate::url::{Normalizer, Scope};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Upper bound on how long an idle worker sleeps before rechecking the frontier
const IDLE_PARK: Duration = Duration::from_millis(50);

/// Everything the workers of one crawl share
pub(crate) struct CrawlContext {
    pub(crate) frontier: Frontier,
    pub(crate) counters: CrawlCounters,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    pub(crate) extractor: Arc<dyn LinkExtractor>,
    pub(crate) robots: Arc<dyn RobotsPolicy>,
    pub(crate) normalizer: Normalizer,
    pub(crate) scope: Scope,
    /// `None` = unbounded, `Some(0)` = root-only mode
    pub(crate) max_depth: Option<u32>,
    pub(crate) request_timeout: Duration,
    pub(crate) retry: RetryPolicy,
    /// Shared with the robots.txt policy, so its downloads count against the cap
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) cancel: CancellationToken,
    /// Wakes parked workers when new work arrives or the crawl winds down
    pub(crate) wake: Notify,
}

impl CrawlContext {
    fn within_depth(&self, depth: u32) -> bool {
        self.max_depth.map_or(true, |max| depth <= max)
    }
}

/// Marks a dequeued entry complete when dropped, even if the worker panics
struct InFlight<'a> {
    ctx: &'a CrawlContext,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.ctx.frontier.complete();
        self.ctx.wake.notify_waiters();
    }
}

/// The running workers of one crawl
pub(crate) struct WorkerPool {
    workers: JoinSet<()>,
}

impl WorkerPool {
    /// Spawns `size` workers; each holds a clone of `records`
    ///
    /// The record channel closes once every worker has exited.
    pub(crate) fn spawn(
        ctx: Arc<CrawlContext>,
        size: usize,
        records: UnboundedSender<PageRecord>,
    ) -> Self {
        let mut workers = JoinSet::new();
        for id in 0..size.max(1) {
            let ctx = Arc::clone(&ctx);
            let records = records.clone();
            workers.spawn(async move { run_worker(id, ctx, records).await });
        }
        Self { workers }
    }

    /// Waits for every worker to exit
    pub(crate) async fn join(mut self) {
        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Fetch worker terminated abnormally: {}", e);
            }
        }
    }
}

async fn run_worker(id: usize, ctx: Arc<CrawlContext>, records: UnboundedSender<PageRecord>) {
    tracing::trace!("Worker {} started", id);

    loop {
        if ctx.cancel.is_cancelled() {
            if ctx.counters.request_stop(StopReason::Cancelled) {
                tracing::info!("Cancellation requested, stopping workers");
            }
            ctx.wake.notify_waiters();
            break;
        }
        if ctx.counters.is_stopped() {
            ctx.wake.notify_waiters();
            break;
        }

        let entry = match ctx.frontier.dequeue() {
            Some(entry) => entry,
            None => {
                if ctx.frontier.is_drained() {
                    ctx.wake.notify_waiters();
                    break;
                }
                // Another worker is still busy and may enqueue more links
                tracing::trace!("Worker {} parked", id);
                tokio::select! {
                    _ = ctx.cancel.cancelled() => {}
                    _ = ctx.wake.notified() => {}
                    _ = tokio::time::sleep(IDLE_PARK) => {}
                }
                continue;
            }
        };

        let _in_flight = InFlight { ctx: &ctx };
        if let Some(record) = process_entry(&ctx, &entry).await {
            if records.send(record).is_err() {
                tracing::warn!("Record receiver dropped, worker {} exiting", id);
                break;
            }
        }
    }

    tracing::trace!("Worker {} finished", id);
}

/// Fetches one entry and turns the outcome into its page record
///
/// Returns `None` when the entry produces no record: too deep, disallowed by
/// robots.txt, refused by the page limit, or aborted by cancellation.
async fn process_entry(ctx: &CrawlContext, entry: &FrontierEntry) -> Option<PageRecord> {
    let key = entry.key().to_string();

    if !ctx.within_depth(entry.depth) {
        tracing::debug!("Skipping {} at depth {}: beyond max depth", key, entry.depth);
        return None;
    }

    let allowed = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => return None,
        allowed = ctx.robots.is_allowed(&entry.url) => allowed,
    };
    if !allowed {
        tracing::debug!("Skipping {}: disallowed by robots.txt", key);
        return None;
    }

    if !ctx.counters.try_reserve_page() {
        let limit = ctx.counters.max_pages().unwrap_or_default();
        if ctx.counters.request_stop(StopReason::PageLimit { limit }) {
            tracing::info!("Page limit of {} reached, stopping crawl", limit);
        }
        return None;
    }

    tracing::debug!("Fetching {} (depth {})", key, entry.depth);
    let outcome = fetch_with_retry(
        ctx.fetcher.as_ref(),
        &entry.url,
        ctx.request_timeout,
        ctx.retry,
        &ctx.limiter,
        &ctx.cancel,
    )
    .await;

    let record = match outcome {
        FetchOutcome::Cancelled => {
            ctx.counters.release_page();
            ctx.counters.request_stop(StopReason::Cancelled);
            return None;
        }
        FetchOutcome::Failed(error) => {
            tracing::warn!("Failed to fetch {}: {}", key, error);
            ctx.counters.record_error();
            PageRecord::fetch_error(key, error.kind, entry.depth)
        }
        FetchOutcome::Response(response) if !response.is_success() => {
            tracing::debug!("HTTP {} for {}", response.status_code, key);
            ctx.counters.record_error();
            PageRecord::http_error(key, response.status_code, entry.depth)
        }
        FetchOutcome::Response(response) if !response.is_html() => {
            tracing::debug!(
                "Not expanding {}: content type {:?}",
                key,
                response.content_type
            );
            PageRecord::not_html(key, response.status_code, entry.depth)
        }
        FetchOutcome::Response(response) => {
            let links = candidate_links(
                ctx.extractor.as_ref(),
                &response.body,
                &entry.url,
                &ctx.normalizer,
                &ctx.scope,
            );
            enqueue_links(ctx, &links, entry.depth + 1);
            PageRecord::ok(
                key,
                response.status_code,
                entry.depth,
                links.iter().map(|link| link.key.as_str().to_string()).collect(),
            )
        }
    };

    Some(record)
}

fn enqueue_links(ctx: &CrawlContext, links: &[CandidateLink], depth: u32) {
    if !ctx.within_depth(depth) {
        return;
    }

    let mut added = 0;
    for link in links {
        if ctx.counters.is_stopped() {
            break;
        }
        if ctx
            .frontier
            .try_enqueue(FrontierEntry::keyed(link.url.clone(), &link.key, depth))
        {
            added += 1;
        }
    }

    if added > 0 {
        ctx.wake.notify_waiters();
    }
}
