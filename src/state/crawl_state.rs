use crate::state::page_record::{PageRecord, PageStatus};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle of a crawl: `Idle -> Running -> {Completed | Truncated | Cancelled}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    Idle,
    Running,
    /// The frontier drained with no worker busy
    Completed,
    /// A configured limit stopped traversal before the frontier drained
    Truncated,
    /// An external cancellation signal stopped traversal
    Cancelled,
}

impl CrawlPhase {
    /// Terminal phases are final
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Truncated | Self::Cancelled)
    }

    pub fn can_transition_to(&self, to: CrawlPhase) -> bool {
        match self {
            Self::Idle => to == Self::Running,
            Self::Running => to.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Truncated => "truncated",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why traversal stopped before the frontier drained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PageLimit { limit: u64 },
    Cancelled,
}

impl StopReason {
    /// The terminal phase this reason leads to
    pub fn phase(&self) -> CrawlPhase {
        match self {
            Self::PageLimit { .. } => CrawlPhase::Truncated,
            Self::Cancelled => CrawlPhase::Cancelled,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageLimit { limit } => write!(f, "page limit of {} reached", limit),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

const STOP_NONE: u8 = 0;
const STOP_PAGE_LIMIT: u8 = 1;
const STOP_CANCELLED: u8 = 2;

/// Counters shared by every fetch worker
///
/// Each update is a single atomic operation; no value is ever read and then
/// written back in a separate step.
#[derive(Debug)]
pub struct CrawlCounters {
    max_pages: Option<u64>,
    pages_reserved: AtomicU64,
    errors: AtomicU64,
    stop: AtomicU8,
}

impl CrawlCounters {
    pub fn new(max_pages: Option<u64>) -> Self {
        Self {
            max_pages,
            pages_reserved: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            stop: AtomicU8::new(STOP_NONE),
        }
    }

    /// Claims one page slot against the page limit
    ///
    /// Returns false once the limit is exhausted. Every successful reservation
    /// must end in exactly one page record.
    pub fn try_reserve_page(&self) -> bool {
        match self.max_pages {
            None => {
                self.pages_reserved.fetch_add(1, Ordering::AcqRel);
                true
            }
            Some(limit) => self
                .pages_reserved
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    (n < limit).then_some(n + 1)
                })
                .is_ok(),
        }
    }

    /// Returns a slot whose fetch was abandoned before producing a record
    pub fn release_page(&self) {
        let _ = self
            .pages_reserved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    pub fn max_pages(&self) -> Option<u64> {
        self.max_pages
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::AcqRel);
    }

    /// Sets the stop reason; the first caller wins and later reasons are ignored
    pub fn request_stop(&self, reason: StopReason) -> bool {
        let code = match reason {
            StopReason::PageLimit { .. } => STOP_PAGE_LIMIT,
            StopReason::Cancelled => STOP_CANCELLED,
        };
        self.stop
            .compare_exchange(STOP_NONE, code, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire) != STOP_NONE
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.stop.load(Ordering::Acquire) {
            STOP_PAGE_LIMIT => Some(StopReason::PageLimit {
                limit: self.max_pages.unwrap_or_default(),
            }),
            STOP_CANCELLED => Some(StopReason::Cancelled),
            _ => None,
        }
    }

    pub fn pages_reserved(&self) -> u64 {
        self.pages_reserved.load(Ordering::Acquire)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Acquire)
    }
}

/// The finalized outcome of a crawl
///
/// Built once the crawl reaches a terminal phase and immutable afterward.
/// Page records are ordered by completion, not discovery.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    phase: CrawlPhase,
    stop_reason: Option<StopReason>,
    pages: Vec<PageRecord>,
    pages_visited: u64,
    errors: u64,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl CrawlResult {
    pub(crate) fn new(
        phase: CrawlPhase,
        stop_reason: Option<StopReason>,
        pages: Vec<PageRecord>,
        counters: &CrawlCounters,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            phase,
            stop_reason,
            pages_visited: counters.pages_reserved(),
            errors: counters.errors(),
            pages,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    pub fn pages_visited(&self) -> u64 {
        self.pages_visited
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Looks up the record for a URL key
    pub fn page(&self, url: &str) -> Option<&PageRecord> {
        self.pages.iter().find(|p| p.url == url)
    }

    /// The set of URL keys, independent of completion order
    pub fn urls(&self) -> BTreeSet<&str> {
        self.pages.iter().map(|p| p.url.as_str()).collect()
    }

    pub fn count_by_status(&self) -> BTreeMap<PageStatus, u64> {
        let mut counts = BTreeMap::new();
        for page in &self.pages {
            *counts.entry(page.status).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_phase_transitions() {
        assert!(CrawlPhase::Idle.can_transition_to(CrawlPhase::Running));
        assert!(!CrawlPhase::Idle.can_transition_to(CrawlPhase::Completed));
        assert!(CrawlPhase::Running.can_transition_to(CrawlPhase::Completed));
        assert!(CrawlPhase::Running.can_transition_to(CrawlPhase::Truncated));
        assert!(CrawlPhase::Running.can_transition_to(CrawlPhase::Cancelled));
        assert!(!CrawlPhase::Running.can_transition_to(CrawlPhase::Idle));

        for terminal in [
            CrawlPhase::Completed,
            CrawlPhase::Truncated,
            CrawlPhase::Cancelled,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(CrawlPhase::Running));
        }
    }

    #[test]
    fn test_reserve_unbounded() {
        let counters = CrawlCounters::new(None);
        for _ in 0..100 {
            assert!(counters.try_reserve_page());
        }
        assert_eq!(counters.pages_reserved(), 100);
    }

    #[test]
    fn test_reserve_respects_limit() {
        let counters = CrawlCounters::new(Some(2));
        assert!(counters.try_reserve_page());
        assert!(counters.try_reserve_page());
        assert!(!counters.try_reserve_page());
        assert_eq!(counters.pages_reserved(), 2);
    }

    #[test]
    fn test_reserve_is_exact_under_contention() {
        let counters = Arc::new(CrawlCounters::new(Some(50)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = Arc::clone(&counters);
                std::thread::spawn(move || (0..100).filter(|_| counters.try_reserve_page()).count())
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 50);
        assert_eq!(counters.pages_reserved(), 50);
    }

    #[test]
    fn test_first_stop_reason_wins() {
        let counters = CrawlCounters::new(Some(3));
        assert!(!counters.is_stopped());
        assert!(counters.request_stop(StopReason::PageLimit { limit: 3 }));
        assert!(!counters.request_stop(StopReason::Cancelled));
        assert_eq!(
            counters.stop_reason(),
            Some(StopReason::PageLimit { limit: 3 })
        );
        assert_eq!(
            counters.stop_reason().map(|r| r.phase()),
            Some(CrawlPhase::Truncated)
        );
    }

    #[test]
    fn test_result_summary() {
        let counters = CrawlCounters::new(None);
        counters.try_reserve_page();
        counters.try_reserve_page();
        counters.record_error();

        let pages = vec![
            PageRecord::ok("https://example.com/".into(), 200, 0, vec![]),
            PageRecord::http_error("https://example.com/gone".into(), 404, 1),
        ];
        let result = CrawlResult::new(CrawlPhase::Completed, None, pages, &counters, Utc::now());

        assert_eq!(result.pages_visited(), 2);
        assert_eq!(result.errors(), 1);
        assert!(result.page("https://example.com/gone").is_some());
        assert_eq!(result.urls().len(), 2);
        assert_eq!(result.count_by_status().get(&PageStatus::Ok), Some(&1));
    }
}
