//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageRecord`/`PageStatus`: the immutable outcome of one URL's fetch attempt
//! - `CrawlPhase`: the crawl lifecycle state machine
//! - `CrawlCounters`: atomically updated counters shared by the fetch workers
//! - `CrawlResult`: the finalized page records plus summary counters

mod crawl_state;
mod page_record;

pub use crawl_state::{CrawlCounters, CrawlPhase, CrawlResult, StopReason};
pub use page_record::{FetchErrorKind, PageRecord, PageStatus};
