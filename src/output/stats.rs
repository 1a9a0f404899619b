//! End-of-run crawl statistics
//!
//! This module derives summary figures from a finished crawl and renders them
//! for the terminal.

use crate::state::{CrawlPhase, CrawlResult, PageStatus, StopReason};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    pub phase: CrawlPhase,

    /// Number of page records
    pub total_pages: u64,

    /// Pages with status `ok`
    pub ok_pages: u64,

    /// HTTP and fetch errors
    pub errors: u64,

    /// Total in-scope outbound links across all pages
    pub total_links: u64,

    /// Deepest recorded page
    pub max_depth: u32,

    /// Count of pages by final status
    pub pages_by_status: BTreeMap<PageStatus, u64>,

    pub stop_reason: Option<StopReason>,

    pub duration_seconds: f64,
}

impl CrawlStatistics {
    pub fn from_result(result: &CrawlResult) -> Self {
        let pages = result.pages();
        let duration_seconds = result
            .duration()
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Self {
            phase: result.phase(),
            total_pages: pages.len() as u64,
            ok_pages: pages.iter().filter(|p| p.status.is_ok()).count() as u64,
            errors: result.errors(),
            total_links: pages.iter().map(|p| p.links.len() as u64).sum(),
            max_depth: pages.iter().map(|p| p.depth).max().unwrap_or(0),
            pages_by_status: result.count_by_status(),
            stop_reason: result.stop_reason(),
            duration_seconds,
        }
    }

    /// Share of pages that ended `ok`, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_pages > 0 {
            (self.ok_pages as f64 / self.total_pages as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Formats statistics as a human-readable report
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut report = String::new();

    let _ = writeln!(report, "=== Crawl Statistics ===\n");

    let _ = writeln!(report, "Overview:");
    let _ = writeln!(report, "  Outcome: {}", stats.phase);
    if let Some(reason) = stats.stop_reason {
        let _ = writeln!(report, "  Stopped early: {}", reason);
    }
    let _ = writeln!(report, "  Pages recorded: {}", stats.total_pages);
    let _ = writeln!(report, "  Errors: {}", stats.errors);
    let _ = writeln!(report, "  Links found: {}", stats.total_links);
    let _ = writeln!(report, "  Max depth reached: {}", stats.max_depth);
    let _ = writeln!(report, "  Duration: {:.2}s", stats.duration_seconds);
    let _ = writeln!(report);

    if !stats.pages_by_status.is_empty() {
        let _ = writeln!(report, "Pages by Status:");
        let mut status_counts: Vec<_> = stats.pages_by_status.iter().collect();
        status_counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (status, count) in status_counts {
            let percentage = (*count as f64 / stats.total_pages.max(1) as f64) * 100.0;
            let _ = writeln!(report, "  {}: {} ({:.1}%)", status, count, percentage);
        }
        let _ = writeln!(report);
    }

    let _ = writeln!(
        report,
        "Success Rate: {:.1}% ({} / {} pages ok)",
        stats.success_rate(),
        stats.ok_pages,
        stats.total_pages
    );

    report
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}
