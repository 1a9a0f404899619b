//! Frontier: the pending-URL queue plus the seen-set that deduplicates it
//!
//! This module handles:
//! - Atomic check-and-insert against the seen-set
//! - FIFO dequeue, which yields breadth-first traversal order
//! - In-flight accounting, so "nothing pending and nobody busy" is observable
//!   as one consistent fact

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// The resolved URL that is fetched; relative links on the page resolve against it
    pub url: Url,

    /// The URL key the seen-set deduplicates on
    key: String,

    /// Seeds are depth 0, discovered links are parent depth + 1
    pub depth: u32,
}

impl FrontierEntry {
    /// An entry whose fetch target is also its key
    pub fn new(url: Url, depth: u32) -> Self {
        let key = url.as_str().to_string();
        Self { url, key, depth }
    }

    /// An entry fetched at `url` but deduplicated under `key`
    pub fn keyed(url: Url, key: &Url, depth: u32) -> Self {
        Self {
            url,
            key: key.as_str().to_string(),
            depth,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Default)]
struct FrontierInner {
    seen: HashSet<String>,
    pending: VecDeque<FrontierEntry>,
    in_flight: usize,
}

/// The crawl frontier
///
/// All state sits behind one mutex, so every operation is a single atomic
/// step. The seen-set only grows: an entry is enqueued at most once over the
/// crawl's lifetime, even if the queue has long since released it.
#[derive(Debug, Default)]
pub struct Frontier {
    inner: Mutex<FrontierInner>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues an entry unless its URL key was ever seen before
    ///
    /// Under concurrent callers exactly one caller per URL key gets `true`.
    pub fn try_enqueue(&self, entry: FrontierEntry) -> bool {
        let mut inner = self.lock();
        if !inner.seen.insert(entry.key().to_string()) {
            return false;
        }
        inner.pending.push_back(entry);
        true
    }

    /// Removes the oldest pending entry and marks it in flight
    ///
    /// Every `Some` must be paired with one [`Frontier::complete`] call once the
    /// caller is done with the entry (including enqueuing its links).
    pub fn dequeue(&self) -> Option<FrontierEntry> {
        let mut inner = self.lock();
        let entry = inner.pending.pop_front()?;
        inner.in_flight += 1;
        Some(entry)
    }

    /// Releases an entry previously handed out by [`Frontier::dequeue`]
    pub fn complete(&self) {
        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);
    }

    /// True when nothing is pending and no dequeued entry is still in flight
    pub fn is_drained(&self) -> bool {
        let inner = self.lock();
        inner.pending.is_empty() && inner.in_flight == 0
    }

    /// Drops every pending entry, returning how many were discarded
    ///
    /// Discarded URLs stay in the seen-set.
    pub fn discard_pending(&self) -> usize {
        let mut inner = self.lock();
        let discarded = inner.pending.len();
        inner.pending.clear();
        discarded
    }

    /// Number of pending entries
    pub fn size(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }

    /// Number of URL keys ever scheduled
    pub fn seen_count(&self) -> usize {
        self.lock().seen.len()
    }

    pub fn has_seen(&self, key: &str) -> bool {
        self.lock().seen.contains(key)
    }
}
