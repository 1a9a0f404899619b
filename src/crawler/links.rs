//! Link extraction adapter
//!
//! Turns a fetched page body into the list of crawlable outbound links:
//! raw hrefs from the [`LinkExtractor`] are resolved against the page URL,
//! filtered by scope and deduplicated on their URL key.

use crate::crawler::parser::LinkExtractor;
use crate::url::{Normalizer, Scope};
use std::collections::HashSet;
use url::Url;

/// An outbound link of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    /// The link as resolved, trailing slash as written; this is what gets fetched
    pub url: Url,

    /// The URL key
    pub key: Url,
}

/// Extracts the in-scope outbound links of a page
///
/// # Arguments
///
/// * `extractor` - Produces the raw hyperlink targets of the body
/// * `body` - The page body
/// * `base` - The URL the page was requested at; relative links resolve against it
/// * `normalizer` - Canonicalizes each link and derives its URL key
/// * `scope` - Links outside the crawl scope are dropped
///
/// # Returns
///
/// Links in document order, each URL key at most once; the first spelling of
/// a key wins. A page linking to itself keeps that link. Malformed links are
/// skipped, never reported.
pub fn candidate_links(
    extractor: &dyn LinkExtractor,
    body: &[u8],
    base: &Url,
    normalizer: &Normalizer,
    scope: &Scope,
) -> Vec<CandidateLink> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for raw in extractor.extract_links(body) {
        let resolved = match normalizer.resolve(&raw, Some(base)) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("Skipping link {:?} on {}: {}", raw, base, e);
                continue;
            }
        };

        if !scope.contains(&resolved) {
            tracing::debug!("Out of scope: {} (linked from {})", resolved, base);
            continue;
        }

        let key = normalizer.key_of(&resolved);
        if seen.insert(key.as_str().to_string()) {
            links.push(CandidateLink { url: resolved, key });
        }
    }

    links
}
