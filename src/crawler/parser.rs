//! HTML link extraction
//!
//! The crawl engine only ever sees raw hyperlink target strings; everything
//! parser-specific stays behind the `LinkExtractor` trait.

use scraper::{Html, Selector};

/// A single-use sequence of raw hyperlink targets, in document order
pub type RawLinks = Box<dyn Iterator<Item = String> + Send>;

/// Turns a document body into the raw `href` strings found in it
///
/// Never fails: malformed markup yields whatever could be recovered.
pub trait LinkExtractor: Send + Sync {
    fn extract_links(&self, body: &[u8]) -> RawLinks;
}

/// Link extractor backed by scraper (html5ever)
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">`
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - empty or whitespace-only `href` values
/// - anything that is not a hyperlink (`<script src>`, `<img src>`, stylesheets)
///
/// Scheme filtering (`mailto:`, `javascript:` ...) and relative resolution
/// happen later, during normalization.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkExtractor;

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, body: &[u8]) -> RawLinks {
        let html = String::from_utf8_lossy(body);
        let document = Html::parse_document(&html);

        let selector = match Selector::parse(r#"a[href], link[rel~="canonical"][href]"#) {
            Ok(selector) => selector,
            Err(_) => return Box::new(std::iter::empty()),
        };

        let links: Vec<String> = document
            .select(&selector)
            .filter(|element| {
                // Download anchors point at files, not pages
                !(element.value().name() == "a" && element.value().attr("download").is_some())
            })
            .filter_map(|element| element.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .map(str::to_string)
            .collect();

        Box::new(links.into_iter())
    }
}
