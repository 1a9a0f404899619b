//! sitemaps.org XML sitemap generation

use crate::config::OutputConfig;
use crate::output::traits::{Emitter, OutputError, OutputResult};
use crate::state::{CrawlResult, PageRecord};
use crate::url::Normalizer;
use std::collections::HashSet;
use std::io::Write;

const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Writes a `<urlset>` document
///
/// Entries are sorted by URL key so repeated crawls of an unchanged site
/// produce identical files (apart from `<lastmod>`). Only `ok` pages are listed
/// unless `include_errors` is set.
#[derive(Debug, Clone)]
pub struct XmlSitemapEmitter {
    pub changefreq: String,
    pub default_priority: f32,
    /// URL keys emitted with priority 1.0
    pub priority_urls: HashSet<String>,
    pub include_errors: bool,
}

impl Default for XmlSitemapEmitter {
    fn default() -> Self {
        Self::from_config(&OutputConfig::default(), &Normalizer::default())
    }
}

impl XmlSitemapEmitter {
    /// Builds an emitter from output settings
    ///
    /// Priority URLs go through the crawl's normalizer so they compare equal
    /// to page URL keys; entries that do not parse are kept verbatim.
    pub fn from_config(config: &OutputConfig, normalizer: &Normalizer) -> Self {
        let priority_urls = config
            .priority_urls
            .iter()
            .map(|raw| match normalizer.normalize(raw, None) {
                Ok(url) => url.to_string(),
                Err(_) => raw.clone(),
            })
            .collect();

        Self {
            changefreq: config.changefreq.clone(),
            default_priority: config.default_priority,
            priority_urls,
            include_errors: config.include_errors,
        }
    }

    fn priority_for(&self, record: &PageRecord) -> f32 {
        if self.priority_urls.contains(&record.url) {
            1.0
        } else {
            self.default_priority
        }
    }

    fn listed<'a>(&self, result: &'a CrawlResult) -> Vec<&'a PageRecord> {
        let mut pages: Vec<&PageRecord> = result
            .pages()
            .iter()
            .filter(|page| self.include_errors || page.status.is_ok())
            .collect();
        pages.sort_by(|a, b| a.url.cmp(&b.url));
        pages
    }
}

impl Emitter for XmlSitemapEmitter {
    fn emit(&self, result: &CrawlResult, out: &mut dyn Write) -> OutputResult<()> {
        if !(0.0..=1.0).contains(&self.default_priority) {
            return Err(OutputError::Format(format!(
                "priority must be within 0.0..=1.0, got {}",
                self.default_priority
            )));
        }

        let lastmod = result.finished_at().format("%Y-%m-%d").to_string();
        let changefreq = escape_xml(&self.changefreq);

        writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(out, "<!-- {} -->", outcome_comment(result))?;
        writeln!(out, r#"<urlset xmlns="{}">"#, SITEMAP_NAMESPACE)?;

        for page in self.listed(result) {
            writeln!(out, "  <url>")?;
            writeln!(out, "    <loc>{}</loc>", escape_xml(&page.url))?;
            writeln!(out, "    <lastmod>{}</lastmod>", lastmod)?;
            writeln!(out, "    <changefreq>{}</changefreq>", changefreq)?;
            writeln!(out, "    <priority>{:.2}</priority>", self.priority_for(page))?;
            writeln!(out, "  </url>")?;
        }

        writeln!(out, "</urlset>")?;
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "xml"
    }
}

/// One-line crawl outcome, safe to embed in an XML comment
fn outcome_comment(result: &CrawlResult) -> String {
    let mut comment = format!(
        "crawl {}: {} pages, {} errors",
        result.phase(),
        result.pages().len(),
        result.errors()
    );
    if let Some(reason) = result.stop_reason() {
        comment.push_str(&format!(" ({})", reason));
    }
    comment.replace("--", "- -")
}

/// Escapes the five XML special characters
pub fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
