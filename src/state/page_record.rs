/// Page record definitions: the immutable outcome of one URL's fetch attempt
use std::fmt;

/// Transport-level failure classes reported by a fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetchErrorKind {
    /// The request did not complete within the per-request timeout
    Timeout,
    /// The host name could not be resolved
    Dns,
    /// The connection was refused, reset, or failed the TLS handshake
    Connection,
    /// Anything else (redirect loops, body read errors, ...)
    Other,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Dns => "dns",
            Self::Connection => "connection",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final status of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageStatus {
    /// 2xx with an HTML body; links were extracted
    Ok,

    /// 2xx but not HTML (PDF, image, ...); never expanded
    NotHtml,

    /// Non-2xx response
    HttpError(u16),

    /// Network/transport failure after all retries
    FetchError(FetchErrorKind),
}

impl PageStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns true for statuses counted as crawl errors
    pub fn is_error(&self) -> bool {
        matches!(self, Self::HttpError(_) | Self::FetchError(_))
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::NotHtml => f.write_str("not html"),
            Self::HttpError(code) => write!(f, "http error:{}", code),
            Self::FetchError(kind) => write!(f, "fetch error:{}", kind),
        }
    }
}

/// The outcome of one URL's fetch attempt
///
/// Created exactly once per URL key, when the fetch attempt reaches a terminal
/// outcome, and never changed afterward. Outside the crate it is read through
/// its accessors only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub(crate) url: String,
    pub(crate) status: PageStatus,
    pub(crate) http_status: Option<u16>,
    pub(crate) depth: u32,
    pub(crate) links: Vec<String>,
}

impl PageRecord {
    /// The canonical URL key
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> PageStatus {
        self.status
    }

    /// HTTP status code, when a response was received
    pub fn http_status(&self) -> Option<u16> {
        self.http_status
    }

    /// Distance from the nearest seed (seeds are depth 0)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// URL keys of the in-scope outbound links, in document order, without repeats
    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn ok(url: String, http_status: u16, depth: u32, links: Vec<String>) -> Self {
        Self {
            url,
            status: PageStatus::Ok,
            http_status: Some(http_status),
            depth,
            links,
        }
    }

    pub fn not_html(url: String, http_status: u16, depth: u32) -> Self {
        Self {
            url,
            status: PageStatus::NotHtml,
            http_status: Some(http_status),
            depth,
            links: Vec::new(),
        }
    }

    pub fn http_error(url: String, http_status: u16, depth: u32) -> Self {
        Self {
            url,
            status: PageStatus::HttpError(http_status),
            http_status: Some(http_status),
            depth,
            links: Vec::new(),
        }
    }

    pub fn fetch_error(url: String, kind: FetchErrorKind, depth: u32) -> Self {
        Self {
            url,
            status: PageStatus::FetchError(kind),
            http_status: None,
            depth,
            links: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(PageStatus::Ok.to_string(), "ok");
        assert_eq!(PageStatus::NotHtml.to_string(), "not html");
        assert_eq!(PageStatus::HttpError(404).to_string(), "http error:404");
        assert_eq!(
            PageStatus::FetchError(FetchErrorKind::Connection).to_string(),
            "fetch error:connection"
        );
        assert_eq!(
            PageStatus::FetchError(FetchErrorKind::Timeout).to_string(),
            "fetch error:timeout"
        );
    }

    #[test]
    fn test_is_error() {
        assert!(PageStatus::HttpError(500).is_error());
        assert!(PageStatus::FetchError(FetchErrorKind::Dns).is_error());

        assert!(!PageStatus::Ok.is_error());
        assert!(!PageStatus::NotHtml.is_error());
    }

    #[test]
    fn test_constructors() {
        let ok = PageRecord::ok("https://example.com/".into(), 200, 0, vec!["x".into()]);
        assert!(ok.status.is_ok());
        assert_eq!(ok.http_status, Some(200));
        assert_eq!(ok.links.len(), 1);

        let missing = PageRecord::http_error("https://example.com/gone".into(), 404, 1);
        assert_eq!(missing.status, PageStatus::HttpError(404));
        assert!(missing.links.is_empty());

        let failed = PageRecord::fetch_error("https://example.com/".into(), FetchErrorKind::Dns, 0);
        assert_eq!(failed.http_status(), None);
        assert_eq!(failed.url(), "https://example.com/");
        assert_eq!(failed.depth(), 0);
    }
}
