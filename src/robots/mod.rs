//! Robots.txt handling module
//!
//! A minimal allow/deny gate consulted before a URL is fetched. The crawl
//! engine only sees the [`RobotsPolicy`] trait; disallowed URLs are skipped
//! without a page record, the same way out-of-scope links are.

mod parser;

pub use parser::RobotsRules;

use crate::crawler::{FetchResponse, Fetcher, RateLimiter};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// Decides whether a URL may be fetched
#[async_trait]
pub trait RobotsPolicy: Send + Sync {
    async fn is_allowed(&self, url: &Url) -> bool;
}

/// Policy that allows every URL
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl RobotsPolicy for AllowAll {
    async fn is_allowed(&self, _url: &Url) -> bool {
        true
    }
}

/// Policy backed by each origin's `/robots.txt`
///
/// robots.txt is fetched once per origin through the crawl's own fetcher and
/// cached for the rest of the crawl. A missing, failing or non-2xx robots.txt
/// allows everything. Callers only wait on the download for their own origin.
pub struct RobotsTxtPolicy {
    fetcher: Arc<dyn Fetcher>,
    agent: String,
    timeout: Duration,
    limiter: Arc<RateLimiter>,
    cache: Mutex<HashMap<String, Arc<OnceCell<RobotsRules>>>>,
}

impl RobotsTxtPolicy {
    /// # Arguments
    ///
    /// * `fetcher` - Used to download robots.txt files
    /// * `agent` - Product token matched against `User-agent` lines
    /// * `timeout` - Per-request timeout for robots.txt downloads
    pub fn new(fetcher: Arc<dyn Fetcher>, agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            fetcher,
            agent: agent.into(),
            timeout,
            limiter: Arc::new(RateLimiter::unlimited()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Counts robots.txt downloads against the crawl's request rate cap
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// The cache slot of the URL's origin
    fn slot_for(&self, url: &Url) -> Arc<OnceCell<RobotsRules>> {
        let origin = url.origin().ascii_serialization();
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(origin).or_default())
    }

    async fn download(&self, url: &Url) -> RobotsRules {
        let robots_url = match url.join("/robots.txt") {
            Ok(robots_url) => robots_url,
            Err(_) => return RobotsRules::allow_all(),
        };

        self.limiter.acquire().await;
        let fetched =
            tokio::time::timeout(self.timeout, self.fetcher.fetch(&robots_url, self.timeout))
                .await;

        match fetched {
            Ok(Ok(FetchResponse {
                status_code, body, ..
            })) if (200..300).contains(&status_code) => {
                tracing::debug!("Loaded {} ({} bytes)", robots_url, body.len());
                RobotsRules::from_body(&body)
            }
            Ok(Ok(response)) => {
                tracing::debug!(
                    "No robots.txt at {} (HTTP {}), allowing all",
                    robots_url,
                    response.status_code
                );
                RobotsRules::allow_all()
            }
            Ok(Err(e)) => {
                tracing::debug!("Failed to fetch {}: {}, allowing all", robots_url, e);
                RobotsRules::allow_all()
            }
            Err(_) => {
                tracing::debug!("Timed out fetching {}, allowing all", robots_url);
                RobotsRules::allow_all()
            }
        }
    }
}

#[async_trait]
impl RobotsPolicy for RobotsTxtPolicy {
    async fn is_allowed(&self, url: &Url) -> bool {
        let slot = self.slot_for(url);
        slot.get_or_init(|| self.download(url))
            .await
            .is_allowed(url.as_str(), &self.agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{FetchError, MIN_REQUESTS_PER_SECOND};
    use crate::state::FetchErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves one robots.txt body and counts requests
    struct RobotsServer {
        status_code: u16,
        body: &'static str,
        requests: AtomicUsize,
    }

    impl RobotsServer {
        fn new(status_code: u16, body: &'static str) -> Self {
            Self {
                status_code,
                body,
                requests: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for RobotsServer {
        async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchResponse, FetchError> {
            assert_eq!(url.path(), "/robots.txt");
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(FetchResponse {
                status_code: self.status_code,
                content_type: Some("text/plain".to_string()),
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Fetcher for Unreachable {
        async fn fetch(&self, _url: &Url, _timeout: Duration) -> Result<FetchResponse, FetchError> {
            Err(FetchError::new(FetchErrorKind::Connection, "refused"))
        }
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn policy(fetcher: Arc<dyn Fetcher>) -> RobotsTxtPolicy {
        RobotsTxtPolicy::new(fetcher, "sitemap-ripple", Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_allow_all_policy() {
        assert!(AllowAll.is_allowed(&url("https://example.com/admin")).await);
    }

    #[tokio::test]
    async fn test_disallowed_path() {
        let server = Arc::new(RobotsServer::new(200, "User-agent: *\nDisallow: /admin\n"));
        let policy = policy(server);
        assert!(policy.is_allowed(&url("https://example.com/")).await);
        assert!(!policy.is_allowed(&url("https://example.com/admin/users")).await);
    }

    #[tokio::test]
    async fn test_fetched_once_per_origin() {
        let server = Arc::new(RobotsServer::new(200, "User-agent: *\nDisallow: /x\n"));
        let policy = policy(Arc::clone(&server) as Arc<dyn Fetcher>);

        for path in ["/", "/a", "/x", "/b"] {
            policy.is_allowed(&url(&format!("https://example.com{}", path))).await;
        }
        assert_eq!(server.requests.load(Ordering::SeqCst), 1);

        policy.is_allowed(&url("https://blog.example.com/")).await;
        assert_eq!(server.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_download() {
        let server = Arc::new(RobotsServer::new(200, "User-agent: *\nDisallow: /x\n"));
        let policy = policy(Arc::clone(&server) as Arc<dyn Fetcher>);

        let a = url("https://example.com/a");
        let b = url("https://example.com/x");
        let c = url("https://example.com/c");
        let (a, b, c) = tokio::join!(
            policy.is_allowed(&a),
            policy.is_allowed(&b),
            policy.is_allowed(&c)
        );
        assert!(a && !b && c);
        assert_eq!(server.requests.load(Ordering::SeqCst), 1);
    }

    /// Never answers for one host, allows everything elsewhere
    struct StallingHost(&'static str);

    #[async_trait]
    impl Fetcher for StallingHost {
        async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchResponse, FetchError> {
            if url.host_str() == Some(self.0) {
                std::future::pending::<()>().await;
            }
            Ok(FetchResponse {
                status_code: 404,
                content_type: None,
                body: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn test_slow_origin_does_not_block_others() {
        let policy = Arc::new(RobotsTxtPolicy::new(
            Arc::new(StallingHost("slow.example.com")),
            "sitemap-ripple",
            Duration::from_secs(60),
        ));

        let slow = Arc::clone(&policy);
        let pending = tokio::spawn(async move {
            slow.is_allowed(&url("https://slow.example.com/")).await
        });
        tokio::task::yield_now().await;

        let fast = tokio::time::timeout(
            Duration::from_secs(1),
            policy.is_allowed(&url("https://example.com/page")),
        )
        .await;
        assert_eq!(fast.ok(), Some(true));
        assert!(!pending.is_finished());
        pending.abort();
    }

    #[tokio::test]
    async fn test_download_timeout_allows_all() {
        let policy = RobotsTxtPolicy::new(
            Arc::new(StallingHost("example.com")),
            "sitemap-ripple",
            Duration::from_millis(50),
        );
        assert!(policy.is_allowed(&url("https://example.com/anything")).await);
    }

    #[tokio::test]
    async fn test_download_waits_for_rate_cap() {
        let limiter = Arc::new(RateLimiter::new(Some(MIN_REQUESTS_PER_SECOND)));
        limiter.acquire().await;

        let server = Arc::new(RobotsServer::new(200, "User-agent: *\nDisallow:\n"));
        let policy =
            policy(Arc::clone(&server) as Arc<dyn Fetcher>).with_rate_limiter(limiter);

        let waited = tokio::time::timeout(
            Duration::from_millis(50),
            policy.is_allowed(&url("https://example.com/")),
        )
        .await;
        assert!(waited.is_err());
        assert_eq!(server.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let server = Arc::new(RobotsServer::new(404, "User-agent: *\nDisallow: /\n"));
        let policy = policy(server);
        assert!(policy.is_allowed(&url("https://example.com/anything")).await);
    }

    #[tokio::test]
    async fn test_unreachable_robots_allows_all() {
        let policy = policy(Arc::new(Unreachable));
        assert!(policy.is_allowed(&url("https://example.com/anything")).await);
    }
}
