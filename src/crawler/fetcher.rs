//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - The `Fetcher` collaborator contract the crawl engine consumes
//! - A reqwest-backed implementation with a proper user agent string
//! - Error classification (timeout, DNS, connection, other)
//! - Bounded retries with exponential backoff
//! - A global request rate cap (governor)

use crate::config::UserAgentConfig;
use crate::state::FetchErrorKind;
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota,
};
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A received HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status_code: u16,

    /// Content-Type header value, if any
    pub content_type: Option<String>,

    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Returns true for `text/html` and `application/xhtml+xml` bodies
    pub fn is_html(&self) -> bool {
        self.content_type.as_deref().map_or(false, |ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "text/html" || mime == "application/xhtml+xml"
        })
    }
}

/// A network or transport failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} error: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Fetches a URL: status code, content type and body, or a transport failure
///
/// Implementations must honor the caller-supplied timeout. Non-2xx responses
/// are responses, not errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sitemap_ripple::config::UserAgentConfig;
/// use sitemap_ripple::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// The production fetcher, backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(&e))?;

        let status_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| classify_error(&e))?;

        Ok(FetchResponse {
            status_code,
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(error: &reqwest::Error) -> FetchError {
    let kind = if error.is_timeout() {
        FetchErrorKind::Timeout
    } else if is_dns_failure(error) {
        FetchErrorKind::Dns
    } else if error.is_connect() {
        FetchErrorKind::Connection
    } else {
        FetchErrorKind::Other
    };
    FetchError::new(kind, error_chain(error))
}

/// hyper reports resolver failures as connect errors; the resolver message
/// sits further down the source chain
fn is_dns_failure(error: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = current {
        let message = err.to_string().to_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
            || message.contains("no such host")
        {
            return true;
        }
        current = err.source();
    }
    false
}

fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(err) = current {
        message.push_str(": ");
        message.push_str(&err.to_string());
        current = err.source();
    }
    message
}

/// Retry policy for transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt + 1`: `base * 2^attempt`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(1u32 << attempt.min(16))
    }
}

/// Slowest accepted rate cap: one request per hour
pub const MIN_REQUESTS_PER_SECOND: f64 = 1.0 / 3600.0;

/// Global request rate cap
///
/// Requests are spaced evenly at `1 / rate` seconds with no burst allowance.
pub struct RateLimiter {
    limiter: Option<governor::RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    /// Creates a limiter; `None`, a non-positive or a non-finite rate means unlimited
    ///
    /// Rates below [`MIN_REQUESTS_PER_SECOND`] are raised to it.
    pub fn new(max_requests_per_second: Option<f64>) -> Self {
        let limiter = max_requests_per_second
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .and_then(|rate| {
                Duration::try_from_secs_f64(1.0 / rate.max(MIN_REQUESTS_PER_SECOND)).ok()
            })
            .and_then(Quota::with_period)
            .map(governor::RateLimiter::direct);
        Self { limiter }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Waits until the caller may start a request
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

/// Terminal result of one fetch attempt sequence
#[derive(Debug)]
pub enum FetchOutcome {
    Response(FetchResponse),
    Failed(FetchError),
    Cancelled,
}

/// Fetches with rate limiting, a hard timeout, and bounded retries
///
/// Only transport failures are retried; any HTTP response is final. The
/// cancellation token aborts waits and in-flight requests promptly.
pub async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &Url,
    timeout: Duration,
    retry: RetryPolicy,
    limiter: &RateLimiter,
    cancel: &CancellationToken,
) -> FetchOutcome {
    let mut attempt = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return FetchOutcome::Cancelled,
            _ = limiter.acquire() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return FetchOutcome::Cancelled,
            result = tokio::time::timeout(timeout, fetcher.fetch(url, timeout)) => match result {
                Ok(result) => result,
                Err(_) => Err(FetchError::new(
                    FetchErrorKind::Timeout,
                    format!("no response within {:?}", timeout),
                )),
            },
        };

        match result {
            Ok(response) => return FetchOutcome::Response(response),
            Err(error) if attempt < retry.max_retries => {
                let delay = retry.backoff_for(attempt);
                attempt += 1;
                tracing::debug!(
                    "Fetch of {} failed ({}), retry {}/{} in {:?}",
                    url,
                    error,
                    attempt,
                    retry.max_retries,
                    delay
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return FetchOutcome::Cancelled,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(error) => return FetchOutcome::Failed(error),
        }
    }
}
