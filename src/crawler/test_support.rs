//! Scripted in-memory site used by the crawl engine tests

use crate::crawler::{FetchError, FetchResponse, Fetcher};
use crate::state::FetchErrorKind;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

enum Route {
    Response(FetchResponse),
    Fail(FetchErrorKind),
    Stall,
}

/// A fake website keyed by exact URL key
///
/// Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct StaticSite {
    routes: HashMap<String, Route>,
    requests: Mutex<Vec<String>>,
    latency: Duration,
}

impl StaticSite {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// An HTML page linking to `links`, in order
    pub(crate) fn page(self, url: &str, links: &[&str]) -> Self {
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{}\">link</a>\n", href))
            .collect();
        let body = format!("<html><body>\n{}</body></html>", anchors);
        self.respond(url, 200, Some("text/html; charset=utf-8"), body.into_bytes())
    }

    pub(crate) fn file(self, url: &str, content_type: &str) -> Self {
        self.respond(url, 200, Some(content_type), b"%PDF-1.4".to_vec())
    }

    pub(crate) fn status(self, url: &str, status_code: u16) -> Self {
        self.respond(url, status_code, Some("text/html"), b"<html></html>".to_vec())
    }

    pub(crate) fn respond(
        mut self,
        url: &str,
        status_code: u16,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Self {
        let response = FetchResponse {
            status_code,
            content_type: content_type.map(str::to_string),
            body,
        };
        self.routes.insert(url.to_string(), Route::Response(response));
        self
    }

    pub(crate) fn failing(mut self, url: &str, kind: FetchErrorKind) -> Self {
        self.routes.insert(url.to_string(), Route::Fail(kind));
        self
    }

    /// A URL whose fetch never completes
    pub(crate) fn stalling(mut self, url: &str) -> Self {
        self.routes.insert(url.to_string(), Route::Stall);
        self
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every URL requested so far, in request order
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StaticSite {
    async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<FetchResponse, FetchError> {
        self.requests.lock().unwrap().push(url.as_str().to_string());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.routes.get(url.as_str()) {
            Some(Route::Response(response)) => Ok(response.clone()),
            Some(Route::Fail(kind)) => Err(FetchError::new(*kind, "scripted failure")),
            Some(Route::Stall) => std::future::pending().await,
            None => Ok(FetchResponse {
                status_code: 404,
                content_type: Some("text/html".to_string()),
                body: b"<html>not found</html>".to_vec(),
            }),
        }
    }
}
