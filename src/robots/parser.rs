//! robots.txt rules for a single origin, matched with the robotstxt crate

use robotstxt::DefaultMatcher;

/// The robots.txt rules of one origin
///
/// Matching is delegated to Google's robots.txt matcher port. Rules are kept
/// as raw text and evaluated per query, which is cheap next to a page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsRules {
    /// Raw robots.txt body; `None` means everything is allowed
    body: Option<String>,
}

impl RobotsRules {
    /// Rules from a fetched robots.txt body (decoded lossily)
    pub fn from_body(body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        if text.trim().is_empty() {
            return Self::allow_all();
        }
        Self {
            body: Some(text.into_owned()),
        }
    }

    /// Permissive rules, used when robots.txt is missing or unreadable
    pub fn allow_all() -> Self {
        Self { body: None }
    }

    pub fn is_allow_all(&self) -> bool {
        self.body.is_none()
    }

    /// Checks a full URL (or a bare path) for the given product token
    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        match &self.body {
            None => true,
            Some(body) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(body, agent, url)
            }
        }
    }
}
