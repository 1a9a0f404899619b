use url::Url;

/// The crawl boundary: which normalized URLs are followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    /// Schemes a URL may use (lowercase)
    pub allowed_schemes: Vec<String>,

    /// The root domain every in-scope host must equal (or be under, when loose)
    pub root_domain: String,

    /// Loose mode: subdomains of the root domain are in scope
    pub include_subdomains: bool,

    /// If non-empty, the URL path must start with one of these prefixes
    pub path_prefixes: Vec<String>,
}

impl Scope {
    /// Creates a strict scope over http/https for a single domain
    pub fn for_domain(root_domain: &str) -> Self {
        Self {
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
            root_domain: root_domain.to_lowercase(),
            include_subdomains: false,
            path_prefixes: Vec::new(),
        }
    }

    /// Decides whether a resolved URL is inside the crawl scope
    ///
    /// The check runs on the URL as resolved, before the trailing slash policy
    /// derives its key, so a `/docs/` prefix admits the `/docs/` page itself.
    /// Never fails: an unknown scheme or a missing host simply yields `false`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sitemap_ripple::url::Scope;
    /// use url::Url;
    ///
    /// let mut scope = Scope::for_domain("example.com");
    /// assert!(scope.contains(&Url::parse("https://example.com/a").unwrap()));
    /// assert!(!scope.contains(&Url::parse("https://blog.example.com/a").unwrap()));
    ///
    /// scope.include_subdomains = true;
    /// assert!(scope.contains(&Url::parse("https://blog.example.com/a").unwrap()));
    /// ```
    pub fn contains(&self, url: &Url) -> bool {
        if !self.allowed_schemes.iter().any(|s| s == url.scheme()) {
            return false;
        }

        let host = match extract_domain(url) {
            Some(host) => host,
            None => return false,
        };
        if !matches_domain(&self.root_domain, &host, self.include_subdomains) {
            return false;
        }

        self.path_prefixes.is_empty()
            || self
                .path_prefixes
                .iter()
                .any(|prefix| url.path().starts_with(prefix.as_str()))
    }
}

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitemap_ripple::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks if a host belongs to a root domain
///
/// In strict mode only the exact root domain matches. In loose mode the root
/// domain and any of its subdomains match, at label boundaries only.
pub fn matches_domain(root: &str, candidate: &str, include_subdomains: bool) -> bool {
    if candidate == root {
        return true;
    }
    include_subdomains
        && candidate
            .strip_suffix(root)
            .map_or(false, |rest| rest.ends_with('.') && rest.len() > 1)
}
