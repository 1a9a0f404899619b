use crate::UrlError;
use serde::Deserialize;
use url::Url;

/// List of tracking query parameters removed when tracking stripping is enabled
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
    "source",
];

/// How a trailing slash on a non-root path is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrailingSlash {
    /// `/docs/` and `/docs` collapse to `/docs`
    #[default]
    Strip,
    /// `/docs/` and `/docs` stay distinct keys
    Preserve,
}

/// Canonicalizes URLs so that equivalent spellings collapse to one key
///
/// The string form of a normalized [`Url`] (`url.as_str()`) is the URL key used
/// for deduplication everywhere in the crawler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    pub trailing_slash: TrailingSlash,
    pub strip_tracking_params: bool,
}

impl Normalizer {
    pub fn new(trailing_slash: TrailingSlash, strip_tracking_params: bool) -> Self {
        Self {
            trailing_slash,
            strip_tracking_params,
        }
    }

    /// Normalizes a raw URL string into its URL key, resolving it against `base` when given
    ///
    /// # Normalization Steps
    ///
    /// 1. Resolve relative references against the base (seeds have no base)
    /// 2. Lowercase scheme and host (done by the `url` parser for http(s))
    /// 3. Strip the port when it is the scheme's default (also done by the parser)
    /// 4. Remove the fragment
    /// 5. Collapse `.`/`..` and empty path segments
    /// 6. Drop an empty `?` query marker
    /// 7. Optionally drop tracking parameters and sort the rest
    /// 8. Apply the trailing slash policy
    ///
    /// Steps 1-7 are [`Normalizer::resolve`], step 8 is [`Normalizer::key_of`].
    ///
    /// # Returns
    ///
    /// * `Ok(Url)` - The canonical URL
    /// * `Err(UrlError)` - The string is not resolvable to an absolute URL with
    ///   a host and a known scheme
    ///
    /// # Examples
    ///
    /// ```
    /// use sitemap_ripple::url::Normalizer;
    ///
    /// let normalizer = Normalizer::default();
    /// let url = normalizer.normalize("HTTP://Example.COM:80/a/./b/../c/#top", None).unwrap();
    /// assert_eq!(url.as_str(), "http://example.com/a/c");
    /// ```
    pub fn normalize(&self, raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
        Ok(self.key_of(&self.resolve(raw, base)?))
    }

    /// Canonicalizes a raw URL but keeps its trailing slash as written
    ///
    /// This is the URL that gets fetched and that relative links on the
    /// fetched page resolve against: `intro` on `/docs/` is `/docs/intro`.
    pub fn resolve(&self, raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
        let raw = raw.trim();

        // Step 1: Parse or resolve
        let parsed = match base {
            Some(base) => base.join(raw),
            None => Url::parse(raw),
        };
        let mut url = parsed.map_err(|e| UrlError::Parse(format!("'{}': {}", raw, e)))?;

        // Only schemes with a well-known default port carry a host we can crawl;
        // this rejects mailto:, javascript:, data:, file: and friends.
        if url.cannot_be_a_base() || url.port_or_known_default().is_none() {
            return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
        }

        // Steps 2 & 3
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_lowercase(),
            _ => return Err(UrlError::MissingHost(raw.to_string())),
        };
        if url.host_str() != Some(host.as_str()) {
            url.set_host(Some(&host))
                .map_err(|e| UrlError::Parse(format!("'{}': {}", raw, e)))?;
        }

        // Step 4
        url.set_fragment(None);

        // Step 5
        let path = normalize_path(url.path());
        url.set_path(&path);

        // Steps 6 & 7
        if url.query() == Some("") {
            url.set_query(None);
        } else if self.strip_tracking_params && url.query().is_some() {
            let params = filter_and_sort_query_params(&url);
            if params.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(params);
            }
        }

        Ok(url)
    }

    /// Derives the URL key of an already resolved URL
    pub fn key_of(&self, resolved: &Url) -> Url {
        let mut key = resolved.clone();
        let path = resolved.path();
        if self.trailing_slash == TrailingSlash::Strip && path.len() > 1 && path.ends_with('/') {
            key.set_path(path.trim_end_matches('/'));
        }
        key
    }
}

/// Normalizes a URL with the default policy (strip trailing slash, keep query)
pub fn normalize_url(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    Normalizer::default().normalize(raw, base)
}

/// Normalizes a URL path by removing dot and empty segments
///
/// A trailing slash survives; the key policy decides about it later.
fn normalize_path(path: &str) -> String {
    let had_trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if had_trailing_slash {
        result.push('/');
    }
    result
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
