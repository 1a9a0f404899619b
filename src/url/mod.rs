//! URL handling module for Sitemap-Ripple
//!
//! This module provides URL normalization (the canonical URL key) and the
//! scope filter that bounds which discovered links are followed.

mod normalize;
mod scope;

pub use normalize::{normalize_url, Normalizer, TrailingSlash};
pub use scope::{extract_domain, matches_domain, Scope};
