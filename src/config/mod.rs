//! Configuration module for Sitemap-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every setting has a default, so a crawl can run from command-line
//! flags alone.
//!
//! # Example
//!
//! ```no_run
//! use sitemap_ripple::config::load_validated_config;
//! use std::path::Path;
//!
//! let config = load_validated_config(Path::new("sitemap.toml")).unwrap();
//! println!("Crawler will use max depth: {:?}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, OutputConfig, OutputFormat, ScopeConfig, UserAgentConfig,
};

pub use parser::{load_config, load_validated_config, parse_config};
pub use validation::validate;
