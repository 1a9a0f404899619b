//! Emitter trait and output error types
//!
//! An emitter is a pure consumer of a finished crawl: it reads the page
//! records of a [`CrawlResult`] and serializes them to a writer.

use crate::state::CrawlResult;
use std::io::Write;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to format output: {0}")]
    Format(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Serializes a crawl result
pub trait Emitter {
    /// Writes the whole document for `result` to `out`
    fn emit(&self, result: &CrawlResult, out: &mut dyn Write) -> OutputResult<()>;

    /// Conventional file extension, without the dot
    fn extension(&self) -> &'static str;
}
