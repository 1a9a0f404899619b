//! Output module for serializing crawl results
//!
//! This module handles:
//! - Writing the sitemap (XML or plain text) for a finished crawl
//! - Printing end-of-run crawl statistics

mod sitemap;
pub mod stats;
mod text;
mod traits;

pub use sitemap::{escape_xml, XmlSitemapEmitter};
pub use stats::{format_statistics, print_statistics, CrawlStatistics};
pub use text::TextEmitter;
pub use traits::{Emitter, OutputError, OutputResult};

use crate::config::{Config, OutputFormat};
use crate::state::CrawlResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Selects the emitter for the configured output format
///
/// The scope settings supply the normalizer that priority URLs are matched
/// against page keys with.
pub fn emitter_for(config: &Config) -> Box<dyn Emitter> {
    match config.output.format {
        OutputFormat::Xml => Box::new(XmlSitemapEmitter::from_config(
            &config.output,
            &config.scope.normalizer(),
        )),
        OutputFormat::Text => Box::new(TextEmitter),
    }
}

/// Writes the crawl result to `path` in the configured format
///
/// Partial results (truncated or cancelled crawls) are written like complete
/// ones; the document records the outcome.
///
/// # Returns
///
/// * `Ok(())` - The file was fully written
/// * `Err(OutputError)` - Creating or writing the file failed
pub fn write_output(result: &CrawlResult, config: &Config, path: &Path) -> OutputResult<()> {
    let emitter = emitter_for(config);

    let mut writer = BufWriter::new(File::create(path)?);
    emitter.emit(result, &mut writer)?;
    writer.flush()?;

    tracing::info!(
        "Wrote {} ({} pages, {} format)",
        path.display(),
        result.pages().len(),
        emitter.extension()
    );
    Ok(())
}
