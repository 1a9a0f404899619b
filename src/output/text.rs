//! Plain-text crawl listing
//!
//! One line per page record, `status<TAB>depth<TAB>url`, ordered by depth and
//! then URL key, followed by a `# outcome:` line.

use crate::output::traits::{Emitter, OutputResult};
use crate::state::{CrawlResult, PageRecord};
use std::io::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextEmitter;

impl Emitter for TextEmitter {
    fn emit(&self, result: &CrawlResult, out: &mut dyn Write) -> OutputResult<()> {
        let mut pages: Vec<&PageRecord> = result.pages().iter().collect();
        pages.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.url.cmp(&b.url)));

        for page in pages {
            writeln!(out, "{}\t{}\t{}", page.status, page.depth, page.url)?;
        }

        write!(
            out,
            "# outcome: {} ({} pages, {} errors",
            result.phase(),
            result.pages().len(),
            result.errors()
        )?;
        if let Some(reason) = result.stop_reason() {
            write!(out, ", {}", reason)?;
        }
        writeln!(out, ")")?;
        Ok(())
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}
