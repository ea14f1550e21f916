use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::{GlobalTrace, RecordStore};

pub mod trace_dot_exporter;

/// Turns raw input text into a record store.
pub trait RecordParser {
    fn parse(&self, src: &str) -> Result<RecordStore>;
}

/// Renders a finished global trace.
pub trait GraphExporter {
    fn render(&self, trace: &GlobalTrace) -> Result<String>;

    /// File extension for this output format, without the dot.
    fn extension(&self) -> &'static str;

    fn export(&self, trace: &GlobalTrace, path: &Path) -> Result<()> {
        let content = self.render(trace)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
