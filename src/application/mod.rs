use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::{GlobalTrace, GraphOptions, RecordStore};
use crate::ports::GraphExporter;

/// Build global trace -> export.
pub struct GlobalTraceUsecase<'a> {
    pub exporter: &'a dyn GraphExporter,
    pub options: GraphOptions,
}

impl<'a> GlobalTraceUsecase<'a> {
    pub fn build(&self, store: &RecordStore) -> GlobalTrace {
        info!("building global trace from {} records", store.len());
        GlobalTrace::build(store, self.options)
    }

    pub fn run(&self, store: &RecordStore, export_path: &Path) -> Result<GlobalTrace> {
        let trace = self.build(store);
        if let Some(dir) = export_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create output directory {}", dir.display()))?;
        }
        self.exporter.export(&trace, export_path)?;
        info!("global trace written to {}", export_path.display());
        Ok(trace)
    }
}
