use anyhow::{Context, Result};

use crate::domain::record::RecordStore;
use crate::ports::RecordParser;

/// Reads a record tree serialized as JSON:
/// `{"nodes": [{"name": "nodes", "attributes": {...}, "children": [...]}]}`.
pub struct JsonRecordParser;

impl RecordParser for JsonRecordParser {
    fn parse(&self, src: &str) -> Result<RecordStore> {
        serde_json::from_str(src).context("Invalid JSON record store")
    }
}
