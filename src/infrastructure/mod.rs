// Infrastructure implementations for the global trace tool.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::api::GraphDto;
use crate::domain::GlobalTrace;
use crate::ports::trace_dot_exporter::TraceDotExporter;
use crate::ports::{GraphExporter, RecordParser};

pub mod concurrency;
pub mod json_parser;
pub mod logging;
pub mod report;
pub mod xmi_parser;

pub use json_parser::JsonRecordParser;
pub use report::TextReportExporter;
pub use xmi_parser::XmiRecordParser;

/// Directory outputs land in unless a path with a directory is given.
pub const DEFAULT_OUTPUT_DIR: &str = "output_g_trace";

pub struct JsonExporter;
impl GraphExporter for JsonExporter {
    fn render(&self, trace: &GlobalTrace) -> Result<String> {
        let dto = GraphDto::from(trace);
        serde_json::to_string_pretty(&dto).context("Failed to serialize global trace")
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Dot,
    Text,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    /// Parse format from string (CLI input).
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "dot" | "gv" | "graphviz" => Ok(OutputFormat::Dot),
            "text" | "txt" => Ok(OutputFormat::Text),
            other => Err(anyhow!("Unknown output format: {} (expected json, dot or text)", other)),
        }
    }
}

impl OutputFormat {
    pub fn exporter(&self) -> Box<dyn GraphExporter> {
        match self {
            OutputFormat::Json => Box::new(JsonExporter),
            OutputFormat::Dot => Box::new(TraceDotExporter),
            OutputFormat::Text => Box::new(TextReportExporter),
        }
    }
}

/// Pick a reader by file extension: `.json` is a serialized record store,
/// anything else is read as XMI.
pub fn parser_for(input: &Path) -> Box<dyn RecordParser> {
    let is_json = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        Box::new(JsonRecordParser)
    } else {
        Box::new(XmiRecordParser)
    }
}

/// Where to write the result.
///
/// No output: `output_g_trace/<input stem>.<ext>`. An output without a
/// directory component goes into `output_g_trace/`. Anything else is used as is.
pub fn resolve_output_path(input: &Path, output: Option<&Path>, extension: &str) -> PathBuf {
    match output {
        None => {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "global_trace".to_string());
            Path::new(DEFAULT_OUTPUT_DIR).join(format!("{}.{}", stem, extension))
        }
        Some(path) if path.parent().map_or(true, |p| p.as_os_str().is_empty()) => {
            Path::new(DEFAULT_OUTPUT_DIR).join(path)
        }
        Some(path) => path.to_path_buf(),
    }
}

/// Read an input file into a record store with the matching reader.
pub fn load_records(input: &Path) -> Result<crate::domain::RecordStore> {
    let src = std::fs::read_to_string(input)
        .with_context(|| format!("Cannot read input file {}", input.display()))?;
    parser_for(input)
        .parse(&src)
        .with_context(|| format!("Failed to parse {}", input.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("gv".parse::<OutputFormat>().unwrap(), OutputFormat::Dot);
        assert_eq!("txt".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        let err = "html".parse::<OutputFormat>().unwrap_err();
        assert!(err.to_string().contains("html"));
        assert_eq!(OutputFormat::Dot.exporter().extension(), "dot");
    }

    #[test]
    fn test_resolve_output_path() {
        let input = Path::new("src_artifacts/MPM_trace_example.xml");
        assert_eq!(
            resolve_output_path(input, None, "json"),
            PathBuf::from("output_g_trace/MPM_trace_example.json")
        );
        assert_eq!(
            resolve_output_path(input, Some(Path::new("graph.dot")), "dot"),
            PathBuf::from("output_g_trace/graph.dot")
        );
        assert_eq!(
            resolve_output_path(input, Some(Path::new("out/graph.dot")), "dot"),
            PathBuf::from("out/graph.dot")
        );
    }

    #[test]
    fn test_parser_for_extension() {
        let store = parser_for(Path::new("a.JSON")).parse("{\"nodes\": []}").unwrap();
        assert!(store.is_empty());
        let store = parser_for(Path::new("a.xmi")).parse("<root/>").unwrap();
        assert!(store.is_empty());
    }
}
