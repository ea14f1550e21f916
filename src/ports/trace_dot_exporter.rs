//! Global Trace DOT Exporter
//!
//! Exports a GlobalTrace as Graphviz DOT, one rank per trace level.

use anyhow::Result;

use crate::domain::entity::LinkGranularity;
use crate::domain::global_trace::{trace_node_id, EdgeKind, GlobalTrace, NodeDetails};
use crate::ports::GraphExporter;

/// Viridis-like ramp used for trace levels, low to high.
const LEVEL_COLORS: [&str; 6] = ["#440154", "#414487", "#2a788e", "#22a884", "#7ad151", "#fde725"];

pub struct TraceDotExporter;

impl GraphExporter for TraceDotExporter {
    fn render(&self, trace: &GlobalTrace) -> Result<String> {
        Ok(Self::to_dot(trace))
    }

    fn extension(&self) -> &'static str {
        "dot"
    }
}

impl TraceDotExporter {
    /// Convert a GlobalTrace to a DOT string.
    pub fn to_dot(trace: &GlobalTrace) -> String {
        let mut lines = Vec::new();

        lines.push("digraph GlobalTrace {".to_string());
        lines.push("    rankdir=LR;".to_string()); // Causal flow left to right
        lines.push("    nodesep=0.6;".to_string());
        lines.push("    ranksep=1.2;".to_string());
        lines.push("    node [fontname=\"Helvetica\", fontsize=12];".to_string());
        lines.push("    edge [fontname=\"Helvetica\", fontsize=10];".to_string());
        lines.push("".to_string());

        for node in &trace.nodes {
            let (shape, fill, style) = Self::node_style(&node.details);
            let label = Self::escape_label(&Self::node_label(&node.name, &node.details));
            lines.push(format!(
                "    \"{}\" [label=\"{}\", shape={}, style=\"{}\", fillcolor=\"{}\"];",
                node.id, label, shape, style, fill
            ));
        }

        lines.push("".to_string());

        for edge in &trace.edges {
            lines.push(format!(
                "    \"{}\" -> \"{}\" [{}];",
                edge.from,
                edge.to,
                Self::edge_style(edge.kind)
            ));
        }

        // One rank per level so traces line up by causal depth
        for layer in trace.levels.levels_by_rank() {
            if !layer.is_empty() {
                let ids: Vec<String> = layer
                    .iter()
                    .map(|t| format!("\"{}\"", trace_node_id(*t)))
                    .collect();
                lines.push(format!("    {{ rank=same; {} }}", ids.join("; ")));
            }
        }

        lines.push("}".to_string());

        lines.join("\n")
    }

    fn node_label(name: &str, details: &NodeDetails) -> String {
        match details {
            NodeDetails::Model { abstraction_level, .. } => match abstraction_level {
                Some(level) => format!("{}\n[{}]", name, level),
                None => name.to_string(),
            },
            NodeDetails::TraceModel { transformation, version, rule_count, level, .. } => format!(
                "{}\nv{} | {} | {} rules | L{}",
                name, version, transformation, rule_count, level
            ),
            NodeDetails::TraceLink { rule, .. } => format!("{}\n({})", name, rule),
        }
    }

    fn node_style(details: &NodeDetails) -> (&'static str, &'static str, &'static str) {
        match details {
            NodeDetails::Model { .. } => ("note", "#f9e2af", "filled"), // Yellow
            NodeDetails::TraceModel { level, .. } => {
                ("ellipse", LEVEL_COLORS[level % LEVEL_COLORS.len()], "filled,bold")
            }
            NodeDetails::TraceLink { granularity: LinkGranularity::Attribute, .. } => {
                ("box", "#cba6f7", "filled,rounded") // Purple
            }
            NodeDetails::TraceLink { .. } => ("box", "#89b4fa", "filled,rounded"), // Blue
        }
    }

    fn edge_style(kind: EdgeKind) -> String {
        match kind {
            EdgeKind::Dependency => "color=\"#333333\", penwidth=2".to_string(),
            EdgeKind::Evolution => {
                "color=\"#0066cc\", style=dashed, label=\"evolution\"".to_string()
            }
            EdgeKind::ModelToTrace | EdgeKind::TraceToModel => {
                format!("color=\"#999999\", label=\"{}\"", kind.label())
            }
            EdgeKind::Contains => "color=\"#bbbbbb\", arrowhead=odiamond".to_string(),
        }
    }

    fn escape_label(label: &str) -> String {
        label
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{Element, RecordStore, TYPE_ATTRIBUTE};
    use crate::domain::GraphOptions;

    fn node(tag: &str) -> Element {
        Element::new("nodes").with_attr(TYPE_ATTRIBUTE, format!("mpm_trace:{}", tag))
    }

    #[test]
    fn test_to_dot() {
        let store = RecordStore::new(vec![
            node("Model").with_attr("name", "M1").with_attr("abstractionLevel", "PIM"),
            node("Transformation")
                .with_attr("name", "T1")
                .with_attr("exec", "//@nodes.3")
                .with_attr("OUT", "//@nodes.0"),
            node("Transformation")
                .with_attr("name", "T2")
                .with_attr("exec", "//@nodes.4")
                .with_attr("IN", "//@nodes.0"),
            node("TransformationExecution").with_attr("generates", "//@nodes.5"),
            node("TransformationExecution").with_attr("generates", "//@nodes.6"),
            node("TraceModel").with_attr("name", "Tr1"),
            node("TraceModel").with_attr("name", "Tr\"2\""),
        ]);
        let trace = GlobalTrace::build(&store, GraphOptions::default());

        let dot = TraceDotExporter::to_dot(&trace);
        assert!(dot.starts_with("digraph GlobalTrace {"));
        assert!(dot.contains("rankdir=LR"));
        assert!(dot.contains("\"trace:5\" -> \"trace:6\" [color=\"#333333\", penwidth=2];"));
        assert!(dot.contains("\"model:0\" -> \"trace:6\""));
        assert!(dot.contains("{ rank=same; \"trace:5\" }"));
        assert!(dot.contains("{ rank=same; \"trace:6\" }"));
        assert!(dot.contains("Tr\\\"2\\\""));
        assert!(dot.contains("M1\\n[PIM]"));
    }
}
