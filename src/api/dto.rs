use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::global_trace::{trace_node_id, GlobalTrace, NodeDetails};

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphDto {
    pub nodes: Vec<NodeDto>,
    pub edges: Vec<EdgeDto>,
    /// Level per trace node id
    pub levels: BTreeMap<String, usize>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeDto {
    pub id: String,
    pub kind: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub abstraction_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub conforms_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transformation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub num_rules: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub num_trace_links: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub level: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latest: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub granularity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target: Option<String>,
}

impl NodeDto {
    fn bare(id: String, kind: &str, label: String) -> Self {
        NodeDto {
            id,
            kind: kind.to_string(),
            label,
            abstraction_level: None,
            conforms_to: None,
            transformation: None,
            version: None,
            num_rules: None,
            num_trace_links: None,
            level: None,
            latest: None,
            rule: None,
            granularity: None,
            link_type: None,
            source: None,
            target: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeDto {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub type_: String,
}

impl From<&GlobalTrace> for GraphDto {
    fn from(trace: &GlobalTrace) -> Self {
        let nodes = trace
            .nodes
            .iter()
            .map(|n| {
                let mut dto = NodeDto::bare(n.id.clone(), n.details.kind(), n.name.clone());
                match &n.details {
                    NodeDetails::Model { abstraction_level, conforms_to } => {
                        dto.abstraction_level = abstraction_level.as_ref().map(|l| l.to_string());
                        dto.conforms_to = Some(conforms_to.clone());
                    }
                    NodeDetails::TraceModel {
                        transformation,
                        version,
                        rule_count,
                        trace_link_count,
                        level,
                        latest,
                    } => {
                        dto.transformation = Some(transformation.clone());
                        dto.version = Some(*version);
                        dto.num_rules = Some(*rule_count);
                        dto.num_trace_links = Some(*trace_link_count);
                        dto.level = Some(*level);
                        dto.latest = Some(*latest);
                    }
                    NodeDetails::TraceLink { rule, granularity, link_type, source, target } => {
                        dto.rule = Some(rule.clone());
                        dto.granularity = Some(granularity.label().to_string());
                        dto.link_type = link_type.clone();
                        dto.source = source.clone();
                        dto.target = target.clone();
                    }
                }
                dto
            })
            .collect();

        let edges = trace
            .edges
            .iter()
            .map(|e| EdgeDto {
                source: e.from.clone(),
                target: e.to.clone(),
                type_: e.kind.label().to_string(),
            })
            .collect();

        let levels = trace
            .levels
            .iter()
            .map(|(t, level)| (trace_node_id(t), level))
            .collect();

        GraphDto {
            nodes,
            edges,
            levels,
            diagnostics: trace.diagnostics.iter().map(|d| d.to_string()).collect(),
        }
    }
}
