//! Global Trace Graph
//!
//! The renderer-agnostic output of a run: typed nodes, typed edges and a
//! level per trace model.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::domain::dependency::{build_dependencies, DependencyAnalysis};
use crate::domain::entity::{
    display_name, AbstractionLevel, LinkGranularity, ModelId, TraceModel, TraceModelId, UNKNOWN,
};
use crate::domain::error::Diagnostic;
use crate::domain::extract::{extract_entities, Entities};
use crate::domain::level::{assign_levels, Levels};
use crate::domain::record::RecordStore;
use crate::domain::reference::RecordId;

/// What to include besides trace models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphOptions {
    pub include_models: bool,
    pub include_trace_links: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            include_models: true,
            include_trace_links: true,
        }
    }
}

/// A node of the global trace graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    /// Unique identifier (`model:N`, `trace:N`, `link:N:R:L`)
    pub id: String,
    /// Display name, `Unknown` when the record has none
    pub name: String,
    pub details: NodeDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeDetails {
    Model {
        abstraction_level: Option<AbstractionLevel>,
        conforms_to: String,
    },
    TraceModel {
        transformation: String,
        version: u32,
        rule_count: usize,
        trace_link_count: usize,
        level: usize,
        latest: bool,
    },
    TraceLink {
        rule: String,
        granularity: LinkGranularity,
        link_type: Option<String>,
        source: Option<String>,
        target: Option<String>,
    },
}

impl NodeDetails {
    pub fn kind(&self) -> &'static str {
        match self {
            NodeDetails::Model { .. } => "model",
            NodeDetails::TraceModel { .. } => "trace",
            NodeDetails::TraceLink { .. } => "link",
        }
    }
}

/// Type of relationship between nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeKind {
    /// Input model of the trace model's transformation
    ModelToTrace,
    /// Output model of the trace model's transformation
    TraceToModel,
    /// Causal dependency between trace models
    Dependency,
    /// Version evolution, ancestor to descendant
    Evolution,
    /// Trace model contains a trace link
    Contains,
}

impl EdgeKind {
    pub fn label(&self) -> &'static str {
        match self {
            EdgeKind::ModelToTrace => "input",
            EdgeKind::TraceToModel => "output",
            EdgeKind::Dependency => "flow",
            EdgeKind::Evolution => "evolution",
            EdgeKind::Contains => "contains",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// The assembled global trace.
#[derive(Debug, Clone)]
pub struct GlobalTrace {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub levels: Levels,
    pub entities: Entities,
    pub analysis: DependencyAnalysis,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn model_node_id(id: RecordId) -> String {
    format!("model:{}", id)
}

pub fn trace_node_id(id: TraceModelId) -> String {
    format!("trace:{}", id)
}

pub fn link_node_id(trace: TraceModelId, rule: usize, link: usize) -> String {
    format!("link:{}:{}:{}", trace, rule, link)
}

impl GlobalTrace {
    /// Run the whole engine over a record store.
    ///
    /// Never fails: unresolved references, ambiguous mappings and dependency
    /// cycles are reported in `diagnostics` and the graph is still built.
    pub fn build(store: &RecordStore, options: GraphOptions) -> Self {
        let extraction = extract_entities(store);
        let analysis = build_dependencies(&extraction.entities);
        let levels = assign_levels(
            extraction.entities.trace_models.keys().copied(),
            &analysis.trace_dependencies,
        );

        let mut diagnostics = extraction.diagnostics;
        diagnostics.extend(analysis.diagnostics.iter().cloned());
        diagnostics.extend(check_references(&extraction.entities));
        if let Some(error) = levels.cycle_error() {
            let diagnostic = Diagnostic::CyclicDependency { error };
            warn!("{}", diagnostic);
            diagnostics.push(diagnostic);
        }

        let mut assembler = Assembler {
            store,
            entities: &extraction.entities,
            analysis: &analysis,
            levels: &levels,
            options,
            nodes: Vec::new(),
            edges: Vec::new(),
        };
        assembler.assemble();
        let Assembler { nodes, edges, .. } = assembler;

        info!(
            nodes = nodes.len(),
            edges = edges.len(),
            diagnostics = diagnostics.len(),
            "global trace built with {} levels",
            levels.levels_by_rank().len()
        );

        GlobalTrace {
            nodes,
            edges,
            levels,
            entities: extraction.entities,
            analysis,
            diagnostics,
        }
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &GraphEdge> + '_ {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    pub fn trace_nodes(&self) -> impl Iterator<Item = &GraphNode> + '_ {
        self.nodes
            .iter()
            .filter(|n| matches!(n.details, NodeDetails::TraceModel { .. }))
    }
}

struct Assembler<'a> {
    store: &'a RecordStore,
    entities: &'a Entities,
    analysis: &'a DependencyAnalysis,
    levels: &'a Levels,
    options: GraphOptions,
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl<'a> Assembler<'a> {
    fn assemble(&mut self) {
        if self.options.include_models {
            self.add_model_nodes();
        }
        let entities = self.entities;
        for trace in entities.trace_models.values() {
            self.add_trace_node(trace);
            if self.options.include_models {
                self.add_model_edges(trace.id);
            }
            if self.options.include_trace_links {
                self.add_link_nodes(trace);
            }
        }
        self.add_dependency_edges();
        self.add_evolution_edges();
    }

    fn add_model_nodes(&mut self) {
        let store = self.store;
        for model in self.entities.models.values() {
            let conforms_to = model
                .conforms_to
                .and_then(|id| store.name_of(id))
                .unwrap_or(UNKNOWN)
                .to_string();
            self.nodes.push(GraphNode {
                id: model_node_id(model.id.record()),
                name: display_name(&model.name).to_string(),
                details: NodeDetails::Model {
                    abstraction_level: model.abstraction_level.clone(),
                    conforms_to,
                },
            });
        }
    }

    fn add_trace_node(&mut self, trace: &TraceModel) {
        let transformation = self
            .analysis
            .trace_to_transformation
            .get(&trace.id)
            .and_then(|t| self.entities.transformations.get(t))
            .map(|t| display_name(&t.name))
            .unwrap_or(UNKNOWN)
            .to_string();

        self.nodes.push(GraphNode {
            id: trace_node_id(trace.id),
            name: display_name(&trace.name).to_string(),
            details: NodeDetails::TraceModel {
                transformation,
                version: trace.version,
                rule_count: trace.rules.len(),
                trace_link_count: trace.trace_link_count(),
                level: self.levels.get(trace.id),
                latest: self.analysis.is_latest(trace.id),
            },
        });
    }

    fn add_model_edges(&mut self, trace: TraceModelId) {
        let entities = self.entities;
        let Some(transformation) = self
            .analysis
            .trace_to_transformation
            .get(&trace)
            .and_then(|t| entities.transformations.get(t))
        else {
            return;
        };

        for (refs, kind) in [
            (&transformation.input_refs, EdgeKind::ModelToTrace),
            (&transformation.output_refs, EdgeKind::TraceToModel),
        ] {
            let mut seen = BTreeSet::new();
            for model in refs {
                if !seen.insert(*model) || !is_model(entities, *model) {
                    continue;
                }
                let (from, to) = match kind {
                    EdgeKind::ModelToTrace => (model_node_id(*model), trace_node_id(trace)),
                    _ => (trace_node_id(trace), model_node_id(*model)),
                };
                self.edges.push(GraphEdge { from, to, kind });
            }
        }
    }

    fn add_link_nodes(&mut self, trace: &TraceModel) {
        for (rule_pos, rule) in trace.rules.iter().enumerate() {
            for (link_pos, link) in rule.trace_links.iter().enumerate() {
                let id = link_node_id(trace.id, rule_pos, link_pos);
                let (source, target) = match link.granularity() {
                    LinkGranularity::Attribute => {
                        (link.source_attribute.clone(), link.target_attribute.clone())
                    }
                    LinkGranularity::Element => (
                        link.source_element_path.clone(),
                        link.target_element_path.clone(),
                    ),
                };
                self.nodes.push(GraphNode {
                    id: id.clone(),
                    name: display_name(&link.name).to_string(),
                    details: NodeDetails::TraceLink {
                        rule: display_name(&rule.name).to_string(),
                        granularity: link.granularity(),
                        link_type: link.link_type.clone(),
                        source,
                        target,
                    },
                });
                self.edges.push(GraphEdge {
                    from: trace_node_id(trace.id),
                    to: id,
                    kind: EdgeKind::Contains,
                });
            }
        }
    }

    fn add_dependency_edges(&mut self) {
        let analysis = self.analysis;
        for (source, targets) in &analysis.trace_dependencies {
            for target in targets {
                self.edges.push(GraphEdge {
                    from: trace_node_id(*source),
                    to: trace_node_id(*target),
                    kind: EdgeKind::Dependency,
                });
            }
        }
    }

    fn add_evolution_edges(&mut self) {
        let entities = self.entities;
        for trace in entities.trace_models.values() {
            let Some(ancestor) = trace.ancestor else {
                continue;
            };
            if let Some(parent) = entities.trace_model(ancestor) {
                self.edges.push(GraphEdge {
                    from: trace_node_id(parent.id),
                    to: trace_node_id(trace.id),
                    kind: EdgeKind::Evolution,
                });
            }
        }
    }
}

fn is_model(entities: &Entities, id: RecordId) -> bool {
    entities.models.contains_key(&ModelId::new(id.index()))
}

/// Flag references that do not land on an entity of the expected kind:
/// transformation `IN`/`OUT` that are not models and ancestors that are not
/// trace models. One diagnostic per distinct (record, field, target),
/// independent of what the graph later draws.
fn check_references(entities: &Entities) -> Vec<Diagnostic> {
    let mut seen = BTreeSet::new();
    let mut diagnostics = Vec::new();
    let mut flag = |record: RecordId, field: &'static str, target: RecordId| {
        if seen.insert((record, field, target)) {
            let diagnostic = Diagnostic::UnresolvedEntity { record, field, target };
            warn!("{}", diagnostic);
            diagnostics.push(diagnostic);
        }
    };

    for transformation in entities.transformations.values() {
        let owner = transformation.id.record();
        for (field, refs) in [
            ("IN", &transformation.input_refs),
            ("OUT", &transformation.output_refs),
        ] {
            for target in refs.iter().filter(|t| !is_model(entities, **t)) {
                flag(owner, field, *target);
            }
        }
    }

    for trace in entities.trace_models.values() {
        if let Some(ancestor) = trace.ancestor.filter(|a| entities.trace_model(*a).is_none()) {
            flag(trace.id.record(), "ancestor", ancestor);
        }
    }

    diagnostics
}
