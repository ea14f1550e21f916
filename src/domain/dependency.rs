//! Dependency Builder
//!
//! Links executions to the trace models they produced, trace models to their
//! transformations, and infers trace-to-trace dependencies from shared
//! input/output models.
//!
//! One-to-one mappings (execution per trace model, transformation per
//! execution) take the first candidate in record order. The input cannot tell
//! genuine multiplicity from redundant records, so extra candidates are
//! reported as diagnostics and exposed through [`execution_candidates`] and
//! [`transformation_candidates`] instead of being treated as errors.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::entity::{ExecutionId, TraceModelId, TransformationId};
use crate::domain::error::Diagnostic;
use crate::domain::extract::Entities;
use crate::domain::reference::RecordId;

/// Result of dependency inference over one snapshot.
#[derive(Debug, Clone, Default)]
pub struct DependencyAnalysis {
    pub exec_to_trace: BTreeMap<ExecutionId, TraceModelId>,
    pub trace_to_transformation: BTreeMap<TraceModelId, TransformationId>,
    /// Adjacency list keyed by source trace model.
    pub trace_dependencies: BTreeMap<TraceModelId, Vec<TraceModelId>>,
    /// `(ancestor, descendant)` pairs, as declared.
    pub ancestor_pairs: BTreeSet<(RecordId, RecordId)>,
    /// Latest trace model per transformation.
    pub latest: BTreeMap<TransformationId, TraceModelId>,
    pub diagnostics: Vec<Diagnostic>,
}

impl DependencyAnalysis {
    pub fn is_latest(&self, trace: TraceModelId) -> bool {
        self.latest.values().any(|t| *t == trace)
    }

    pub fn is_ancestor_related(&self, a: TraceModelId, b: TraceModelId) -> bool {
        self.ancestor_pairs.contains(&(a.record(), b.record()))
            || self.ancestor_pairs.contains(&(b.record(), a.record()))
    }

    pub fn dependency_count(&self) -> usize {
        self.trace_dependencies.values().map(Vec::len).sum()
    }
}

/// Every execution whose `generates` resolves to `trace`, in record order.
pub fn execution_candidates(entities: &Entities, trace: TraceModelId) -> Vec<ExecutionId> {
    entities
        .executions
        .values()
        .filter(|e| e.generates == Some(trace.record()))
        .map(|e| e.id)
        .collect()
}

/// Every transformation listing `execution` in its `exec` references, in record order.
pub fn transformation_candidates(
    entities: &Entities,
    execution: ExecutionId,
) -> Vec<TransformationId> {
    entities
        .transformations
        .values()
        .filter(|t| t.exec_refs.contains(&execution.record()))
        .map(|t| t.id)
        .collect()
}

pub fn build_dependencies(entities: &Entities) -> DependencyAnalysis {
    let mut diagnostics = Vec::new();

    let exec_to_trace = map_executions(entities, &mut diagnostics);
    let trace_to_transformation = map_transformations(entities, &exec_to_trace, &mut diagnostics);
    let ancestor_pairs = collect_ancestor_pairs(entities);
    let latest = select_latest(entities, &trace_to_transformation);
    let trace_dependencies =
        infer_dependencies(entities, &trace_to_transformation, &ancestor_pairs, &latest);

    let analysis = DependencyAnalysis {
        exec_to_trace,
        trace_to_transformation,
        trace_dependencies,
        ancestor_pairs,
        latest,
        diagnostics,
    };

    info!(
        mapped = analysis.trace_to_transformation.len(),
        latest = analysis.latest.len(),
        "inferred {} trace dependencies",
        analysis.dependency_count()
    );

    analysis
}

/// Step 1: the first execution generating each trace model.
fn map_executions(
    entities: &Entities,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<ExecutionId, TraceModelId> {
    let mut exec_to_trace = BTreeMap::new();

    for trace in entities.trace_models.keys() {
        let candidates = execution_candidates(entities, *trace);
        let Some(first) = candidates.first().copied() else {
            debug!("trace model {} has no generating execution", trace);
            continue;
        };
        if candidates.len() > 1 {
            let diagnostic = Diagnostic::AmbiguousExecution {
                trace: *trace,
                candidates,
            };
            warn!("{}", diagnostic);
            diagnostics.push(diagnostic);
        }
        exec_to_trace.insert(first, *trace);
    }

    exec_to_trace
}

/// Step 2: the first transformation listing each mapped execution.
fn map_transformations(
    entities: &Entities,
    exec_to_trace: &BTreeMap<ExecutionId, TraceModelId>,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<TraceModelId, TransformationId> {
    let mut trace_to_transformation = BTreeMap::new();

    for (execution, trace) in exec_to_trace {
        let candidates = transformation_candidates(entities, *execution);
        let Some(first) = candidates.first().copied() else {
            debug!("execution {} belongs to no transformation", execution);
            continue;
        };
        if candidates.len() > 1 {
            let diagnostic = Diagnostic::AmbiguousTransformation {
                execution: *execution,
                candidates,
            };
            warn!("{}", diagnostic);
            diagnostics.push(diagnostic);
        }
        trace_to_transformation.insert(*trace, first);
    }

    trace_to_transformation
}

/// Step 3.
fn collect_ancestor_pairs(entities: &Entities) -> BTreeSet<(RecordId, RecordId)> {
    entities
        .trace_models
        .values()
        .filter_map(|t| t.ancestor.map(|ancestor| (ancestor, t.id.record())))
        .collect()
}

/// Step 4: highest version per transformation. Strict `>`, so the first
/// trace model seen wins a tie.
pub fn select_latest(
    entities: &Entities,
    trace_to_transformation: &BTreeMap<TraceModelId, TransformationId>,
) -> BTreeMap<TransformationId, TraceModelId> {
    let mut latest: BTreeMap<TransformationId, (TraceModelId, u32)> = BTreeMap::new();

    for (trace, transformation) in trace_to_transformation {
        let version = entities
            .trace_models
            .get(trace)
            .map(|t| t.version)
            .unwrap_or(1);

        let newer = latest
            .get(transformation)
            .map_or(true, |(_, current)| version > *current);
        if newer {
            latest.insert(*transformation, (*trace, version));
        }
    }

    latest
        .into_iter()
        .map(|(transformation, (trace, _))| (transformation, trace))
        .collect()
}

/// Step 5: pairwise inference. Only latest trace models originate edges;
/// ancestor-related pairs never depend on each other.
fn infer_dependencies(
    entities: &Entities,
    trace_to_transformation: &BTreeMap<TraceModelId, TransformationId>,
    ancestor_pairs: &BTreeSet<(RecordId, RecordId)>,
    latest: &BTreeMap<TransformationId, TraceModelId>,
) -> BTreeMap<TraceModelId, Vec<TraceModelId>> {
    let latest_traces: BTreeSet<TraceModelId> = latest.values().copied().collect();
    let mapped: Vec<(TraceModelId, TransformationId)> = trace_to_transformation
        .iter()
        .map(|(trace, transformation)| (*trace, *transformation))
        .collect();

    let related = |a: TraceModelId, b: TraceModelId| {
        ancestor_pairs.contains(&(a.record(), b.record()))
            || ancestor_pairs.contains(&(b.record(), a.record()))
    };

    let edges: Vec<(TraceModelId, Vec<TraceModelId>)> = mapped
        .par_iter()
        .filter(|(trace, _)| latest_traces.contains(trace))
        .filter_map(|(trace, transformation)| {
            let outputs = &entities.transformations.get(transformation)?.output_refs;

            let dependents: Vec<TraceModelId> = mapped
                .iter()
                .filter(|(other, _)| other != trace && !related(*trace, *other))
                .filter(|(_, other_transformation)| {
                    entities
                        .transformations
                        .get(other_transformation)
                        .map(|t| outputs.iter().any(|out| t.input_refs.contains(out)))
                        .unwrap_or(false)
                })
                .map(|(other, _)| *other)
                .collect();

            if dependents.is_empty() {
                None
            } else {
                Some((*trace, dependents))
            }
        })
        .collect();

    edges.into_iter().collect()
}
