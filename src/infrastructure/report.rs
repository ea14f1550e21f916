//! Plain-text report of a global trace: levels, dependencies, evolution,
//! transformation I/O and diagnostics.

use std::fmt::Write;

use anyhow::Result;

use crate::domain::entity::{display_name, TraceModelId, Transformation, UNKNOWN};
use crate::domain::global_trace::GlobalTrace;
use crate::domain::reference::RecordId;
use crate::ports::GraphExporter;

pub struct TextReportExporter;

impl GraphExporter for TextReportExporter {
    fn render(&self, trace: &GlobalTrace) -> Result<String> {
        let mut out = String::new();
        write_report(&mut out, trace)?;
        Ok(out)
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}

fn trace_label(trace: &GlobalTrace, id: TraceModelId) -> String {
    let name = trace
        .entities
        .trace_models
        .get(&id)
        .map(|t| display_name(&t.name))
        .unwrap_or(UNKNOWN);
    format!("{} [{}]", name, id)
}

fn model_names(trace: &GlobalTrace, refs: &[RecordId]) -> String {
    if refs.is_empty() {
        return "(none)".to_string();
    }
    let names: Vec<String> = refs
        .iter()
        .map(|id| {
            let name = trace
                .entities
                .model(*id)
                .map(|m| display_name(&m.name))
                .unwrap_or(UNKNOWN);
            format!("{} [{}]", name, id)
        })
        .collect();
    names.join(", ")
}

fn write_report(out: &mut String, trace: &GlobalTrace) -> std::fmt::Result {
    let analysis = &trace.analysis;

    writeln!(
        out,
        "Global trace: {} trace models, {} dependencies, {} levels",
        trace.entities.trace_models.len(),
        analysis.dependency_count(),
        trace.levels.levels_by_rank().len()
    )?;

    for (level, layer) in trace.levels.levels_by_rank().iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "Level {} (L{})", level, level)?;
        for id in layer {
            let transformation = analysis
                .trace_to_transformation
                .get(id)
                .and_then(|t| trace.entities.transformations.get(t))
                .map(|t| display_name(&t.name))
                .unwrap_or(UNKNOWN);
            let version = trace
                .entities
                .trace_models
                .get(id)
                .map(|t| t.version)
                .unwrap_or(1);
            let marker = if analysis.is_latest(*id) { " *" } else { "" };
            writeln!(
                out,
                "  {} <- {} v{}{}",
                trace_label(trace, *id),
                transformation,
                version,
                marker
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Dependencies")?;
    if analysis.trace_dependencies.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for (source, targets) in &analysis.trace_dependencies {
        for target in targets {
            writeln!(
                out,
                "  {} -> {}",
                trace_label(trace, *source),
                trace_label(trace, *target)
            )?;
        }
    }

    let evolution: Vec<(TraceModelId, TraceModelId)> = trace
        .entities
        .trace_models
        .values()
        .filter_map(|t| {
            let parent = trace.entities.trace_model(t.ancestor?)?;
            Some((parent.id, t.id))
        })
        .collect();
    if !evolution.is_empty() {
        writeln!(out)?;
        writeln!(out, "Evolution")?;
        for (ancestor, descendant) in evolution {
            writeln!(
                out,
                "  {} ~> {}",
                trace_label(trace, ancestor),
                trace_label(trace, descendant)
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Transformation I/O")?;
    for transformation in trace.entities.transformations.values() {
        write_transformation(out, trace, transformation)?;
    }

    if !trace.diagnostics.is_empty() {
        writeln!(out)?;
        writeln!(out, "Diagnostics")?;
        for diagnostic in &trace.diagnostics {
            writeln!(out, "  - {}", diagnostic)?;
        }
    }

    Ok(())
}

fn write_transformation(
    out: &mut String,
    trace: &GlobalTrace,
    transformation: &Transformation,
) -> std::fmt::Result {
    writeln!(
        out,
        "  {} [{}]",
        display_name(&transformation.name),
        transformation.id
    )?;
    writeln!(out, "    IN:  {}", model_names(trace, &transformation.input_refs))?;
    writeln!(out, "    OUT: {}", model_names(trace, &transformation.output_refs))
}
