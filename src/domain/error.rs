//! Error and diagnostic types for the trace graph engine.
//!
//! `TraceGraphError` describes what went wrong with one input value or with
//! the dependency graph. The engine degrades around all of them, recording a
//! [`Diagnostic`] next to the result instead of failing.

use std::fmt;

use thiserror::Error;

use crate::domain::reference::RecordId;
use crate::domain::record::TypeTag;
use crate::domain::entity::{ExecutionId, TraceModelId, TransformationId};

/// Structured errors raised by the reference resolver and version parser,
/// and carried inside diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceGraphError {
    /// A non-empty reference whose last segment is not an integer.
    #[error("malformed reference `{reference}`: segment `{segment}` is not a record index")]
    MalformedReference { reference: String, segment: String },

    /// A trace model `version` attribute that is not a positive integer.
    #[error("invalid version `{value}`: expected a positive integer")]
    InvalidVersion { value: String },

    /// Some trace models sit on or behind a dependency cycle.
    #[error("cyclic dependency between trace models {}", format_ids(nodes))]
    CyclicDependency { nodes: Vec<TraceModelId> },
}

pub type TraceGraphResult<T> = Result<T, TraceGraphError>;

fn format_ids(nodes: &[TraceModelId]) -> String {
    let ids: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
    format!("[{}]", ids.join(", "))
}

/// A non-fatal finding collected while building the global trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A reference field could not be parsed and was treated as absent.
    MalformedReference {
        record: RecordId,
        kind: TypeTag,
        field: &'static str,
        error: TraceGraphError,
    },
    /// A trace model declared a version that is not a positive integer.
    InvalidVersion {
        trace: TraceModelId,
        error: TraceGraphError,
    },
    /// A reference points at an index that is not an entity of the expected kind.
    UnresolvedEntity {
        record: RecordId,
        field: &'static str,
        target: RecordId,
    },
    /// Several executions generate the same trace model.
    AmbiguousExecution {
        trace: TraceModelId,
        candidates: Vec<ExecutionId>,
    },
    /// Several transformations list the same execution.
    AmbiguousTransformation {
        execution: ExecutionId,
        candidates: Vec<TransformationId>,
    },
    /// The dependency graph has a cycle; its members keep partial levels.
    CyclicDependency { error: TraceGraphError },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedReference { record, kind, field, error } => {
                write!(f, "{} {}: field `{}` ignored: {}", kind, record, field, error)
            }
            Diagnostic::InvalidVersion { trace, error } => {
                write!(f, "trace model {}: {}, using version 1", trace, error)
            }
            Diagnostic::UnresolvedEntity { record, field, target } => {
                write!(f, "record {}: `{}` points at unknown record {}", record, field, target)
            }
            Diagnostic::AmbiguousExecution { trace, candidates } => {
                write!(
                    f,
                    "trace model {} is generated by {} executions, using {}",
                    trace,
                    candidates.len(),
                    candidates[0]
                )
            }
            Diagnostic::AmbiguousTransformation { execution, candidates } => {
                write!(
                    f,
                    "execution {} is listed by {} transformations, using {}",
                    execution,
                    candidates.len(),
                    candidates[0]
                )
            }
            Diagnostic::CyclicDependency { error } => {
                write!(f, "{}, levels of those trace models are partial", error)
            }
        }
    }
}
