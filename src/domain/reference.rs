//! Reference Resolver.
//! Turns path-like references (`//@nodes.12`) into record indices.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::{TraceGraphError, TraceGraphResult};

/// Position of a record in the [`RecordStore`](crate::domain::record::RecordStore).
/// Stable for one run only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(usize);

impl RecordId {
    pub fn new(index: usize) -> Self {
        RecordId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolve a single reference path.
///
/// Empty or absent input yields `Ok(None)`, as does a path with no `.`
/// (it carries no index segment). A non-numeric last segment is a
/// [`TraceGraphError::MalformedReference`].
pub fn resolve_one(path: Option<&str>) -> TraceGraphResult<Option<RecordId>> {
    let path = match path.map(str::trim) {
        Some(p) if !p.is_empty() => p,
        _ => return Ok(None),
    };

    let Some((_, segment)) = path.rsplit_once('.') else {
        return Ok(None);
    };

    segment
        .parse::<usize>()
        .map(|index| Some(RecordId(index)))
        .map_err(|_| TraceGraphError::MalformedReference {
            reference: path.to_string(),
            segment: segment.to_string(),
        })
}

/// Resolve a whitespace-separated list of reference paths.
/// Order and duplicates are preserved; tokens without an index are dropped.
pub fn resolve_many(path: Option<&str>) -> TraceGraphResult<Vec<RecordId>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };

    let mut ids = Vec::new();
    for token in path.split_whitespace() {
        if let Some(id) = resolve_one(Some(token))? {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Canonical path form of a record index.
pub fn to_reference_path(id: RecordId) -> String {
    format!("//@nodes.{}", id.0)
}
