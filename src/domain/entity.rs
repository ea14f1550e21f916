// Typed entities projected out of the record store.
// Every entity is keyed by the index of the record it came from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::reference::RecordId;

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(RecordId);

        impl $name {
            pub fn new(index: usize) -> Self {
                $name(RecordId::new(index))
            }

            pub fn record(self) -> RecordId {
                self.0
            }

            pub fn index(self) -> usize {
                self.0.index()
            }
        }

        impl From<$name> for RecordId {
            fn from(id: $name) -> RecordId {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_id!(
    /// Index of a `Model` record.
    ModelId
);
typed_id!(
    /// Index of a `TraceModel` record.
    TraceModelId
);
typed_id!(
    /// Index of a `Transformation` record.
    TransformationId
);
typed_id!(
    /// Index of a `TransformationExecution` record.
    ExecutionId
);

/// Coarse platform-specificity tier of a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbstractionLevel {
    Cim,
    Pim,
    Psm,
    Code,
    Other(String),
}

impl AbstractionLevel {
    pub fn parse(value: &str) -> Option<AbstractionLevel> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        let level = match value.to_lowercase().as_str() {
            "cim" | "computation-independent" => AbstractionLevel::Cim,
            "pim" | "platform-independent" => AbstractionLevel::Pim,
            "psm" | "platform-specific" => AbstractionLevel::Psm,
            "code" | "psc" => AbstractionLevel::Code,
            _ => AbstractionLevel::Other(value.to_string()),
        };
        Some(level)
    }

    pub fn label(&self) -> &str {
        match self {
            AbstractionLevel::Cim => "CIM",
            AbstractionLevel::Pim => "PIM",
            AbstractionLevel::Psm => "PSM",
            AbstractionLevel::Code => "Code",
            AbstractionLevel::Other(s) => s,
        }
    }
}

impl fmt::Display for AbstractionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A data artifact at some abstraction tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub id: ModelId,
    pub name: Option<String>,
    pub conforms_to: Option<RecordId>,
    pub associated_with: Option<RecordId>,
    pub input_to: Vec<RecordId>,
    pub abstraction_level: Option<AbstractionLevel>,
    /// Transformations this model feeds (`In` attribute, second input dialect).
    pub feeds: Vec<RecordId>,
}

/// A reusable transformation definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transformation {
    pub id: TransformationId,
    pub name: Option<String>,
    pub exec_refs: Vec<RecordId>,
    pub input_refs: Vec<RecordId>,
    pub output_refs: Vec<RecordId>,
}

/// One concrete run of a transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationExecution {
    pub id: ExecutionId,
    pub name: Option<String>,
    pub generates: Option<RecordId>,
}

/// Recorded trace of one transformation execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceModel {
    pub id: TraceModelId,
    pub name: Option<String>,
    pub conforms_to: Option<RecordId>,
    /// Trace model this one supersedes.
    pub ancestor: Option<RecordId>,
    pub version: u32,
    pub rules: Vec<Rule>,
}

impl TraceModel {
    pub fn trace_link_count(&self) -> usize {
        self.rules.iter().map(|r| r.trace_links.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rule {
    pub name: Option<String>,
    pub intents: Vec<Intent>,
    pub trace_links: Vec<TraceLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Intent {
    pub name: Option<String>,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceLink {
    pub name: Option<String>,
    pub source_element_path: Option<String>,
    pub target_element_path: Option<String>,
    pub source_attribute: Option<String>,
    pub target_attribute: Option<String>,
    pub link_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkGranularity {
    Element,
    Attribute,
}

impl LinkGranularity {
    pub fn label(&self) -> &'static str {
        match self {
            LinkGranularity::Element => "element",
            LinkGranularity::Attribute => "attribute",
        }
    }
}

impl TraceLink {
    /// Attribute-level when either attribute field is set.
    pub fn granularity(&self) -> LinkGranularity {
        if self.source_attribute.is_some() || self.target_attribute.is_some() {
            LinkGranularity::Attribute
        } else {
            LinkGranularity::Element
        }
    }
}

/// Placeholder shown for missing names and unresolved lookups.
pub const UNKNOWN: &str = "Unknown";

pub fn display_name(name: &Option<String>) -> &str {
    name.as_deref().unwrap_or(UNKNOWN)
}
