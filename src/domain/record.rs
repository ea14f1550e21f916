use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::reference::RecordId;

/// Attribute carrying the declared type of a record.
pub const TYPE_ATTRIBUTE: &str = "xmi:type";
/// Fallback type attribute used by some serializers.
pub const XSI_TYPE_ATTRIBUTE: &str = "xsi:type";

/// A raw element of the input tree: a name, flat string attributes and
/// nested children (rules, intents, params, trace links).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter, mostly for tests and fixtures.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Raw declared type, e.g. `mpm_trace:TraceModel`.
    pub fn declared_type(&self) -> Option<&str> {
        self.attr(TYPE_ATTRIBUTE).or_else(|| self.attr(XSI_TYPE_ATTRIBUTE))
    }

    pub fn type_tag(&self) -> Option<TypeTag> {
        self.declared_type().and_then(TypeTag::parse)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// The four record kinds the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    Model,
    TraceModel,
    Transformation,
    TransformationExecution,
}

impl TypeTag {
    /// Parse a declared type. The namespace prefix is ignored, so
    /// `mpm_trace:Model` and `Model` are the same tag.
    pub fn parse(declared: &str) -> Option<TypeTag> {
        let local = declared.rsplit(':').next().unwrap_or(declared).trim();
        match local {
            "Model" => Some(TypeTag::Model),
            "TraceModel" => Some(TypeTag::TraceModel),
            "Transformation" => Some(TypeTag::Transformation),
            "TransformationExecution" => Some(TypeTag::TransformationExecution),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TypeTag::Model => "Model",
            TypeTag::TraceModel => "TraceModel",
            TypeTag::Transformation => "Transformation",
            TypeTag::TransformationExecution => "TransformationExecution",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Flat, order-indexed list of input records.
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordStore {
    #[serde(rename = "nodes", default)]
    records: Vec<Element>,
}

impl RecordStore {
    pub fn new(records: Vec<Element>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&Element> {
        self.records.get(id.index())
    }

    /// All records in input order.
    pub fn all(&self) -> impl Iterator<Item = (RecordId, &Element)> + '_ {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| (RecordId::new(i), r))
    }

    /// Records carrying the given type tag, input order preserved.
    pub fn records_of_type(&self, tag: TypeTag) -> impl Iterator<Item = (RecordId, &Element)> + '_ {
        self.all().filter(move |(_, r)| r.type_tag() == Some(tag))
    }

    /// `name` attribute of a record, if the record exists and has one.
    pub fn name_of(&self, id: RecordId) -> Option<&str> {
        self.get(id).and_then(|r| r.attr("name"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(tag: &str, name: &str) -> Element {
        Element::new("nodes")
            .with_attr(TYPE_ATTRIBUTE, tag)
            .with_attr("name", name)
    }

    #[test]
    fn test_type_tag_parse() {
        assert_eq!(TypeTag::parse("mpm_trace:Model"), Some(TypeTag::Model));
        assert_eq!(TypeTag::parse("TraceModel"), Some(TypeTag::TraceModel));
        assert_eq!(
            TypeTag::parse("other:TransformationExecution"),
            Some(TypeTag::TransformationExecution)
        );
        assert_eq!(TypeTag::parse("mpm_trace:MetaModel"), None);
    }

    #[test]
    fn test_records_of_type_preserves_order() {
        let store = RecordStore::new(vec![
            typed("mpm_trace:Model", "a"),
            typed("mpm_trace:TraceModel", "t"),
            typed("mpm_trace:Model", "b"),
            typed("mpm_trace:Unknown", "u"),
        ]);

        let models: Vec<(usize, &str)> = store
            .records_of_type(TypeTag::Model)
            .map(|(id, r)| (id.index(), r.attr("name").unwrap()))
            .collect();
        assert_eq!(models, vec![(0, "a"), (2, "b")]);
        assert_eq!(store.all().count(), 4);
    }

    #[test]
    fn test_xsi_type_fallback() {
        let record = Element::new("nodes").with_attr(XSI_TYPE_ATTRIBUTE, "mpm_trace:Transformation");
        assert_eq!(record.type_tag(), Some(TypeTag::Transformation));
    }

    #[test]
    fn test_empty_store() {
        let store = RecordStore::default();
        assert!(store.is_empty());
        assert_eq!(store.all().count(), 0);
        assert_eq!(store.records_of_type(TypeTag::Model).count(), 0);
        assert!(store.name_of(RecordId::new(0)).is_none());
    }
}
