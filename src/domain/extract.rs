//! Entity Extractor
//!
//! Projects raw records into typed entities. Each stage takes the store (and,
//! for the merge, the output of earlier stages) and returns a fresh map;
//! [`extract_entities`] composes them.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::domain::entity::{
    AbstractionLevel, ExecutionId, Intent, Model, ModelId, Rule, TraceLink, TraceModel,
    TraceModelId, Transformation, TransformationExecution, TransformationId,
};
use crate::domain::error::{Diagnostic, TraceGraphError};
use crate::domain::record::{Element, RecordStore, TypeTag};
use crate::domain::reference::{resolve_many, resolve_one, RecordId};

/// All typed entities of one snapshot, keyed by record index.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    pub models: BTreeMap<ModelId, Model>,
    pub trace_models: BTreeMap<TraceModelId, TraceModel>,
    pub transformations: BTreeMap<TransformationId, Transformation>,
    pub executions: BTreeMap<ExecutionId, TransformationExecution>,
}

impl Entities {
    pub fn model(&self, id: RecordId) -> Option<&Model> {
        self.models.get(&ModelId::new(id.index()))
    }

    pub fn trace_model(&self, id: RecordId) -> Option<&TraceModel> {
        self.trace_models.get(&TraceModelId::new(id.index()))
    }

    pub fn transformation(&self, id: RecordId) -> Option<&Transformation> {
        self.transformations.get(&TransformationId::new(id.index()))
    }
}

/// Entities plus the diagnostics raised while reading them.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub entities: Entities,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run every extraction stage over the store.
pub fn extract_entities(store: &RecordStore) -> Extraction {
    let mut diagnostics = Vec::new();

    let models = extract_models(store, &mut diagnostics);
    let trace_models = extract_trace_models(store, &mut diagnostics);
    let executions = extract_executions(store, &mut diagnostics);
    let direct = extract_transformations(store, &mut diagnostics);
    let transformations = merge_model_inputs(&direct, &models);

    info!(
        models = models.len(),
        trace_models = trace_models.len(),
        transformations = transformations.len(),
        executions = executions.len(),
        "extracted entities from {} records",
        store.len()
    );

    Extraction {
        entities: Entities {
            models,
            trace_models,
            transformations,
            executions,
        },
        diagnostics,
    }
}

/// Reads attributes of one record, turning malformed references into
/// diagnostics and treating the field as absent.
struct FieldReader<'a> {
    id: RecordId,
    kind: TypeTag,
    element: &'a Element,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<'a> FieldReader<'a> {
    fn new(
        id: RecordId,
        kind: TypeTag,
        element: &'a Element,
        diagnostics: &'a mut Vec<Diagnostic>,
    ) -> Self {
        Self { id, kind, element, diagnostics }
    }

    fn text(&self, field: &str) -> Option<String> {
        self.element.attr(field).map(str::to_string)
    }

    fn one(&mut self, field: &'static str) -> Option<RecordId> {
        match resolve_one(self.element.attr(field)) {
            Ok(id) => id,
            Err(error) => {
                self.malformed(field, error);
                None
            }
        }
    }

    fn many(&mut self, field: &'static str) -> Vec<RecordId> {
        match resolve_many(self.element.attr(field)) {
            Ok(ids) => ids,
            Err(error) => {
                self.malformed(field, error);
                Vec::new()
            }
        }
    }

    fn malformed(&mut self, field: &'static str, error: TraceGraphError) {
        let diagnostic = Diagnostic::MalformedReference {
            record: self.id,
            kind: self.kind,
            field,
            error,
        };
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

pub fn extract_models(
    store: &RecordStore,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<ModelId, Model> {
    store
        .records_of_type(TypeTag::Model)
        .map(|(id, element)| {
            let mut fields = FieldReader::new(id, TypeTag::Model, element, diagnostics);
            let model = Model {
                id: ModelId::new(id.index()),
                name: fields.text("name"),
                conforms_to: fields.one("conformsTo"),
                associated_with: fields.one("associatedWith"),
                input_to: fields.many("inputTo"),
                abstraction_level: element
                    .attr("abstractionLevel")
                    .and_then(AbstractionLevel::parse),
                feeds: fields.many("In"),
            };
            (model.id, model)
        })
        .collect()
}

pub fn extract_trace_models(
    store: &RecordStore,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<TraceModelId, TraceModel> {
    let mut trace_models = BTreeMap::new();

    for (id, element) in store.records_of_type(TypeTag::TraceModel) {
        let trace_id = TraceModelId::new(id.index());
        let mut fields = FieldReader::new(id, TypeTag::TraceModel, element, diagnostics);
        let name = fields.text("name");
        let conforms_to = fields.one("conformsTo");
        let ancestor = fields.one("ancestor");

        let version = match parse_version(element.attr("version")) {
            Ok(v) => v,
            Err(error) => {
                let diagnostic = Diagnostic::InvalidVersion { trace: trace_id, error };
                warn!("{}", diagnostic);
                diagnostics.push(diagnostic);
                1
            }
        };

        let rules = element.children_named("contains").map(extract_rule).collect();

        trace_models.insert(
            trace_id,
            TraceModel {
                id: trace_id,
                name,
                conforms_to,
                ancestor,
                version,
                rules,
            },
        );
    }

    trace_models
}

fn parse_version(value: Option<&str>) -> Result<u32, TraceGraphError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(1);
    };
    match value.parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(TraceGraphError::InvalidVersion {
            value: value.to_string(),
        }),
    }
}

fn extract_rule(element: &Element) -> Rule {
    let intents = element
        .children_named("intents")
        .map(|intent| Intent {
            name: intent.attr("name").map(str::to_string),
            params: intent
                .children_named("params")
                .filter_map(|p| p.attr("name").map(str::to_string))
                .collect(),
        })
        .collect();

    let trace_links = element
        .children_named("traceLinks")
        .map(|link| TraceLink {
            name: link.attr("name").map(str::to_string),
            source_element_path: link.attr("sourceElementPath").map(str::to_string),
            target_element_path: link.attr("targetElementPath").map(str::to_string),
            source_attribute: link.attr("sourceAttribute").map(str::to_string),
            target_attribute: link.attr("targetAttribute").map(str::to_string),
            link_type: link.attr("linkType").map(str::to_string),
        })
        .collect();

    Rule {
        name: element.attr("name").map(str::to_string),
        intents,
        trace_links,
    }
}

pub fn extract_executions(
    store: &RecordStore,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<ExecutionId, TransformationExecution> {
    store
        .records_of_type(TypeTag::TransformationExecution)
        .map(|(id, element)| {
            let mut fields =
                FieldReader::new(id, TypeTag::TransformationExecution, element, diagnostics);
            let execution = TransformationExecution {
                id: ExecutionId::new(id.index()),
                name: fields.text("name"),
                generates: fields.one("generates"),
            };
            (execution.id, execution)
        })
        .collect()
}

/// Direct pass: `exec`, `IN` and `OUT` (or `Out`) read off the transformation itself.
pub fn extract_transformations(
    store: &RecordStore,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<TransformationId, Transformation> {
    store
        .records_of_type(TypeTag::Transformation)
        .map(|(id, element)| {
            let output_field = match element.attr("OUT") {
                Some(out) if !out.trim().is_empty() => "OUT",
                _ => "Out",
            };
            let mut fields = FieldReader::new(id, TypeTag::Transformation, element, diagnostics);
            let transformation = Transformation {
                id: TransformationId::new(id.index()),
                name: fields.text("name"),
                exec_refs: fields.many("exec"),
                input_refs: fields.many("IN"),
                output_refs: fields.many(output_field),
            };
            (transformation.id, transformation)
        })
        .collect()
}

/// Merge pass: every model listing transformations in `In` becomes an input
/// of each of them. Appended after the transformation's own `IN` entries, in
/// model record order. Returns a new map; the direct pass is left untouched.
pub fn merge_model_inputs(
    transformations: &BTreeMap<TransformationId, Transformation>,
    models: &BTreeMap<ModelId, Model>,
) -> BTreeMap<TransformationId, Transformation> {
    models
        .values()
        .filter(|m| !m.feeds.is_empty())
        .fold(transformations.clone(), |mut merged, model| {
            for target in &model.feeds {
                match merged.get_mut(&TransformationId::new(target.index())) {
                    Some(transformation) => transformation.input_refs.push(model.id.record()),
                    None => debug!(
                        "model {} feeds record {} which is not a transformation",
                        model.id, target
                    ),
                }
            }
            merged
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::TYPE_ATTRIBUTE;

    fn node(tag: &str) -> Element {
        Element::new("nodes").with_attr(TYPE_ATTRIBUTE, format!("mpm_trace:{}", tag))
    }

    #[test]
    fn test_unrecognised_tags_are_ignored() {
        let store = RecordStore::new(vec![
            node("MetaModel").with_attr("name", "mm"),
            node("Model").with_attr("name", "m"),
        ]);
        let extraction = extract_entities(&store);
        assert_eq!(extraction.entities.models.len(), 1);
        assert!(extraction.entities.models.contains_key(&ModelId::new(1)));
        assert!(extraction.diagnostics.is_empty());
    }

    #[test]
    fn test_out_falls_back_to_capitalized_variant() {
        let store = RecordStore::new(vec![node("Transformation")
            .with_attr("exec", "//@nodes.1")
            .with_attr("Out", "//@nodes.4 //@nodes.5")]);
        let mut diagnostics = Vec::new();
        let transformations = extract_transformations(&store, &mut diagnostics);
        let t = &transformations[&TransformationId::new(0)];
        assert_eq!(t.output_refs, vec![RecordId::new(4), RecordId::new(5)]);
        assert_eq!(t.exec_refs, vec![RecordId::new(1)]);
        assert!(t.input_refs.is_empty());
    }

    #[test]
    fn test_dialect_merge_appends_after_direct_inputs() {
        let store = RecordStore::new(vec![
            node("Model").with_attr("name", "m0").with_attr("In", "//@nodes.3"),
            node("Model").with_attr("name", "m1"),
            node("Model").with_attr("name", "m2").with_attr("In", "//@nodes.3 //@nodes.1"),
            node("Transformation").with_attr("IN", "//@nodes.1"),
        ]);
        let extraction = extract_entities(&store);
        let t = &extraction.entities.transformations[&TransformationId::new(3)];
        assert_eq!(
            t.input_refs,
            vec![RecordId::new(1), RecordId::new(0), RecordId::new(2)]
        );
    }

    #[test]
    fn test_merge_leaves_direct_pass_untouched() {
        let store = RecordStore::new(vec![
            node("Model").with_attr("In", "//@nodes.1"),
            node("Transformation"),
        ]);
        let mut diagnostics = Vec::new();
        let models = extract_models(&store, &mut diagnostics);
        let direct = extract_transformations(&store, &mut diagnostics);
        let merged = merge_model_inputs(&direct, &models);

        assert!(direct[&TransformationId::new(1)].input_refs.is_empty());
        assert_eq!(
            merged[&TransformationId::new(1)].input_refs,
            vec![RecordId::new(0)]
        );
    }

    #[test]
    fn test_malformed_reference_becomes_diagnostic() {
        let store = RecordStore::new(vec![node("TraceModel")
            .with_attr("name", "tr")
            .with_attr("ancestor", "//@nodes.oops")]);
        let extraction = extract_entities(&store);
        let trace = &extraction.entities.trace_models[&TraceModelId::new(0)];
        assert_eq!(trace.ancestor, None);
        assert_eq!(extraction.diagnostics.len(), 1);
        assert!(matches!(
            extraction.diagnostics[0],
            Diagnostic::MalformedReference { field: "ancestor", .. }
        ));
    }

    #[test]
    fn test_trace_model_version_and_rules() {
        let rule = Element::new("contains")
            .with_attr("name", "Class2Table")
            .with_child(
                Element::new("intents")
                    .with_attr("name", "map")
                    .with_child(Element::new("params").with_attr("name", "src"))
                    .with_child(Element::new("params").with_attr("name", "dst")),
            )
            .with_child(Element::new("traceLinks").with_attr("name", "l0"))
            .with_child(
                Element::new("traceLinks")
                    .with_attr("name", "l1")
                    .with_attr("sourceAttribute", "name"),
            );
        let store = RecordStore::new(vec![
            node("TraceModel").with_attr("version", "3").with_child(rule),
            node("TraceModel"),
            node("TraceModel").with_attr("version", "zero"),
        ]);
        let extraction = extract_entities(&store);
        let traces = &extraction.entities.trace_models;

        let first = &traces[&TraceModelId::new(0)];
        assert_eq!(first.version, 3);
        assert_eq!(first.rules.len(), 1);
        assert_eq!(first.rules[0].intents[0].params, vec!["src", "dst"]);
        assert_eq!(first.trace_link_count(), 2);

        assert_eq!(traces[&TraceModelId::new(1)].version, 1);
        assert_eq!(traces[&TraceModelId::new(2)].version, 1);
        assert!(matches!(
            extraction.diagnostics[0],
            Diagnostic::InvalidVersion { .. }
        ));
    }
}
