use std::collections::BTreeSet;

use global_trace::api::GraphDto;
use global_trace::application::GlobalTraceUsecase;
use global_trace::domain::{EdgeKind, GlobalTrace, GraphOptions};
use global_trace::infrastructure::{
    load_records, JsonExporter, JsonRecordParser, OutputFormat, TextReportExporter,
    XmiRecordParser,
};
use global_trace::ports::{GraphExporter, RecordParser};
use tempfile::tempdir;

/// psm2code reads PSM through the transformation's own IN attribute.
const DIRECT: &str = r#"<root>
  <nodes xmi:type="mpm_trace:Model" name="PIM"/>
  <nodes xmi:type="mpm_trace:Model" name="PSM"/>
  <nodes xmi:type="mpm_trace:Transformation" name="pim2psm" exec="//@nodes.4" IN="//@nodes.0" OUT="//@nodes.1"/>
  <nodes xmi:type="mpm_trace:Transformation" name="psm2code" exec="//@nodes.5" IN="//@nodes.1"/>
  <nodes xmi:type="mpm_trace:TransformationExecution" generates="//@nodes.6"/>
  <nodes xmi:type="mpm_trace:TransformationExecution" generates="//@nodes.7"/>
  <nodes xmi:type="mpm_trace:TraceModel" name="Tr1"/>
  <nodes xmi:type="mpm_trace:TraceModel" name="Tr2"/>
</root>"#;

/// Same repository, but PSM declares which transformation it feeds.
const MODEL_SIDE: &str = r#"<root>
  <nodes xmi:type="mpm_trace:Model" name="PIM"/>
  <nodes xmi:type="mpm_trace:Model" name="PSM" In="//@nodes.3"/>
  <nodes xmi:type="mpm_trace:Transformation" name="pim2psm" exec="//@nodes.4" IN="//@nodes.0" Out="//@nodes.1"/>
  <nodes xmi:type="mpm_trace:Transformation" name="psm2code" exec="//@nodes.5"/>
  <nodes xmi:type="mpm_trace:TransformationExecution" generates="//@nodes.6"/>
  <nodes xmi:type="mpm_trace:TransformationExecution" generates="//@nodes.7"/>
  <nodes xmi:type="mpm_trace:TraceModel" name="Tr1"/>
  <nodes xmi:type="mpm_trace:TraceModel" name="Tr2"/>
</root>"#;

fn edge_set(trace: &GlobalTrace) -> BTreeSet<(String, String, &'static str)> {
    trace
        .edges
        .iter()
        .map(|e| (e.from.clone(), e.to.clone(), e.kind.label()))
        .collect()
}

fn build(parser: &dyn RecordParser, src: &str) -> GlobalTrace {
    let store = parser.parse(src).unwrap();
    GlobalTrace::build(&store, GraphOptions::default())
}

#[test]
fn model_side_inputs_match_direct_inputs() {
    let direct = build(&XmiRecordParser, DIRECT);
    let model_side = build(&XmiRecordParser, MODEL_SIDE);

    assert_eq!(edge_set(&direct), edge_set(&model_side));
    assert_eq!(model_side.edges_of_kind(EdgeKind::Dependency).count(), 1);
    assert_eq!(direct.levels.as_map(), model_side.levels.as_map());
}

#[test]
fn json_store_matches_xmi() {
    let store = XmiRecordParser.parse(DIRECT).unwrap();
    let json = serde_json::to_string(&store).unwrap();

    let from_xmi = build(&XmiRecordParser, DIRECT);
    let from_json = build(&JsonRecordParser, &json);
    assert_eq!(edge_set(&from_xmi), edge_set(&from_json));
}

#[test]
fn usecase_writes_json_graph() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("nested").join("graph.json");

    let usecase = GlobalTraceUsecase {
        exporter: &JsonExporter,
        options: GraphOptions::default(),
    };
    let store = XmiRecordParser.parse(DIRECT).unwrap();
    let trace = usecase.run(&store, &output).unwrap();
    assert_eq!(trace.trace_nodes().count(), 2);

    let written = std::fs::read_to_string(&output).unwrap();
    let dto: GraphDto = serde_json::from_str(&written).unwrap();
    assert_eq!(dto.levels.get("trace:7"), Some(&1));
    assert!(dto
        .edges
        .iter()
        .any(|e| e.source == "trace:6" && e.target == "trace:7" && e.type_ == "flow"));
}

#[test]
fn usecase_without_models_renders_text_and_dot() {
    let options = GraphOptions {
        include_models: false,
        include_trace_links: false,
    };
    let text = GlobalTraceUsecase {
        exporter: &TextReportExporter,
        options,
    };
    let trace = text.build(&XmiRecordParser.parse(DIRECT).unwrap());
    assert!(trace.nodes.iter().all(|n| n.id.starts_with("trace:")));

    let report = text.exporter.render(&trace).unwrap();
    assert!(report.contains("Tr1"));
    assert!(report.contains("Tr2"));

    let dot = OutputFormat::Dot.exporter().render(&trace).unwrap();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("\"trace:6\" -> \"trace:7\""));
}

#[test]
fn load_records_picks_reader_by_extension() {
    let dir = tempdir().unwrap();
    let xmi = dir.path().join("repo.xmi");
    std::fs::write(&xmi, DIRECT).unwrap();
    let store = load_records(&xmi).unwrap();
    assert_eq!(store.len(), 8);

    let json = dir.path().join("repo.json");
    std::fs::write(&json, serde_json::to_string(&store).unwrap()).unwrap();
    assert_eq!(load_records(&json).unwrap(), store);

    assert!(load_records(&dir.path().join("missing.xmi")).is_err());
}
