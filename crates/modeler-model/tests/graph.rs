//! Integration tests for editing, activating and validating model graphs.

use std::sync::Arc;

use modeler_catalog::{
  AlgorithmDescriptor, MemoryCatalog, OutputKind, ParameterDef, TemplateAlgorithm, TemplateOutput,
};
use modeler_model::{ModelError, ModelGraph, ModelInput, ModelNode, ValueExpression};

fn template(id: &str, parameters: Vec<ParameterDef>, template: &str) -> TemplateAlgorithm {
  TemplateAlgorithm::new(AlgorithmDescriptor {
    id: id.to_string(),
    name: None,
    group: "tests".to_string(),
    parameters,
    outputs: vec![TemplateOutput {
      name: "OUTPUT".to_string(),
      description: "Output".to_string(),
      kind: OutputKind::Vector,
      template: template.to_string(),
    }],
  })
}

fn catalog() -> MemoryCatalog {
  let mut catalog = MemoryCatalog::new();
  catalog
    .register(Arc::new(template(
      "demo:buffer",
      vec![
        ParameterDef::vector("INPUT", "Input layer"),
        ParameterDef::number("DISTANCE", "Distance").with_default(10),
      ],
      "buffer({{ INPUT }}, {{ DISTANCE }})",
    )))
    .unwrap();
  catalog
    .register(Arc::new(template(
      "demo:centroids",
      vec![ParameterDef::vector("INPUT", "Input layer")],
      "centroids({{ INPUT }})",
    )))
    .unwrap();
  catalog
}

/// radius -> BUFFER_1 -> CENTROID_1, plus an unrelated CLIP_1.
fn model() -> ModelGraph {
  let mut graph = ModelGraph::new("Buffered centroids", "Examples");
  graph
    .add_parameter(ModelInput::new(
      ParameterDef::number("radius", "Radius").with_default(5),
    ))
    .unwrap();
  graph
    .add_algorithm(
      ModelNode::new("demo:buffer")
        .with_name("BUFFER_1")
        .with_description("Buffer")
        .bind("INPUT", ValueExpression::literal("roads.shp"))
        .bind("DISTANCE", ValueExpression::from_input("radius")),
    )
    .unwrap();
  graph
    .add_algorithm(
      ModelNode::new("demo:centroids")
        .with_name("CENTROID_1")
        .with_description("Centroids")
        .bind("INPUT", ValueExpression::from_output("BUFFER_1", "OUTPUT"))
        .expose("OUTPUT", "centroid"),
    )
    .unwrap();
  graph
    .add_algorithm(
      ModelNode::new("demo:centroids")
        .with_name("CLIP_1")
        .bind("INPUT", ValueExpression::literal("rivers.shp")),
    )
    .unwrap();
  graph
}

fn active(graph: &ModelGraph) -> Vec<&str> {
  graph
    .nodes()
    .iter()
    .filter(|n| n.active)
    .map(|n| n.name.as_str())
    .collect()
}

#[test]
fn test_deactivation_propagates_downstream() {
  let mut graph = model();
  let expected = graph.dependents("BUFFER_1");

  graph.deactivate_algorithm("BUFFER_1");

  for node in graph.nodes() {
    assert_eq!(node.active, !expected.contains(&node.name), "{}", node.name);
  }
  assert_eq!(active(&graph), vec!["CLIP_1"]);
}

#[test]
fn test_deactivation_is_idempotent() {
  let mut graph = model();
  graph.deactivate_algorithm("BUFFER_1");
  let once = graph.clone();
  graph.deactivate_algorithm("BUFFER_1");
  assert_eq!(graph, once);
}

#[test]
fn test_activation_rejected_while_dependency_inactive() {
  let mut graph = model();
  graph.deactivate_algorithm("BUFFER_1");
  let before = graph.clone();

  assert!(!graph.activate_algorithm("CENTROID_1"));
  assert_eq!(graph, before);

  assert!(graph.activate_algorithm("BUFFER_1"));
  assert!(graph.activate_algorithm("CENTROID_1"));
  assert_eq!(active(&graph), vec!["BUFFER_1", "CENTROID_1", "CLIP_1"]);
}

#[test]
fn test_activation_of_unknown_node() {
  let mut graph = model();
  assert!(!graph.activate_algorithm("NOPE_1"));
}

#[test]
fn test_deletion_guard() {
  let mut graph = model();
  let before = graph.clone();

  assert!(graph.has_dependencies("BUFFER_1"));
  assert!(!graph.remove_algorithm("BUFFER_1"));
  assert_eq!(graph, before);

  assert!(!graph.has_dependencies("CENTROID_1"));
  assert!(graph.remove_algorithm("CENTROID_1"));
  assert!(graph.remove_algorithm("BUFFER_1"));
  assert!(graph.remove_parameter("radius"));
  assert_eq!(active(&graph), vec!["CLIP_1"]);
}

#[test]
fn test_cycle_is_detected_not_looped() {
  let mut graph = ModelGraph::default();
  graph
    .add_algorithm(
      ModelNode::new("demo:centroids")
        .with_name("A_1")
        .bind("INPUT", ValueExpression::from_output("B_1", "OUTPUT")),
    )
    .unwrap();
  graph
    .add_algorithm(
      ModelNode::new("demo:centroids")
        .with_name("B_1")
        .bind("INPUT", ValueExpression::from_output("A_1", "OUTPUT")),
    )
    .unwrap();

  assert_eq!(graph.find_cycle(), Some("A_1"));
  match graph.schedule() {
    Err(ModelError::CycleOrUnmetDependency { pending }) => {
      assert_eq!(pending, vec!["A_1", "B_1"]);
    }
    other => panic!("expected a scheduling error, got {other:?}"),
  }
}

#[test]
fn test_schedule_orders_producers_first() {
  let graph = model();
  let order = graph.schedule().unwrap();
  let position = |name: &str| order.iter().position(|n| n == name).unwrap();
  assert!(position("BUFFER_1") < position("CENTROID_1"));
  assert_eq!(order.len(), 3);
}

#[test]
fn test_validation() {
  let catalog = catalog();
  let mut graph = model();
  graph.check_runnable(&catalog).unwrap();
  graph.validate_references(&catalog).unwrap();

  graph
    .add_algorithm(ModelNode::new("demo:missing").with_name("MISSING_1"))
    .unwrap();
  assert!(matches!(
    graph.check_runnable(&catalog),
    Err(ModelError::MissingAlgorithm { node_id, .. }) if node_id == "MISSING_1"
  ));
}

#[test]
fn test_reference_to_undeclared_output() {
  let catalog = catalog();
  let mut graph = model();
  graph.node_mut("CENTROID_1").unwrap().bindings.insert(
    "INPUT".to_string(),
    ValueExpression::from_output("BUFFER_1", "NOT_AN_OUTPUT"),
  );
  assert!(matches!(
    graph.validate_references(&catalog),
    Err(ModelError::InvalidReference { node_id, .. }) if node_id == "CENTROID_1"
  ));
}

#[test]
fn test_reference_to_inactive_node() {
  let catalog = catalog();
  let mut graph = model();
  graph.node_mut("BUFFER_1").unwrap().active = false;
  assert!(matches!(
    graph.validate_references(&catalog),
    Err(ModelError::InvalidReference { .. })
  ));
}

#[test]
fn test_reference_to_unknown_input() {
  let catalog = catalog();
  let mut graph = model();
  graph.node_mut("CLIP_1").unwrap().bindings.insert(
    "INPUT".to_string(),
    ValueExpression::from_input("layer"),
  );
  assert!(matches!(
    graph.validate_references(&catalog),
    Err(ModelError::InvalidReference { node_id, .. }) if node_id == "CLIP_1"
  ));
}

#[test]
fn test_output_definitions() {
  let catalog = catalog();
  let graph = model();

  let outputs = graph.output_definitions(&catalog).unwrap();
  assert_eq!(outputs.len(), 1);
  assert_eq!(outputs[0].name, "OUTPUT_ALGCENTROID_1");
  assert_eq!(outputs[0].description, "centroid");
  assert_eq!(outputs[0].kind, OutputKind::Vector);

  let parameters = graph.parameter_definitions();
  assert_eq!(parameters.len(), 1);
  assert_eq!(parameters[0].name, "radius");
}

#[test]
fn test_source_listing() {
  let catalog = catalog();
  let listing = model().to_source_listing(&catalog).unwrap();
  let lines: Vec<_> = listing.lines().collect();

  assert_eq!(
    lines,
    vec![
      "##Buffered centroids=name",
      "##radius=number 5",
      "##centroid=output vector",
      "outputs_BUFFER_1=run('demo:buffer', 'roads.shp',radius,None)",
      "outputs_CENTROID_1=run('demo:centroids', outputs_BUFFER_1['OUTPUT'],centroid)",
      "outputs_CLIP_1=run('demo:centroids', 'rivers.shp',None)",
    ]
  );
}

#[test]
fn test_from_file_records_location() {
  let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
  let path = temp_dir.path().join("Buffered_Centroids.model");
  model().to_file(&path).unwrap();

  let loaded = ModelGraph::from_file(&path).unwrap();
  assert_eq!(loaded.description_file.as_deref(), Some(path.as_path()));
  assert_eq!(loaded.command_line_name(), "modeler:buffered_centroids");
  assert_eq!(loaded.nodes(), model().nodes());
}
