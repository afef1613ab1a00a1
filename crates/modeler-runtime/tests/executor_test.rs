//! Integration tests for Executor::execute.

use std::sync::{Arc, Mutex};

use modeler_catalog::{
  Algorithm, AlgorithmDescriptor, AlgorithmError, ChannelFeedback, Feedback, FeedbackEvent,
  MemoryCatalog, NoopFeedback, OutputDef, OutputKind, ParameterDef, TemplateAlgorithm,
  TemplateOutput, ValueMap,
};
use modeler_model::{ModelGraph, ModelInput, ModelNode, ValueExpression};
use modeler_runtime::{Executor, ModelAlgorithm, RuntimeError};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

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

/// Fails every time it runs.
#[derive(Clone)]
struct Failing {
  outputs: Vec<OutputDef>,
}

impl Algorithm for Failing {
  fn id(&self) -> &str {
    "demo:fail"
  }

  fn parameters(&self) -> &[ParameterDef] {
    &[]
  }

  fn outputs(&self) -> &[OutputDef] {
    &self.outputs
  }

  fn get_copy(&self) -> Box<dyn Algorithm> {
    Box::new(self.clone())
  }

  fn execute(&mut self, _: &ValueMap, _: &dyn Feedback) -> Result<ValueMap, AlgorithmError> {
    Err(AlgorithmError::execution("boom"))
  }
}

/// Records its invocation and cancels the run.
#[derive(Clone)]
struct Cancelling {
  token: CancellationToken,
  calls: Arc<Mutex<usize>>,
  outputs: Vec<OutputDef>,
}

impl Algorithm for Cancelling {
  fn id(&self) -> &str {
    "demo:cancel"
  }

  fn parameters(&self) -> &[ParameterDef] {
    &[]
  }

  fn outputs(&self) -> &[OutputDef] {
    &self.outputs
  }

  fn get_copy(&self) -> Box<dyn Algorithm> {
    Box::new(self.clone())
  }

  fn execute(&mut self, _: &ValueMap, _: &dyn Feedback) -> Result<ValueMap, AlgorithmError> {
    *self.calls.lock().unwrap() += 1;
    self.token.cancel();
    Ok(ValueMap::from([("OUTPUT".to_string(), json!("done"))]))
  }
}

fn vector_output() -> Vec<OutputDef> {
  vec![OutputDef::new("OUTPUT", "Output", OutputKind::Vector)]
}

fn catalog() -> MemoryCatalog {
  MemoryCatalog::new()
    .with(template(
      "demo:buffer",
      vec![
        ParameterDef::vector("INPUT", "Input layer"),
        ParameterDef::number("DISTANCE", "Distance").with_default(10),
      ],
      "buffer({{ INPUT }}, {{ DISTANCE }})",
    ))
    .with(template(
      "demo:centroids",
      vec![ParameterDef::vector("INPUT", "Input layer")],
      "centroids({{ INPUT }})",
    ))
    .with(Failing {
      outputs: vector_output(),
    })
}

/// radius -> BUFFER_1 -> CENTROID_1 (exposed as `centroid`).
fn model() -> ModelGraph {
  let mut graph = ModelGraph::new("Buffered centroids", "Examples");
  graph
    .add_parameter(ModelInput::new(
      ParameterDef::number("radius", "Radius").with_default(5),
    ))
    .unwrap();
  // consumer declared first so the schedule has to reorder
  graph
    .add_algorithm(
      ModelNode::new("demo:centroids")
        .with_name("CENTROID_1")
        .bind("INPUT", ValueExpression::from_output("BUFFER_1", "OUTPUT"))
        .expose("OUTPUT", "centroid"),
    )
    .unwrap();
  graph
    .add_algorithm(
      ModelNode::new("demo:buffer")
        .with_name("BUFFER_1")
        .with_description("Buffer roads")
        .bind("INPUT", ValueExpression::literal("roads.shp"))
        .bind("DISTANCE", ValueExpression::from_input("radius")),
    )
    .unwrap();
  graph
}

fn collect(rx: &mut mpsc::UnboundedReceiver<FeedbackEvent>) -> Vec<FeedbackEvent> {
  let mut events = Vec::new();
  while let Ok(event) = rx.try_recv() {
    events.push(event);
  }
  events
}

#[test]
fn test_end_to_end() {
  let executor = Executor::new(Arc::new(catalog()));
  let inputs = ValueMap::from([("radius".to_string(), json!(10))]);

  let result = executor
    .execute(&model(), &inputs, &NoopFeedback)
    .expect("model failed");

  assert_eq!(result.order, vec!["BUFFER_1", "CENTROID_1"]);
  assert_eq!(
    result.outputs["OUTPUT_ALGCENTROID_1"],
    json!("centroids(buffer(roads.shp, 10.0))")
  );
  assert_eq!(result.outputs.len(), 1);

  let buffer = &result.node_results["BUFFER_1"];
  assert_eq!(buffer.parameters["DISTANCE"], json!(10.0));
  assert_eq!(buffer.outputs["OUTPUT"], json!("buffer(roads.shp, 10.0)"));
}

#[test]
fn test_input_default_is_used() {
  let executor = Executor::new(Arc::new(catalog()));
  let result = executor
    .execute(&model(), &ValueMap::new(), &NoopFeedback)
    .unwrap();
  assert_eq!(
    result.node_results["BUFFER_1"].parameters["DISTANCE"],
    json!(5.0)
  );
}

#[test]
fn test_unbound_parameter_uses_default() {
  let mut graph = model();
  graph
    .node_mut("BUFFER_1")
    .unwrap()
    .bindings
    .remove("DISTANCE");

  let executor = Executor::new(Arc::new(catalog()));
  let result = executor
    .execute(&graph, &ValueMap::new(), &NoopFeedback)
    .unwrap();
  assert_eq!(
    result.node_results["BUFFER_1"].parameters["DISTANCE"],
    json!(10.0)
  );
}

#[test]
fn test_feedback_messages() {
  let (tx, mut rx) = mpsc::unbounded_channel();
  let feedback = ChannelFeedback::new(tx, CancellationToken::new());
  let executor = Executor::new(Arc::new(catalog()));

  executor
    .execute(&model(), &ValueMap::new(), &feedback)
    .unwrap();

  let events = collect(&mut rx);
  assert_eq!(
    events[0],
    FeedbackEvent::DebugInfo("Prepare algorithm: BUFFER_1".to_string())
  );
  assert!(events.contains(&FeedbackEvent::ProgressText(
    "Running Buffer roads [1/2]".to_string()
  )));
  assert!(events.contains(&FeedbackEvent::ProgressText(
    "Running demo:centroids [2/2]".to_string()
  )));
  assert!(events.iter().any(|e| matches!(
    e,
    FeedbackEvent::Info(m) if m.starts_with("OK. Execution took") && m.ends_with("(1 outputs).")
  )));
  assert_eq!(
    events.last(),
    Some(&FeedbackEvent::Info(
      "Model processed ok. Executed 2 algorithms total".to_string()
    ))
  );
}

#[test]
fn test_cycle_fails_without_running() {
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

  let (tx, mut rx) = mpsc::unbounded_channel();
  let feedback = ChannelFeedback::new(tx, CancellationToken::new());
  let err = Executor::new(Arc::new(catalog()))
    .execute(&graph, &ValueMap::new(), &feedback)
    .unwrap_err();

  assert!(matches!(err, RuntimeError::CycleOrUnmetDependency { .. }));
  assert!(collect(&mut rx).is_empty());
}

#[test]
fn test_node_reading_its_own_output_fails_without_running() {
  let mut graph = model();
  graph
    .add_algorithm(
      ModelNode::new("demo:centroids")
        .with_name("SELF_1")
        .bind("INPUT", ValueExpression::from_output("SELF_1", "OUTPUT")),
    )
    .unwrap();

  let (tx, mut rx) = mpsc::unbounded_channel();
  let feedback = ChannelFeedback::new(tx, CancellationToken::new());
  let err = Executor::new(Arc::new(catalog()))
    .execute(&graph, &ValueMap::from([("radius".to_string(), json!(10))]), &feedback)
    .unwrap_err();

  assert!(
    matches!(err, RuntimeError::CycleOrUnmetDependency { ref pending } if pending == &vec!["SELF_1".to_string()])
  );
  assert!(collect(&mut rx).is_empty());
}

#[test]
fn test_explicit_self_dependency_is_ignored() {
  let mut graph = model();
  let node = graph.node("BUFFER_1").unwrap().clone().with_dependency("BUFFER_1");
  graph.update_algorithm(node).unwrap();

  let result = Executor::new(Arc::new(catalog()))
    .execute(&graph, &ValueMap::from([("radius".to_string(), json!(10))]), &NoopFeedback)
    .unwrap();
  assert_eq!(result.order, vec!["BUFFER_1", "CENTROID_1"]);
}

#[test]
fn test_missing_algorithm_fails_before_running() {
  let mut graph = model();
  graph
    .add_algorithm(ModelNode::new("demo:missing").with_name("MISSING_1"))
    .unwrap();

  let err = Executor::new(Arc::new(catalog()))
    .execute(&graph, &ValueMap::new(), &NoopFeedback)
    .unwrap_err();
  assert!(
    matches!(err, RuntimeError::MissingAlgorithm { node_id, algorithm_id } if node_id == "MISSING_1" && algorithm_id == "demo:missing")
  );
}

#[test]
fn test_invalid_reference_fails_before_running() {
  let mut graph = model();
  graph.node_mut("BUFFER_1").unwrap().active = false;

  let err = Executor::new(Arc::new(catalog()))
    .execute(&graph, &ValueMap::new(), &NoopFeedback)
    .unwrap_err();
  assert!(matches!(err, RuntimeError::InvalidReference { node_id, .. } if node_id == "CENTROID_1"));
}

#[test]
fn test_inactive_branch_is_skipped() {
  let mut graph = model();
  graph.deactivate_algorithm("BUFFER_1");

  let result = Executor::new(Arc::new(catalog()))
    .execute(&graph, &ValueMap::new(), &NoopFeedback)
    .unwrap();
  assert!(result.order.is_empty());
  assert!(result.outputs.is_empty());
}

#[test]
fn test_invalid_parameter_value() {
  let mut graph = model();
  graph.node_mut("BUFFER_1").unwrap().bindings.insert(
    "DISTANCE".to_string(),
    ValueExpression::literal("wide"),
  );

  let err = Executor::new(Arc::new(catalog()))
    .execute(&graph, &ValueMap::new(), &NoopFeedback)
    .unwrap_err();
  match err {
    RuntimeError::InvalidParameterValue {
      node_id,
      parameter,
      value,
      ..
    } => {
      assert_eq!(node_id, "BUFFER_1");
      assert_eq!(parameter, "DISTANCE");
      assert_eq!(value, "wide");
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[test]
fn test_node_failure_stops_the_run() {
  let mut graph = model();
  graph
    .add_algorithm(
      ModelNode::new("demo:fail")
        .with_name("FAIL_1")
        .with_description("Always fails"),
    )
    .unwrap();
  graph
    .add_algorithm(
      ModelNode::new("demo:centroids")
        .with_name("AFTER_1")
        .bind("INPUT", ValueExpression::from_output("FAIL_1", "OUTPUT")),
    )
    .unwrap();

  let (tx, mut rx) = mpsc::unbounded_channel();
  let feedback = ChannelFeedback::new(tx, CancellationToken::new());
  let err = Executor::new(Arc::new(catalog()))
    .execute(&graph, &ValueMap::new(), &feedback)
    .unwrap_err();

  match err {
    RuntimeError::NodeExecution {
      node_id,
      description,
      message,
    } => {
      assert_eq!(node_id, "FAIL_1");
      assert_eq!(description, "Always fails");
      assert_eq!(message, "boom");
    }
    other => panic!("unexpected error: {other}"),
  }

  let events = collect(&mut rx);
  assert!(events.contains(&FeedbackEvent::Info("Failed".to_string())));
  assert!(!events.contains(&FeedbackEvent::DebugInfo(
    "Prepare algorithm: AFTER_1".to_string()
  )));
}

#[test]
fn test_cancellation_between_nodes() {
  let token = CancellationToken::new();
  let calls = Arc::new(Mutex::new(0));
  let catalog = catalog().with(Cancelling {
    token: token.clone(),
    calls: calls.clone(),
    outputs: vector_output(),
  });

  let mut graph = ModelGraph::default();
  graph
    .add_algorithm(ModelNode::new("demo:cancel").with_name("FIRST_1"))
    .unwrap();
  graph
    .add_algorithm(ModelNode::new("demo:cancel").with_name("SECOND_1").with_dependency("FIRST_1"))
    .unwrap();

  let (tx, _rx) = mpsc::unbounded_channel();
  let feedback = ChannelFeedback::new(tx, token);
  let err = Executor::new(Arc::new(catalog))
    .execute(&graph, &ValueMap::new(), &feedback)
    .unwrap_err();

  assert!(matches!(err, RuntimeError::Cancelled));
  assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn test_nested_model() {
  let leaves: Arc<MemoryCatalog> = Arc::new(catalog());
  let inner = ModelAlgorithm::new(model(), leaves.clone()).unwrap();
  assert_eq!(inner.id(), "modeler:bufferedcentroids");
  assert_eq!(inner.parameters()[0].name, "radius");
  assert_eq!(inner.outputs()[0].name, "OUTPUT_ALGCENTROID_1");

  let outer_catalog = catalog().with(inner);
  let mut outer = ModelGraph::new("Outer", "Examples");
  outer
    .add_algorithm(
      ModelNode::new("modeler:bufferedcentroids")
        .bind("radius", ValueExpression::literal(2))
        .expose("OUTPUT_ALGCENTROID_1", "nested"),
    )
    .unwrap();

  let result = Executor::new(Arc::new(outer_catalog))
    .execute(&outer, &ValueMap::new(), &NoopFeedback)
    .unwrap();
  assert_eq!(result.order, vec!["MODELERBUFFEREDCENTROIDS_1"]);
  assert_eq!(
    result.outputs["OUTPUT_ALGCENTROID_1_ALGMODELERBUFFEREDCENTROIDS_1"],
    json!("centroids(buffer(roads.shp, 2.0))")
  );
}
