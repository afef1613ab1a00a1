use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use modeler_catalog::{Catalog, FsCatalog, TracingFeedback, ValueMap};
use modeler_model::ModelGraph;
use modeler_runtime::{Executor, ModelCatalog};

/// Modeler - build and run composite algorithms
#[derive(Parser)]
#[command(name = "modeler")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.modeler)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// List the available algorithms and models
  List,

  /// Check that a model can run: algorithms, references and execution order
  Validate {
    /// Path to the model file
    model_file: PathBuf,
  },

  /// Print the model's parameters, outputs and help as JSON
  Describe {
    /// Path to the model file
    model_file: PathBuf,
  },

  /// Print the model as a script listing
  Listing {
    /// Path to the model file
    model_file: PathBuf,
  },

  /// Show what a node depends on and what depends on it
  Deps {
    /// Path to the model file
    model_file: PathBuf,

    /// The node name
    #[arg(long)]
    node: String,
  },

  /// Activate a node and save the model
  Activate {
    /// Path to the model file
    model_file: PathBuf,

    /// The node name
    #[arg(long)]
    node: String,
  },

  /// Deactivate a node and everything downstream of it, then save the model
  Deactivate {
    /// Path to the model file
    model_file: PathBuf,

    /// The node name
    #[arg(long)]
    node: String,
  },

  /// Run a model
  Run {
    /// Path to the model file
    model_file: PathBuf,

    /// Model input value as `name=value`; values are parsed as JSON, falling
    /// back to plain text. Repeatable.
    #[arg(long = "input", value_name = "NAME=VALUE")]
    inputs: Vec<String>,
  },
}

fn main() -> Result<()> {
  init_tracing();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".modeler"),
  };

  match cli.command {
    Some(Commands::List) => list_algorithms(&data_dir)?,
    Some(Commands::Validate { model_file }) => validate_model(&model_file, &data_dir)?,
    Some(Commands::Describe { model_file }) => describe_model(&model_file, &data_dir)?,
    Some(Commands::Listing { model_file }) => {
      let catalog = load_catalog(&data_dir)?;
      let graph = load_model(&model_file)?;
      println!("{}", graph.to_source_listing(catalog.as_ref())?);
    }
    Some(Commands::Deps { model_file, node }) => show_dependencies(&model_file, &node)?,
    Some(Commands::Activate { model_file, node }) => {
      let mut graph = load_model(&model_file)?;
      if graph.node(&node).is_none() {
        bail!("node '{}' not found in model", node);
      }
      if !graph.activate_algorithm(&node) {
        bail!(
          "cannot activate '{}': it depends on inactive nodes, activate those first",
          node
        );
      }
      graph.to_file(&model_file)?;
      eprintln!("Activated {}", node);
    }
    Some(Commands::Deactivate { model_file, node }) => {
      let mut graph = load_model(&model_file)?;
      if graph.node(&node).is_none() {
        bail!("node '{}' not found in model", node);
      }
      let affected = graph.dependents(&node);
      graph.deactivate_algorithm(&node);
      graph.to_file(&model_file)?;
      eprintln!(
        "Deactivated {}",
        affected.into_iter().collect::<Vec<_>>().join(", ")
      );
    }
    Some(Commands::Run { model_file, inputs }) => {
      run_model(model_file, inputs, data_dir)?;
    }
    None => {
      println!("modeler - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
}

/// Template algorithms from `<data_dir>/algorithms`, with the models from
/// `<data_dir>/models` layered on top.
fn load_catalog(data_dir: &Path) -> Result<Arc<dyn Catalog>> {
  let algorithms_dir = data_dir.join("algorithms");
  let algorithms = FsCatalog::load(&algorithms_dir)
    .with_context(|| format!("failed to load algorithms from {}", algorithms_dir.display()))?;

  let models_dir = data_dir.join("models");
  let catalog = ModelCatalog::load(Arc::new(algorithms), &models_dir)
    .with_context(|| format!("failed to load models from {}", models_dir.display()))?;

  info!(models = catalog.model_count(), "catalogue loaded");
  Ok(Arc::new(catalog))
}

fn load_model(model_file: &Path) -> Result<ModelGraph> {
  ModelGraph::from_file(model_file)
    .with_context(|| format!("failed to load model file: {}", model_file.display()))
}

fn list_algorithms(data_dir: &Path) -> Result<()> {
  let catalog = load_catalog(data_dir)?;
  for algorithm in catalog.list() {
    println!(
      "{}\t{}\t{}",
      algorithm.id(),
      algorithm.display_name(),
      algorithm.group()
    );
  }
  Ok(())
}

fn validate_model(model_file: &Path, data_dir: &Path) -> Result<()> {
  let catalog = load_catalog(data_dir)?;
  let graph = load_model(model_file)?;

  if let Some(node) = graph.find_cycle() {
    bail!("node '{}' depends on itself", node);
  }
  graph.check_runnable(catalog.as_ref())?;
  graph.validate_references(catalog.as_ref())?;
  let order = graph.schedule()?;

  eprintln!("Model '{}' is valid", graph.name);
  println!("{}", order.join("\n"));
  Ok(())
}

fn describe_model(model_file: &Path, data_dir: &Path) -> Result<()> {
  let catalog = load_catalog(data_dir)?;
  let graph = load_model(model_file)?;

  let description = json!({
    "name": graph.name,
    "group": graph.group,
    "commandLineName": graph.command_line_name(),
    "shortHelp": graph.short_help(),
    "parameters": graph.parameter_definitions(),
    "parameterHelp": graph.parameter_descriptions(),
    "outputs": graph.output_definitions(catalog.as_ref())?,
  });

  println!("{}", serde_json::to_string_pretty(&description)?);
  Ok(())
}

fn show_dependencies(model_file: &Path, node: &str) -> Result<()> {
  let graph = load_model(model_file)?;
  if graph.node(node).is_none() {
    bail!("node '{}' not found in model", node);
  }

  let report = json!({
    "node": node,
    "dependsOn": graph.depends_on(node),
    "dependents": graph.dependents(node),
  });

  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}

fn run_model(model_file: PathBuf, inputs: Vec<String>, data_dir: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_model_async(model_file, inputs, data_dir).await })
}

async fn run_model_async(model_file: PathBuf, inputs: Vec<String>, data_dir: PathBuf) -> Result<()> {
  let graph = load_model(&model_file)?;
  eprintln!("Loaded model: {}", graph.name);

  // Inputs from stdin first, command line pairs override them
  let mut values = read_inputs_from_stdin()?;
  for pair in &inputs {
    let (name, value) = parse_input(pair)?;
    values.insert(name, value);
  }

  let catalog = load_catalog(&data_dir)?;
  let executor = Executor::new(catalog);

  let cancel = CancellationToken::new();
  let feedback = TracingFeedback::new(cancel.clone());

  let ctrl_c_cancel = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupt received, cancelling");
      ctrl_c_cancel.cancel();
    }
  });

  let result = tokio::task::spawn_blocking(move || executor.execute(&graph, &values, &feedback))
    .await
    .context("model execution task failed")?
    .context("model execution failed")?;

  eprintln!("Execution completed: {}", result.execution_id);
  eprintln!("Nodes executed: {}", result.order.join(" -> "));

  println!("{}", serde_json::to_string_pretty(&result.outputs)?);

  Ok(())
}

/// Parse `name=value`, reading the value as JSON when possible.
fn parse_input(pair: &str) -> Result<(String, Value)> {
  let Some((name, raw)) = pair.split_once('=') else {
    bail!("invalid input '{}', expected NAME=VALUE", pair);
  };
  let name = name.trim();
  if name.is_empty() {
    bail!("invalid input '{}', the name is empty", pair);
  }
  let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
  Ok((name.to_string(), value))
}

fn read_inputs_from_stdin() -> Result<ValueMap> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(ValueMap::new());
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read inputs from stdin")?;

  if input.trim().is_empty() {
    Ok(ValueMap::new())
  } else {
    serde_json::from_str(&input).context("failed to parse input JSON from stdin")
  }
}
