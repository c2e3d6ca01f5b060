//! MegaMol configurator CLI.
//!
//! Provides the `megamol-configurator` binary for exercising the editor
//! graph and the sync engine without a GUI. `replay` builds a project in
//! the editor, runs sync frames against an in-memory running graph and
//! prints the resulting host structure. `layers` prints the module layering
//! the presentation layer would use for an automatic layout.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::Level;

use megamol_graph::{layer_modules, Graph, GraphCollection, GraphError, ProjectDescription, StockCatalog};
use megamol_sync::{InMemoryRunningGraph, RunningGraph, RunningSnapshot, SyncEngine, SyncError};

/// MegaMol configurator tools.
#[derive(Parser)]
#[command(name = "megamol-configurator", about = "MegaMol module graph configurator")]
struct Cli {
    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log errors only.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Replay a project into an in-memory running graph.
    Replay {
        /// Stock catalog JSON file.
        #[arg(short, long)]
        stock: PathBuf,

        /// Project description JSON file.
        #[arg(short, long)]
        project: PathBuf,

        /// Number of sync frames to run.
        #[arg(short, long, default_value_t = 2)]
        frames: usize,

        /// Editor-state JSON blob applied after the first host pull.
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Print the module layering of a project.
    Layers {
        /// Stock catalog JSON file.
        #[arg(short, long)]
        stock: PathBuf,

        /// Project description JSON file.
        #[arg(short, long)]
        project: PathBuf,
    },
}

/// Anything wrong with the command's inputs.
#[derive(Debug, Error)]
enum InputError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to build project: {0}")]
    Project(#[from] GraphError),
}

/// Result of a replay run.
struct ReplayOutcome {
    snapshot: RunningSnapshot,
    failures: Vec<SyncError>,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Replay {
            stock,
            project,
            frames,
            state,
        } => run_replay(&stock, &project, frames, state.as_deref()),
        Commands::Layers { stock, project } => run_layers(&stock, &project),
    };
    process::exit(exit_code);
}

/// Execute the replay subcommand.
///
/// Returns exit code: 0 = success, 1 = sync failure, 2 = input error.
fn run_replay(stock: &Path, project: &Path, frames: usize, state: Option<&Path>) -> i32 {
    let outcome = match replay(stock, project, frames, state) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };

    let json = serde_json::to_string_pretty(&outcome.snapshot)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize snapshot: {}\"}}", e));
    println!("{}", json);

    if outcome.failures.is_empty() {
        0
    } else {
        eprintln!("Sync failed with {} error(s):", outcome.failures.len());
        for err in &outcome.failures {
            eprintln!("  - {}", err);
        }
        1
    }
}

/// Execute the layers subcommand.
///
/// Returns exit code: 0 = success, 2 = input error.
fn run_layers(stock: &Path, project: &Path) -> i32 {
    match layers(stock, project) {
        Ok(layers) => {
            let json = serde_json::to_string_pretty(&layers)
                .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize layers: {}\"}}", e));
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    }
}

fn replay(
    stock_path: &Path,
    project_path: &Path,
    frames: usize,
    state_path: Option<&Path>,
) -> Result<ReplayOutcome, InputError> {
    let stock: StockCatalog = read_json(stock_path)?;
    let project: ProjectDescription = read_json(project_path)?;
    let state = state_path.map(read_file).transpose()?;

    let mut host = InMemoryRunningGraph::from_stock(&stock);
    let mut collection = GraphCollection::new();
    collection.set_stock(stock);
    let id = collection.add_graph(Some(&project_name(project_path)));
    collection.set_running_graph(id)?;
    if let Some((stock, graph)) = collection.stock_and_running_graph_mut() {
        graph.load_project(stock, &project)?;
    }

    let mut engine = SyncEngine::new();
    if let Some(state) = state {
        engine.set_pending_state(state);
    }

    let mut failures = Vec::new();
    for frame in 0..frames {
        let report = engine.synchronize(&mut collection, &mut host);
        tracing::info!(
            frame,
            direction = ?report.direction,
            replayed = report.replayed,
            failures = report.failures.len(),
            "sync frame"
        );
        failures.extend(report.failures);
    }

    Ok(ReplayOutcome {
        snapshot: host.snapshot(),
        failures,
    })
}

/// Module names per layer, callers before callees.
fn layers(stock_path: &Path, project_path: &Path) -> Result<Vec<Vec<String>>, InputError> {
    let stock: StockCatalog = read_json(stock_path)?;
    let project: ProjectDescription = read_json(project_path)?;
    let graph = Graph::from_project(&project_name(project_path), &stock, &project)?;

    Ok(layer_modules(&graph)
        .into_iter()
        .map(|layer| {
            layer
                .into_iter()
                .filter_map(|id| graph.module(id).map(|m| m.name().to_string()))
                .collect()
        })
        .collect())
}

fn project_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_file(path: &Path) -> Result<String, InputError> {
    fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, InputError> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|source| InputError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
