//! A thin command line front-end over `link-engine`: load a blueprint, run
//! the engine, print the resulting chains or warnings (or a diagnostic
//! error). Plugin transport for real providers is out of scope here (see
//! the crate's `DESIGN.md`); this binary runs against whatever
//! `ProviderRegistry` `build_registry` assembles, which is empty by
//! default — embedders of this crate register their own providers before
//! constructing an `Engine` directly rather than going through this binary.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use common::serde::Serialize;
use common::tokio_util::sync::CancellationToken;
use link_engine::{load_blueprint, Engine, NodeRef};
use provider::{ProviderLookup, ProviderRegistry};

#[derive(Parser)]
#[clap(name = "link-engine", about = "Resolve a blueprint's dependency links")]
struct Cli {
    #[clap(subcommand)]
    action: Action,
}

#[derive(Parser)]
enum Action {
    /// Resolve and print the chain forest for a blueprint
    Links(Links),
    /// Resolve and print the warnings for a blueprint
    Warnings(Warnings),
}

#[derive(Parser)]
struct Links {
    /// Path to the blueprint file (YAML or JSON)
    path: PathBuf,
}

#[derive(Parser)]
struct Warnings {
    /// Path to the blueprint file (YAML or JSON)
    path: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn build_registry() -> Arc<dyn ProviderLookup> {
    Arc::new(ProviderRegistry::new())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let token = CancellationToken::new();

    let result = match cli.action {
        Action::Links(Links { path }) => run_links(path, &token).await,
        Action::Warnings(Warnings { path }) => run_warnings(path, &token).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

/// A serializable view of one chain-forest node. `links_to`/`linked_from`
/// are recorded as resource names rather than nested objects: a node may be
/// reachable from more than one root, and a successful build may legally
/// contain a soft cycle (see `link_engine::ChainLinkNode`'s doc comment), so
/// nesting full subtrees would recurse forever at serialization time the
/// same way an unguarded tree walk would.
#[derive(Serialize)]
#[serde(crate = "common::serde")]
struct ChainNodeView {
    name: String,
    resource_type: String,
    paths: Vec<String>,
    selectors: HashMap<String, Vec<String>>,
    links_to: Vec<String>,
    linked_from: Vec<String>,
}

#[derive(Serialize)]
#[serde(crate = "common::serde")]
struct ForestView {
    roots: Vec<String>,
    nodes: Vec<ChainNodeView>,
}

/// Flatten the forest reachable from `roots` into one `ChainNodeView` per
/// distinct node, visiting each at most once regardless of how many roots
/// or paths lead to it.
fn build_forest_view(roots: &[NodeRef]) -> ForestView {
    let root_names = roots.iter().map(|r| r.borrow().resource_name.clone()).collect();

    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    let mut stack: Vec<NodeRef> = roots.to_vec();

    while let Some(node_ref) = stack.pop() {
        let node = node_ref.borrow();
        if !seen.insert(node.resource_name.clone()) {
            continue;
        }

        nodes.push(ChainNodeView {
            name: node.resource_name.clone(),
            resource_type: node.resource.resource_type.clone(),
            paths: node.paths.clone(),
            selectors: node.selectors.clone(),
            links_to: node
                .links_to
                .iter()
                .map(|child| child.borrow().resource_name.clone())
                .collect(),
            linked_from: node
                .linked_from
                .iter()
                .filter_map(|parent| parent.upgrade())
                .map(|parent| parent.borrow().resource_name.clone())
                .collect(),
        });

        for child in &node.links_to {
            stack.push(child.clone());
        }
    }

    ForestView {
        roots: root_names,
        nodes,
    }
}

#[tracing::instrument(skip_all)]
async fn run_links(path: PathBuf, token: &CancellationToken) -> Result<(), String> {
    let blueprint = load_blueprint(&path).map_err(|err| err.to_string())?;
    let mut engine = Engine::new(blueprint, build_registry());
    let roots = engine.links(token).await.map_err(|err| err.to_string())?;

    let view = build_forest_view(&roots);
    let json = common::serde_json::to_string_pretty(&view).expect("forest view serializes");
    println!("{json}");
    Ok(())
}

#[tracing::instrument(skip_all)]
async fn run_warnings(path: PathBuf, token: &CancellationToken) -> Result<(), String> {
    let blueprint = load_blueprint(&path).map_err(|err| err.to_string())?;
    let mut engine = Engine::new(blueprint, build_registry());
    let warnings = engine.warnings(token).await.map_err(|err| err.to_string())?;

    for warning in &warnings {
        println!("{}: {}", warning.resource_name, warning.resource_type);
    }
    Ok(())
}
