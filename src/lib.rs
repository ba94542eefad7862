// src/lib.rs

pub mod builtins;
pub mod cli;
pub mod component;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod spec;
pub mod storage;
pub mod types;

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::component::ComponentRegistry;
use crate::dag::{ExecutionPlan, GraphCompiler, Targets};
use crate::errors::Result;
use crate::exec::{ParallelExecutor, SequentialExecutor};
use crate::fs::RealFileSystem;
use crate::spec::{load_and_validate, GraphSpec};
use crate::storage::ArtifactRoot;
use crate::types::Outputs;

/// Compile `spec` against `registry` and compute `targets` one node at a
/// time.
///
/// Persisting nodes get their scopes under `[config].artifact_root`.
pub fn run(
    spec: &GraphSpec,
    registry: &ComponentRegistry,
    targets: impl Into<Targets>,
) -> Result<Outputs> {
    let graph = GraphCompiler::new(registry, artifact_root(spec)).compile_spec(spec)?;
    SequentialExecutor::new().run(&graph, &targets.into())
}

/// Like [`run`], but evaluates independent nodes concurrently, up to
/// `[config].max_workers` at a time.
pub async fn run_parallel(
    spec: &GraphSpec,
    registry: &ComponentRegistry,
    targets: impl Into<Targets>,
) -> Result<Outputs> {
    let graph = GraphCompiler::new(registry, artifact_root(spec)).compile_spec(spec)?;
    ParallelExecutor::new(spec.settings().max_workers)
        .run(Arc::new(graph), &targets.into())
        .await
}

/// The artifact root named by `[config]`.
///
/// Nothing is created yet: the compiler prepares the directory only once the
/// whole graph has validated.
fn artifact_root(spec: &GraphSpec) -> Arc<ArtifactRoot> {
    ArtifactRoot::at(&spec.settings().artifact_root, Arc::new(RealFileSystem))
}

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - spec loading and validation
/// - the built-in component registry
/// - compilation and execution (or a dry-run plan, or a DOT rendering)
pub async fn run_from_args(args: CliArgs) -> anyhow::Result<()> {
    let spec_path = PathBuf::from(&args.graph);
    let spec = load_and_validate(&spec_path)?;
    let registry = builtins::registry()?;

    let targets = if args.targets.is_empty() {
        Targets::new(spec.sinks())
    } else {
        Targets::new(args.targets.iter().cloned())
    };
    info!(targets = ?targets.names(), "targets selected");

    if args.dot {
        GraphCompiler::new(&registry, artifact_root(&spec)).check(spec.nodes())?;
        print!("{}", spec.to_dot());
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&spec, &registry, &targets)?;
        return Ok(());
    }

    let workers = args
        .workers
        .map(NonZeroUsize::get)
        .unwrap_or(spec.settings().max_workers);
    let graph = GraphCompiler::new(&registry, artifact_root(&spec)).compile_spec(&spec)?;

    let outputs = if workers > 1 {
        ParallelExecutor::new(workers)
            .run(Arc::new(graph), &targets)
            .await?
    } else {
        SequentialExecutor::new().run(&graph, &targets)?
    };

    for (name, value) in outputs.iter() {
        match builtins::to_toml(value) {
            Ok(v) => println!("{name} = {v}"),
            Err(_) => println!("{name} = <{}>", value.type_name()),
        }
    }
    Ok(())
}

/// Dry-run output: every check compilation would do, then the plan.
///
/// Nothing is constructed and the artifact root is left untouched.
fn print_dry_run(spec: &GraphSpec, registry: &ComponentRegistry, targets: &Targets) -> Result<()> {
    GraphCompiler::new(registry, artifact_root(spec)).check(spec.nodes())?;
    let plan = ExecutionPlan::new(&spec.dependency_map(), targets)?;

    println!("graphrun dry-run");
    println!("  config.artifact_root = {:?}", spec.settings().artifact_root);
    println!("  config.max_workers = {}", spec.settings().max_workers);
    println!();

    println!("plan ({} of {} nodes):", plan.len(), spec.nodes().len());
    for name in plan.order() {
        let Some(node) = spec.node(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      uses: {}.{}", node.component_type, node.method);
        if let Some(ref constructor) = node.constructor {
            println!("      constructor: {constructor}");
        }
        if !node.inputs.is_empty() {
            println!("      needs: {:?}", node.inputs);
        }
        if !node.eager {
            println!("      eager: false");
        }
        if !node.persist {
            println!("      persist: false");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
