// src/exec/mod.rs

//! Graph execution.
//!
//! Both executors honour the same contract:
//! - only the dependency closure of the requested targets is evaluated,
//! - every node in it is invoked exactly once per run,
//! - a node starts only after all of its dependencies finished,
//! - the first failure aborts the run and no partial results are returned,
//! - the result holds exactly the targets' outputs.
//!
//! - [`sequential`] walks the plan on the calling thread.
//! - [`parallel`] dispatches independent nodes to Tokio's blocking pool.

pub mod parallel;
pub mod sequential;

use std::time::Instant;

use anyhow::anyhow;
use tracing::debug;

use crate::dag::Graph;
use crate::errors::{GraphError, Result};
use crate::types::Outputs;

pub use parallel::ParallelExecutor;
pub use sequential::SequentialExecutor;

/// Invoke one node with its predecessors' outputs.
pub(crate) fn invoke_node(graph: &Graph, name: &str, inputs: &[&Outputs]) -> Result<Outputs> {
    let node = graph
        .node(name)
        .ok_or_else(|| GraphError::Other(anyhow!("planned node '{name}' is not in the graph")))?;

    debug!(node = %name, callable = %node.invoker(), "node started");
    let started = Instant::now();

    let outputs = node.invoker().invoke(inputs)?;

    debug!(
        node = %name,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "node finished"
    );
    Ok(outputs)
}
