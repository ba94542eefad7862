// src/exec/parallel.rs

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::dag::{ExecutionPlan, Graph, Targets};
use crate::errors::{GraphError, Result};
use crate::exec::invoke_node;
use crate::types::{NodeName, Outputs};

/// Per-run state of a planned node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    /// Waiting for dependencies.
    Pending,
    /// Handed to a worker.
    Running,
    /// Finished; its outputs are in the result map.
    Done,
}

/// Evaluates independent nodes concurrently on Tokio's blocking pool.
///
/// A single coordinator owns the run state and the result map: workers only
/// receive clones of their inputs and hand their outputs back, so every
/// result is written exactly once and never mutated afterwards.
#[derive(Debug, Clone, Copy)]
pub struct ParallelExecutor {
    max_workers: usize,
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(
            std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1),
        )
    }
}

impl ParallelExecutor {
    /// `max_workers` is clamped to at least 1.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Compute `targets` and return exactly their outputs.
    pub async fn run(&self, graph: Arc<Graph>, targets: &Targets) -> Result<Outputs> {
        let plan = ExecutionPlan::new(graph.as_ref(), targets)?;
        self.run_plan(graph, &plan).await
    }

    pub async fn run_plan(&self, graph: Arc<Graph>, plan: &ExecutionPlan) -> Result<Outputs> {
        info!(
            targets = ?plan.targets().names(),
            nodes = plan.len(),
            max_workers = self.max_workers,
            "parallel run started"
        );

        let mut states: HashMap<NodeName, RunState> = plan
            .order()
            .iter()
            .map(|name| (name.clone(), RunState::Pending))
            .collect();
        let mut results: HashMap<NodeName, Outputs> = HashMap::with_capacity(plan.len());
        let mut workers: JoinSet<(NodeName, Result<Outputs>)> = JoinSet::new();

        loop {
            self.dispatch_ready(&graph, plan, &mut states, &results, &mut workers);

            let Some(joined) = workers.join_next().await else {
                break;
            };

            let failure = match joined {
                Ok((name, Ok(outputs))) => {
                    debug!(node = %name, "marking Done");
                    states.insert(name.clone(), RunState::Done);
                    results.insert(name, outputs);
                    continue;
                }
                Ok((name, Err(e))) => {
                    warn!(node = %name, error = %e, "node failed; aborting run");
                    e
                }
                Err(join_err) => GraphError::Other(anyhow!("worker task failed: {join_err}")),
            };

            // Nothing new is dispatched; let in-flight nodes finish so no
            // invocation outlives the run.
            while workers.join_next().await.is_some() {}
            return Err(failure);
        }

        let unfinished: Vec<&NodeName> = states
            .iter()
            .filter(|(_, state)| **state != RunState::Done)
            .map(|(name, _)| name)
            .collect();
        if !unfinished.is_empty() {
            return Err(GraphError::Other(anyhow!(
                "run stalled with unfinished nodes: {unfinished:?}"
            )));
        }

        info!(nodes = results.len(), "parallel run finished");
        Ok(plan.select_outputs(&results))
    }

    /// Start every pending node whose dependencies are done, in plan order,
    /// without exceeding `max_workers`.
    fn dispatch_ready(
        &self,
        graph: &Arc<Graph>,
        plan: &ExecutionPlan,
        states: &mut HashMap<NodeName, RunState>,
        results: &HashMap<NodeName, Outputs>,
        workers: &mut JoinSet<(NodeName, Result<Outputs>)>,
    ) {
        for name in plan.order() {
            if workers.len() >= self.max_workers {
                break;
            }
            if states.get(name) != Some(&RunState::Pending) {
                continue;
            }

            let deps = graph.dependencies_of(name);
            if !deps
                .iter()
                .all(|dep| states.get(dep) == Some(&RunState::Done))
            {
                continue;
            }

            let inputs: Vec<Outputs> = deps
                .iter()
                .filter_map(|dep| results.get(dep).cloned())
                .collect();

            debug!(node = %name, "dependencies satisfied; marking Running");
            states.insert(name.clone(), RunState::Running);

            let graph = Arc::clone(graph);
            let node = name.clone();
            workers.spawn_blocking(move || {
                let refs: Vec<&Outputs> = inputs.iter().collect();
                let outputs = invoke_node(&graph, &node, &refs);
                (node, outputs)
            });
        }
    }
}
