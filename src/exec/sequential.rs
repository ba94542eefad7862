// src/exec/sequential.rs

use std::collections::HashMap;

use tracing::{info, warn};

use crate::dag::{ExecutionPlan, Graph, Targets};
use crate::errors::Result;
use crate::exec::invoke_node;
use crate::types::{NodeName, Outputs};

/// Evaluates a plan one node at a time, in plan order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialExecutor;

impl SequentialExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Compute `targets` and return exactly their outputs.
    pub fn run(&self, graph: &Graph, targets: &Targets) -> Result<Outputs> {
        let plan = ExecutionPlan::new(graph, targets)?;
        self.run_plan(graph, &plan)
    }

    pub fn run_plan(&self, graph: &Graph, plan: &ExecutionPlan) -> Result<Outputs> {
        info!(
            targets = ?plan.targets().names(),
            nodes = plan.len(),
            "sequential run started"
        );

        let mut results: HashMap<NodeName, Outputs> = HashMap::with_capacity(plan.len());

        for name in plan.order() {
            let inputs: Vec<&Outputs> = graph
                .dependencies_of(name)
                .iter()
                .filter_map(|dep| results.get(dep))
                .collect();

            let outputs = invoke_node(graph, name, &inputs).inspect_err(|e| {
                warn!(node = %name, error = %e, "node failed; aborting run");
            })?;
            results.insert(name.clone(), outputs);
        }

        info!(nodes = results.len(), "sequential run finished");
        Ok(plan.select_outputs(&results))
    }
}
