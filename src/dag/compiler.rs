// src/dag/compiler.rs

//! Node specifications -> executable [`Graph`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::component::{ComponentInvoker, ComponentRegistry};
use crate::dag::{ExecutionPlan, Graph, Targets};
use crate::errors::{GraphError, Result};
use crate::spec::{GraphSpec, NodeSpec};
use crate::storage::{validate_node_name, ArtifactRoot};
use crate::types::NodeName;

/// Compiles node specifications against a component registry.
///
/// Compilation either yields a complete graph or fails before any node has
/// been invoked. Eager components are constructed here, after every node has
/// validated, so a successful compile may already have written below the
/// artifact root.
#[derive(Debug, Clone)]
pub struct GraphCompiler<'a> {
    registry: &'a ComponentRegistry,
    artifacts: Arc<ArtifactRoot>,
}

impl<'a> GraphCompiler<'a> {
    pub fn new(registry: &'a ComponentRegistry, artifacts: Arc<ArtifactRoot>) -> Self {
        Self {
            registry,
            artifacts,
        }
    }

    /// Compile a validated [`GraphSpec`].
    pub fn compile_spec(&self, spec: &GraphSpec) -> Result<Graph> {
        self.compile(spec.nodes())
    }

    /// Compile a raw name -> spec mapping.
    ///
    /// Fails on invalid node names, unknown components, methods or
    /// constructors, required parameters missing from `needs`, dangling
    /// references and cycles.
    pub fn compile(&self, nodes: &BTreeMap<NodeName, NodeSpec>) -> Result<Graph> {
        let parts = self.prepare(nodes)?;

        // Only a fully valid graph gets its eager components built.
        self.artifacts.prepare()?;
        for (invoker, _) in &parts {
            invoker.construct_eagerly()?;
            debug!(
                node = %invoker.node_name(),
                callable = %invoker,
                eager = invoker.is_eager(),
                persist = invoker.persists(),
                "compiled node"
            );
        }

        let graph = Graph::from_parts(parts);
        info!(nodes = graph.len(), "graph compiled");
        Ok(graph)
    }

    /// Run every compile-time check without constructing anything or
    /// touching the artifact root.
    pub fn check(&self, nodes: &BTreeMap<NodeName, NodeSpec>) -> Result<()> {
        self.prepare(nodes).map(|_| ())
    }

    fn prepare(
        &self,
        nodes: &BTreeMap<NodeName, NodeSpec>,
    ) -> Result<Vec<(ComponentInvoker, Vec<NodeName>)>> {
        let mut deps: BTreeMap<NodeName, Vec<NodeName>> = BTreeMap::new();
        for (name, spec) in nodes.iter() {
            validate_node_name(name)?;
            for producer in spec.inputs.values() {
                if !nodes.contains_key(producer) {
                    return Err(GraphError::DanglingReference {
                        node: name.clone(),
                        reference: producer.clone(),
                    });
                }
            }
            deps.insert(name.clone(), spec.predecessors());
        }

        // The closure over every node is exactly what an execution of the
        // whole graph would compute; it fails on any cycle.
        ExecutionPlan::new(&deps, &Targets::new(nodes.keys().cloned()))?;

        let mut parts = Vec::with_capacity(nodes.len());
        for (name, spec) in nodes.iter() {
            let component = self.registry.get(&spec.component_type).ok_or_else(|| {
                GraphError::UnknownComponent {
                    node: name.clone(),
                    component: spec.component_type.clone(),
                }
            })?;
            let invoker = ComponentInvoker::validated(name, spec, component, &self.artifacts)?;
            let predecessors = deps.remove(name).unwrap_or_default();
            parts.push((invoker, predecessors));
        }

        Ok(parts)
    }
}
