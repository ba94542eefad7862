// src/dag/graph.rs

use std::collections::BTreeMap;

use crate::component::ComponentInvoker;
use crate::types::NodeName;

/// A node of the compiled graph: its invoker plus resolved adjacency.
#[derive(Debug)]
pub struct CompiledNode {
    invoker: ComponentInvoker,
    /// Direct dependencies: the distinct producers named in `needs`.
    deps: Vec<NodeName>,
    /// Direct dependents: nodes that name this one in their `needs`.
    dependents: Vec<NodeName>,
}

impl CompiledNode {
    pub fn invoker(&self) -> &ComponentInvoker {
        &self.invoker
    }

    pub fn dependencies(&self) -> &[NodeName] {
        &self.deps
    }

    pub fn dependents(&self) -> &[NodeName] {
        &self.dependents
    }
}

/// Executable task graph returned by the compiler.
///
/// Immutable once built; executors only read it. Component instances live
/// behind each invoker's own lock, so a `Graph` can be shared across worker
/// threads.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeName, CompiledNode>,
}

impl Graph {
    /// Assemble a graph from invokers and their dependency lists.
    ///
    /// Assumes every dependency names a node that is also being inserted.
    pub(crate) fn from_parts(parts: Vec<(ComponentInvoker, Vec<NodeName>)>) -> Self {
        let mut nodes: BTreeMap<NodeName, CompiledNode> = parts
            .into_iter()
            .map(|(invoker, deps)| {
                (
                    invoker.node_name().to_string(),
                    CompiledNode {
                        invoker,
                        deps,
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        let edges: Vec<(NodeName, NodeName)> = nodes
            .iter()
            .flat_map(|(name, node)| node.deps.iter().map(move |dep| (dep.clone(), name.clone())))
            .collect();

        for (dep, dependent) in edges {
            if let Some(dep_node) = nodes.get_mut(&dep) {
                dep_node.dependents.push(dependent);
            }
        }

        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&CompiledNode> {
        self.nodes.get(name)
    }

    /// Immediate dependencies of a node.
    pub fn dependencies_of(&self, name: &str) -> &[NodeName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a node.
    pub fn dependents_of(&self, name: &str) -> &[NodeName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Nodes nothing depends on.
    pub fn sinks(&self) -> Vec<NodeName> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.dependents.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }
}
