#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use graphrun::errors::Result;
use graphrun::spec::{GraphSpec, NodeSpec, RawGraphSpec};
use graphrun::types::NodeName;

/// Builder for `GraphSpec` to simplify test setup.
pub struct GraphSpecBuilder {
    spec: RawGraphSpec,
}

impl GraphSpecBuilder {
    pub fn new() -> Self {
        Self {
            spec: RawGraphSpec::default(),
        }
    }

    pub fn artifact_root(mut self, path: impl AsRef<Path>) -> Self {
        self.spec.config.artifact_root = path.as_ref().to_path_buf();
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.spec.config.max_workers = n;
        self
    }

    /// Add a node; panics on a duplicate name.
    pub fn with_node(mut self, name: &str, node: NodeSpec) -> Self {
        self.spec
            .add_node(name, node)
            .expect("duplicate node in builder");
        self
    }

    /// Add a node, surfacing the duplicate-name error.
    pub fn try_with_node(mut self, name: &str, node: NodeSpec) -> Result<Self> {
        self.spec.add_node(name, node)?;
        Ok(self)
    }

    /// The unvalidated name -> spec map, for feeding the compiler directly.
    pub fn nodes(&self) -> BTreeMap<NodeName, NodeSpec> {
        self.spec.node.clone()
    }

    pub fn raw(self) -> RawGraphSpec {
        self.spec
    }

    pub fn try_build(self) -> Result<GraphSpec> {
        GraphSpec::try_from(self.spec)
    }

    pub fn build(self) -> GraphSpec {
        self.try_build()
            .expect("Failed to build valid graph spec from builder")
    }
}

impl Default for GraphSpecBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `NodeSpec`.
pub struct NodeSpecBuilder {
    node: NodeSpec,
}

impl NodeSpecBuilder {
    pub fn new(uses: &str, method: &str) -> Self {
        Self {
            node: NodeSpec::new(uses, method),
        }
    }

    pub fn config(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.node.config.insert(key.to_string(), value.into());
        self
    }

    /// Feed parameter `param` from node `producer`.
    pub fn needs(mut self, param: &str, producer: &str) -> Self {
        self.node
            .inputs
            .insert(param.to_string(), producer.to_string());
        self
    }

    pub fn constructor(mut self, name: &str) -> Self {
        self.node.constructor = Some(name.to_string());
        self
    }

    pub fn eager(mut self, val: bool) -> Self {
        self.node.eager = val;
        self
    }

    pub fn persist(mut self, val: bool) -> Self {
        self.node.persist = val;
        self
    }

    pub fn build(self) -> NodeSpec {
        self.node
    }
}
