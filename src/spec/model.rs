// src/spec/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::{GraphError, Result};
use crate::storage::DEFAULT_ARTIFACT_ROOT;
use crate::types::{Config, NodeName};

/// Graph specification as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// artifact_root = "model"
/// max_workers = 4
///
/// [node.load]
/// uses = "Constant"
/// fn = "value"
/// config = { value = 5 }
/// persist = false
///
/// [node.double]
/// uses = "Doubler"
/// fn = "double"
/// needs = { x = "load" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawGraphSpec {
    /// Execution settings from `[config]`.
    #[serde(default)]
    pub config: SettingsSection,

    /// All nodes from `[node.<name>]`, keyed by node name.
    #[serde(default)]
    pub node: BTreeMap<NodeName, NodeSpec>,
}

impl RawGraphSpec {
    /// Add a node, rejecting a name that is already taken.
    pub fn add_node(&mut self, name: &str, spec: NodeSpec) -> Result<()> {
        if self.node.contains_key(name) {
            return Err(GraphError::DuplicateNode(name.to_string()));
        }
        self.node.insert(name.to_string(), spec);
        Ok(())
    }
}

/// A validated graph specification.
///
/// Only constructible through `TryFrom<RawGraphSpec>` (see
/// [`validate`](crate::spec::validate)), so holding one means names are valid,
/// every `needs` reference resolves, and the dependency graph is acyclic.
#[derive(Debug, Clone)]
pub struct GraphSpec {
    settings: SettingsSection,
    nodes: BTreeMap<NodeName, NodeSpec>,
}

impl GraphSpec {
    pub(crate) fn new_unchecked(
        settings: SettingsSection,
        nodes: BTreeMap<NodeName, NodeSpec>,
    ) -> Self {
        Self { settings, nodes }
    }

    pub fn settings(&self) -> &SettingsSection {
        &self.settings
    }

    pub fn nodes(&self) -> &BTreeMap<NodeName, NodeSpec> {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.get(name)
    }

    /// Node name -> distinct producing nodes.
    pub fn dependency_map(&self) -> BTreeMap<NodeName, Vec<NodeName>> {
        self.nodes
            .iter()
            .map(|(name, spec)| (name.clone(), spec.predecessors()))
            .collect()
    }

    /// Nodes no other node depends on.
    pub fn sinks(&self) -> Vec<NodeName> {
        self.nodes
            .keys()
            .filter(|name| {
                !self
                    .nodes
                    .values()
                    .any(|spec| spec.inputs.values().any(|producer| producer == *name))
            })
            .cloned()
            .collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsSection {
    /// Directory under which persisting nodes get their artifact scopes.
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,

    /// Upper bound on concurrently running nodes; 1 means sequential.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from(DEFAULT_ARTIFACT_ROOT)
}

fn default_max_workers() -> usize {
    1
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            artifact_root: default_artifact_root(),
            max_workers: default_max_workers(),
        }
    }
}

/// `[node.<name>]` section: one named step of the graph.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeSpec {
    /// Registered component type implementing this node.
    #[serde(rename = "uses")]
    pub component_type: String,

    /// Constructor arguments used for eager construction.
    #[serde(default)]
    pub config: Config,

    /// Method invoked on the component (or on its type, if class-level).
    #[serde(rename = "fn")]
    pub method: String,

    /// Method/constructor parameter name -> name of the producing node.
    #[serde(rename = "needs", default)]
    pub inputs: BTreeMap<String, NodeName>,

    /// Alternate constructor; the primary one when absent.
    #[serde(rename = "constructor_name", default)]
    pub constructor: Option<String>,

    /// Build the component at compile time (true) or at first invocation
    /// with the resolved inputs (false).
    #[serde(default = "default_true")]
    pub eager: bool,

    /// Give the node an artifact scope under the artifact root.
    #[serde(default = "default_true")]
    pub persist: bool,
}

fn default_true() -> bool {
    true
}

impl NodeSpec {
    /// A node using `component_type`'s `method`, with defaults elsewhere.
    pub fn new(component_type: &str, method: &str) -> Self {
        Self {
            component_type: component_type.to_string(),
            config: Config::new(),
            method: method.to_string(),
            inputs: BTreeMap::new(),
            constructor: None,
            eager: true,
            persist: true,
        }
    }

    /// Distinct producing nodes, in `needs` key order.
    pub fn predecessors(&self) -> Vec<NodeName> {
        let mut seen = Vec::new();
        for producer in self.inputs.values() {
            if !seen.contains(producer) {
                seen.push(producer.clone());
            }
        }
        seen
    }
}
