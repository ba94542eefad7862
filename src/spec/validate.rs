// src/spec/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{GraphError, Result};
use crate::spec::model::{GraphSpec, RawGraphSpec};
use crate::storage::validate_node_name;

impl TryFrom<RawGraphSpec> for GraphSpec {
    type Error = crate::errors::GraphError;

    fn try_from(raw: RawGraphSpec) -> std::result::Result<Self, Self::Error> {
        validate_raw_spec(&raw)?;
        Ok(GraphSpec::new_unchecked(raw.config, raw.node))
    }
}

fn validate_raw_spec(spec: &RawGraphSpec) -> Result<()> {
    ensure_has_nodes(spec)?;
    validate_settings(spec)?;
    validate_node_names(spec)?;
    validate_references(spec)?;
    validate_acyclic(spec)?;
    Ok(())
}

fn ensure_has_nodes(spec: &RawGraphSpec) -> Result<()> {
    if spec.node.is_empty() {
        return Err(GraphError::ConfigError(
            "graph must contain at least one [node.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_settings(spec: &RawGraphSpec) -> Result<()> {
    if spec.config.max_workers == 0 {
        return Err(GraphError::ConfigError(
            "[config].max_workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_node_names(spec: &RawGraphSpec) -> Result<()> {
    for name in spec.node.keys() {
        validate_node_name(name)?;
    }
    Ok(())
}

fn validate_references(spec: &RawGraphSpec) -> Result<()> {
    for (name, node) in spec.node.iter() {
        for producer in node.inputs.values() {
            if producer == name {
                return Err(GraphError::CyclicGraph(format!(
                    "node '{}' cannot depend on itself in `needs`",
                    name
                )));
            }
            if !spec.node.contains_key(producer) {
                return Err(GraphError::DanglingReference {
                    node: name.clone(),
                    reference: producer.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_acyclic(spec: &RawGraphSpec) -> Result<()> {
    // Edge direction: producer -> consumer.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in spec.node.keys() {
        graph.add_node(name.as_str());
    }

    for (name, node) in spec.node.iter() {
        for producer in node.inputs.values() {
            graph.add_edge(producer.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(GraphError::CyclicGraph(format!(
            "cycle detected in node graph involving node '{}'",
            cycle.node_id()
        ))),
    }
}
