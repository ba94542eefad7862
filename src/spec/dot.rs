// src/spec/dot.rs

//! Graphviz rendering of a validated spec.

use petgraph::dot::Dot;
use petgraph::graphmap::DiGraphMap;

use crate::spec::model::GraphSpec;

impl GraphSpec {
    /// Render the dependency graph in Graphviz DOT format.
    ///
    /// Every node appears, edges run producer -> consumer, and each edge is
    /// labelled with the `needs` parameters it feeds (comma-separated when a
    /// producer feeds several). Nothing is compiled or constructed.
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraphMap<&str, String> = DiGraphMap::new();
        for name in self.nodes().keys() {
            graph.add_node(name.as_str());
        }
        for (name, node) in self.nodes() {
            for (param, producer) in &node.inputs {
                match graph.edge_weight_mut(producer.as_str(), name.as_str()) {
                    Some(label) => {
                        label.push_str(", ");
                        label.push_str(param);
                    }
                    None => {
                        graph.add_edge(producer.as_str(), name.as_str(), param.clone());
                    }
                }
            }
        }
        format!("{}", Dot::new(&graph))
    }
}
