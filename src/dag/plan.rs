// src/dag/plan.rs

//! Dependency closure and evaluation order for a set of targets.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::dag::Graph;
use crate::errors::{GraphError, Result};
use crate::types::{NodeName, Outputs};

/// Nodes whose results the caller asked for, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Targets(Vec<NodeName>);

impl Targets {
    /// Build from any sequence of names; repeated names collapse.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeName>,
    {
        let mut unique: Vec<NodeName> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self(unique)
    }

    pub fn names(&self) -> &[NodeName] {
        &self.0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Targets {
    fn from(name: &str) -> Self {
        Self::new([name])
    }
}

impl From<String> for Targets {
    fn from(name: String) -> Self {
        Self::new([name])
    }
}

impl From<Vec<String>> for Targets {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<Vec<&str>> for Targets {
    fn from(names: Vec<&str>) -> Self {
        Self::new(names)
    }
}

impl From<&[&str]> for Targets {
    fn from(names: &[&str]) -> Self {
        Self::new(names.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Targets {
    fn from(names: [&str; N]) -> Self {
        Self::new(names)
    }
}

/// Read access to dependency edges, shared by compiled graphs and the bare
/// adjacency maps the compiler checks before building anything.
pub trait Dependencies {
    fn contains_node(&self, name: &str) -> bool;
    fn dependencies_of(&self, name: &str) -> &[NodeName];
}

impl Dependencies for Graph {
    fn contains_node(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn dependencies_of(&self, name: &str) -> &[NodeName] {
        Graph::dependencies_of(self, name)
    }
}

impl Dependencies for BTreeMap<NodeName, Vec<NodeName>> {
    fn contains_node(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn dependencies_of(&self, name: &str) -> &[NodeName] {
        self.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// The backward transitive closure of some targets, in an order where every
/// node comes after all of its dependencies.
///
/// The order is a depth-first post-order: targets are visited in request
/// order and dependencies in `needs` key order, so the same graph and targets
/// always produce the same plan.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    targets: Targets,
    order: Vec<NodeName>,
    members: BTreeSet<NodeName>,
}

impl ExecutionPlan {
    pub fn new<D: Dependencies + ?Sized>(graph: &D, targets: &Targets) -> Result<Self> {
        for target in targets.names() {
            if !graph.contains_node(target) {
                return Err(GraphError::UnknownTarget(target.clone()));
            }
        }

        let mut state: HashMap<NodeName, VisitState> = HashMap::new();
        let mut order = Vec::new();

        for target in targets.names() {
            if state.contains_key(target) {
                continue;
            }

            state.insert(target.clone(), VisitState::InProgress);
            let mut stack: Vec<(NodeName, usize)> = vec![(target.clone(), 0)];

            while let Some((node, next_dep)) = stack.last_mut() {
                let deps = graph.dependencies_of(node);

                if *next_dep < deps.len() {
                    let dep = deps[*next_dep].clone();
                    *next_dep += 1;

                    match state.get(&dep).copied() {
                        Some(VisitState::Done) => {}
                        Some(VisitState::InProgress) => {
                            return Err(GraphError::CyclicGraph(describe_cycle(&stack, &dep)));
                        }
                        None => {
                            if !graph.contains_node(&dep) {
                                return Err(GraphError::DanglingReference {
                                    node: node.clone(),
                                    reference: dep,
                                });
                            }
                            state.insert(dep.clone(), VisitState::InProgress);
                            stack.push((dep, 0));
                        }
                    }
                } else {
                    let finished = node.clone();
                    stack.pop();
                    state.insert(finished.clone(), VisitState::Done);
                    order.push(finished);
                }
            }
        }

        debug!(
            targets = ?targets.names(),
            closure = order.len(),
            "computed execution plan"
        );

        let members = order.iter().cloned().collect();
        Ok(Self {
            targets: targets.clone(),
            order,
            members,
        })
    }

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    /// Evaluation order; dependencies first.
    pub fn order(&self) -> &[NodeName] {
        &self.order
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Union of the targets' own results, ignoring every other node.
    pub fn select_outputs(&self, results: &HashMap<NodeName, Outputs>) -> Outputs {
        let mut selected = Outputs::new();
        for target in self.targets.names() {
            if let Some(outputs) = results.get(target) {
                selected.extend(outputs.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        selected
    }
}

/// Render the back-edge found at `dep` as `a -> b -> ... -> a`.
fn describe_cycle(stack: &[(NodeName, usize)], dep: &str) -> String {
    let start = stack.iter().position(|(n, _)| n == dep).unwrap_or(0);
    let mut path: Vec<&str> = stack[start..].iter().map(|(n, _)| n.as_str()).collect();
    path.push(dep);
    // Stack runs consumer -> producer; print in dependency direction.
    path.reverse();
    format!("cycle detected: {}", path.join(" -> "))
}
