// src/dag/mod.rs

//! Compiled dependency graphs and execution planning.
//!
//! - [`compiler`] turns node specs into a [`Graph`] of ready invokers.
//! - [`graph`] holds the compiled nodes with their dependency edges.
//! - [`plan`] computes the dependency closure of a set of targets and a
//!   valid evaluation order for it.

pub mod compiler;
pub mod graph;
pub mod plan;

pub use compiler::GraphCompiler;
pub use graph::{CompiledNode, Graph};
pub use plan::{Dependencies, ExecutionPlan, Targets};
