// src/spec/mod.rs

//! Node specifications.
//!
//! - [`model`] is the TOML-backed data model.
//! - [`loader`] reads specs from text or disk.
//! - [`validate`] turns a [`RawGraphSpec`] into a checked [`GraphSpec`].
//! - [`dot`] renders a [`GraphSpec`] for Graphviz.

pub mod dot;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{GraphSpec, NodeSpec, RawGraphSpec, SettingsSection};
