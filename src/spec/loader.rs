// src/spec/loader.rs

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::errors::{GraphError, Result};
use crate::spec::model::{GraphSpec, RawGraphSpec};

/// Parse a graph specification from TOML text, without validation.
///
/// A `[node.<name>]` table declared twice is reported as
/// [`GraphError::DuplicateNode`] rather than as a plain TOML error.
pub fn load_from_str(contents: &str) -> Result<RawGraphSpec> {
    toml::from_str(contents).map_err(|err| match duplicate_node(contents) {
        Some(name) => GraphError::DuplicateNode(name),
        None => GraphError::TomlError(err),
    })
}

/// First node name whose `[node.<name>]` header occurs more than once.
fn duplicate_node(contents: &str) -> Option<String> {
    let mut seen = BTreeSet::new();
    contents
        .lines()
        .filter_map(node_header)
        .find(|name| !seen.insert(name.clone()))
}

/// `[node.<name>]` -> `<name>`; sub-tables such as `[node.a.config]` and
/// every other line yield `None`.
fn node_header(line: &str) -> Option<String> {
    let inner = line.trim_start().strip_prefix('[')?;
    let (header, _) = inner.split_once(']')?;
    let name = header
        .trim()
        .strip_prefix("node")?
        .trim_start()
        .strip_prefix('.')?
        .trim();
    let name = name
        .strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .or_else(|| name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')))
        .unwrap_or(name);
    if name.is_empty() || name.contains('.') {
        return None;
    }
    Some(name.to_string())
}

/// Read a graph specification file, without validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawGraphSpec> {
    let contents = fs::read_to_string(path.as_ref())?;
    load_from_str(&contents)
}

/// Read and validate a graph specification file.
///
/// This is the entry point the binary uses: it checks node names, dangling
/// `needs` references, cycles and `[config]` sanity. Component-level checks
/// (unknown components, missing parameters) happen when the spec is compiled
/// against a registry.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<GraphSpec> {
    let raw = load_from_path(path)?;
    GraphSpec::try_from(raw)
}
