// src/component/params.rs

//! Static parameter descriptors.
//!
//! Every constructor and method registered for a component declares which
//! parameter names it requires and which it merely accepts. The invoker checks
//! node `needs` against these descriptors at compile time and filters the
//! resolved inputs down to accepted names at call time.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

/// Name of the reserved parameter through which a persisting node receives
/// its [`ArtifactDir`](crate::storage::ArtifactDir).
pub const STORAGE_PARAM: &str = "persistor";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    required: BTreeSet<String>,
    optional: BTreeSet<String>,
    variadic: bool,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str) -> Self {
        self.optional.remove(name);
        self.required.insert(name.to_string());
        self
    }

    pub fn optional(mut self, name: &str) -> Self {
        if !self.required.contains(name) {
            self.optional.insert(name.to_string());
        }
        self
    }

    /// Accept any parameter name in addition to the declared ones.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Accept the node's storage handle.
    pub fn storage(self) -> Self {
        self.optional(STORAGE_PARAM)
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.variadic || self.required.contains(name) || self.optional.contains(name)
    }

    pub fn accepts_storage(&self) -> bool {
        self.required.contains(STORAGE_PARAM) || self.optional.contains(STORAGE_PARAM)
    }

    /// Required parameters that the caller must supply.
    ///
    /// The storage parameter is injected by the invoker, never supplied.
    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.required
            .iter()
            .map(String::as_str)
            .filter(|name| *name != STORAGE_PARAM)
    }

    /// First required parameter not present in `available`, if any.
    pub fn first_missing<'a, F>(&'a self, mut available: F) -> Option<&'a str>
    where
        F: FnMut(&str) -> bool,
    {
        self.required_names().find(|name| !available(name))
    }

    /// Keep only the entries whose key this descriptor accepts.
    pub fn filter<V: Clone>(&self, values: &BTreeMap<String, V>, context: &str) -> BTreeMap<String, V> {
        let mut kept = BTreeMap::new();
        for (name, value) in values {
            if name == STORAGE_PARAM {
                continue;
            }
            if self.accepts(name) {
                kept.insert(name.clone(), value.clone());
            } else {
                debug!(param = %name, %context, "dropping argument not accepted by callable");
            }
        }
        kept
    }
}
