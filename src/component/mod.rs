// src/component/mod.rs

//! The component contract.
//!
//! A component is an opaque unit of computation. The core only knows how to:
//! - build it, through a primary or named constructor,
//! - call one of its methods by name,
//! - check, ahead of time, which parameters those callables need.
//!
//! - [`params`] holds the static parameter descriptors.
//! - [`registry`] maps component names (`uses = "..."`) to their types.
//! - [`invoker`] wraps one graph node around a component.

pub mod invoker;
pub mod params;
pub mod registry;

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;

use crate::storage::ArtifactDir;
use crate::types::{Config, Value};

pub use invoker::ComponentInvoker;
pub use params::{Params, STORAGE_PARAM};
pub use registry::ComponentRegistry;

/// A constructed, stateful component.
pub trait Component: Send {
    /// Invoke the instance method `method`.
    fn call(&mut self, method: &str, args: Args) -> anyhow::Result<Value>;
}

pub type ConstructorFn = Arc<dyn Fn(Args) -> anyhow::Result<Box<dyn Component>> + Send + Sync>;
pub type ClassMethodFn = Arc<dyn Fn(Args) -> anyhow::Result<Value> + Send + Sync>;

/// Arguments handed to a constructor or method.
///
/// Eager constructors see the node's `config`. Lazy constructors and methods
/// see the resolved inputs. Either way, only names the callable accepts are
/// present.
#[derive(Debug, Default)]
pub struct Args {
    config: Config,
    inputs: BTreeMap<String, Value>,
    storage: Option<ArtifactDir>,
}

impl Args {
    pub fn new(config: Config, inputs: BTreeMap<String, Value>, storage: Option<ArtifactDir>) -> Self {
        Self {
            config,
            inputs,
            storage,
        }
    }

    pub fn from_inputs(inputs: BTreeMap<String, Value>) -> Self {
        Self {
            inputs,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn inputs(&self) -> &BTreeMap<String, Value> {
        &self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// Typed access to an input produced by an upstream node.
    pub fn get<T: Any>(&self, name: &str) -> anyhow::Result<&T> {
        let value = self
            .inputs
            .get(name)
            .ok_or_else(|| anyhow!("missing input '{name}'"))?;
        value.downcast_ref::<T>().ok_or_else(|| {
            anyhow!(
                "input '{name}' has type {}, expected {}",
                value.type_name(),
                std::any::type_name::<T>()
            )
        })
    }

    /// Deserialize a config entry into `T`.
    pub fn config_value<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<T> {
        let raw = self
            .config
            .get(name)
            .ok_or_else(|| anyhow!("missing config '{name}'"))?;
        raw.clone()
            .try_into()
            .with_context(|| format!("config '{name}' has an unexpected shape"))
    }

    /// Take the storage handle, failing if the node does not persist.
    pub fn take_storage(&mut self) -> anyhow::Result<ArtifactDir> {
        self.storage
            .take()
            .ok_or_else(|| anyhow!("no '{STORAGE_PARAM}' available (node has persist = false)"))
    }
}

/// How a component is built.
#[derive(Clone)]
pub struct Constructor {
    pub params: Params,
    pub build: ConstructorFn,
}

/// How a method is invoked.
#[derive(Clone)]
pub enum MethodKind {
    /// Called on a constructed instance via [`Component::call`].
    Instance,
    /// Called on the type itself; no instance is ever built.
    Class(ClassMethodFn),
}

#[derive(Clone)]
pub struct Method {
    pub params: Params,
    pub kind: MethodKind,
}

impl Method {
    pub fn is_class_level(&self) -> bool {
        matches!(self.kind, MethodKind::Class(_))
    }
}

/// A registered component kind.
#[derive(Clone)]
pub struct ComponentType {
    name: String,
    constructor: Option<Constructor>,
    named_constructors: BTreeMap<String, Constructor>,
    methods: BTreeMap<String, Method>,
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.name)
            .field("constructors", &self.named_constructors.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ComponentType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            constructor: None,
            named_constructors: BTreeMap::new(),
            methods: BTreeMap::new(),
        }
    }

    /// Register the primary constructor.
    pub fn constructor<F>(mut self, params: Params, build: F) -> Self
    where
        F: Fn(Args) -> anyhow::Result<Box<dyn Component>> + Send + Sync + 'static,
    {
        self.constructor = Some(Constructor {
            params,
            build: Arc::new(build),
        });
        self
    }

    /// Register an alternate constructor selected with `constructor_name`.
    pub fn named_constructor<F>(mut self, name: &str, params: Params, build: F) -> Self
    where
        F: Fn(Args) -> anyhow::Result<Box<dyn Component>> + Send + Sync + 'static,
    {
        self.named_constructors.insert(
            name.to_string(),
            Constructor {
                params,
                build: Arc::new(build),
            },
        );
        self
    }

    /// Register an instance method.
    pub fn method(mut self, name: &str, params: Params) -> Self {
        self.methods.insert(
            name.to_string(),
            Method {
                params,
                kind: MethodKind::Instance,
            },
        );
        self
    }

    /// Register a class-level method.
    pub fn class_method<F>(mut self, name: &str, params: Params, call: F) -> Self
    where
        F: Fn(Args) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.methods.insert(
            name.to_string(),
            Method {
                params,
                kind: MethodKind::Class(Arc::new(call)),
            },
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The primary constructor for `None`, a named one otherwise.
    pub fn constructor_for(&self, name: Option<&str>) -> Option<&Constructor> {
        match name {
            None => self.constructor.as_ref(),
            Some(n) => self.named_constructors.get(n),
        }
    }

    pub fn method_named(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }
}
