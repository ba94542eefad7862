// src/component/registry.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::component::ComponentType;
use crate::errors::{GraphError, Result};

/// Component types addressable from node specifications by name.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    types: BTreeMap<String, Arc<ComponentType>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type under its own name.
    pub fn register(&mut self, component: ComponentType) -> Result<()> {
        let name = component.name().to_string();
        if self.types.contains_key(&name) {
            return Err(GraphError::ConfigError(format!(
                "component '{name}' is already registered"
            )));
        }
        self.types.insert(name, Arc::new(component));
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, component: ComponentType) -> Result<Self> {
        self.register(component)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<Arc<ComponentType>> {
        self.types.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}
