// src/component/invoker.rs

//! One graph node bound to its component.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tracing::{debug, trace};

use crate::component::{Args, Component, ComponentType, Constructor, Method, MethodKind, Params};
use crate::errors::{GraphError, Result};
use crate::spec::NodeSpec;
use crate::storage::ArtifactRoot;
use crate::types::{Config, NodeName, Outputs, Value};

/// The unit of work for one node.
///
/// Holds everything needed to build the node's component and call its
/// method: the component type, static config, the method, and the mapping
/// from method parameter to producing node. Validation happens in
/// [`ComponentInvoker::new`], so a successfully built invoker can only fail
/// at run time because the component itself fails.
pub struct ComponentInvoker {
    node: NodeName,
    component: Arc<ComponentType>,
    config: Config,
    method_name: String,
    method: Method,
    inputs: BTreeMap<String, NodeName>,
    /// `None` only for class-level methods.
    constructor: Option<Constructor>,
    eager: bool,
    /// Present iff the node persists.
    artifacts: Option<Arc<ArtifactRoot>>,
    instance: Mutex<Option<Box<dyn Component>>>,
}

impl ComponentInvoker {
    /// Validate `spec` against `component` and, for eager nodes, build the
    /// component right away.
    pub fn new(
        node: &str,
        spec: &NodeSpec,
        component: Arc<ComponentType>,
        artifacts: &Arc<ArtifactRoot>,
    ) -> Result<Self> {
        let invoker = Self::validated(node, spec, component, artifacts)?;
        invoker.construct_eagerly()?;
        Ok(invoker)
    }

    /// Validation half of [`new`](Self::new): nothing is constructed.
    pub(crate) fn validated(
        node: &str,
        spec: &NodeSpec,
        component: Arc<ComponentType>,
        artifacts: &Arc<ArtifactRoot>,
    ) -> Result<Self> {
        let method = component
            .method_named(&spec.method)
            .cloned()
            .ok_or_else(|| GraphError::UnknownMethod {
                node: node.to_string(),
                component: component.name().to_string(),
                method: spec.method.clone(),
            })?;

        let method_callable = format!("{}.{}", component.name(), spec.method);
        require_inputs(node, &method.params, &spec.inputs, &method_callable)?;

        // Class-level methods never build an instance, but a named constructor
        // must still refer to something real.
        let selector = spec.constructor.as_deref();
        let constructor = if method.is_class_level() && selector.is_none() {
            None
        } else {
            let ctor = component.constructor_for(selector).cloned().ok_or_else(|| {
                GraphError::UnknownConstructor {
                    node: node.to_string(),
                    component: component.name().to_string(),
                    constructor: selector.unwrap_or("<primary>").to_string(),
                }
            })?;
            (!method.is_class_level()).then_some(ctor)
        };

        if let Some(ctor) = &constructor {
            let ctor_callable = constructor_label(&component, spec.constructor.as_deref());
            if spec.eager {
                if let Some(param) = ctor.params.first_missing(|p| spec.config.contains_key(p)) {
                    return Err(GraphError::MissingConfig {
                        node: node.to_string(),
                        param: param.to_string(),
                        callable: ctor_callable,
                    });
                }
            } else {
                require_inputs(node, &ctor.params, &spec.inputs, &ctor_callable)?;
            }
        }

        Ok(Self {
            node: node.to_string(),
            component,
            config: spec.config.clone(),
            method_name: spec.method.clone(),
            method,
            inputs: spec.inputs.clone(),
            constructor,
            eager: spec.eager,
            artifacts: spec.persist.then(|| Arc::clone(artifacts)),
            instance: Mutex::new(None),
        })
    }

    /// Build the instance of an eager node from its config. No-op for lazy
    /// nodes and class-level methods.
    pub(crate) fn construct_eagerly(&self) -> Result<()> {
        if let (true, Some(ctor)) = (self.eager, &self.constructor) {
            let config = ctor.params.filter(&self.config, &self.node);
            let instance = self.construct(ctor, config, BTreeMap::new())?;
            *self.lock_instance() = Some(instance);
        }
        Ok(())
    }

    pub fn node_name(&self) -> &str {
        &self.node
    }

    pub fn component_name(&self) -> &str {
        self.component.name()
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Method parameter -> producing node.
    pub fn inputs(&self) -> &BTreeMap<String, NodeName> {
        &self.inputs
    }

    pub fn is_eager(&self) -> bool {
        self.eager
    }

    pub fn persists(&self) -> bool {
        self.artifacts.is_some()
    }

    /// Whether a component instance currently exists.
    pub fn is_constructed(&self) -> bool {
        self.lock_instance().is_some()
    }

    /// Run the node.
    ///
    /// `predecessors` are the outputs of the node's direct dependencies; they
    /// are merged into one map and then split into the method's named inputs.
    pub fn invoke(&self, predecessors: &[&Outputs]) -> Result<Outputs> {
        let mut received: BTreeMap<&str, &Value> = BTreeMap::new();
        for outputs in predecessors {
            for (name, value) in outputs.iter() {
                received.insert(name.as_str(), value);
            }
        }

        let mut resolved = BTreeMap::new();
        for (param, producer) in &self.inputs {
            let value = received
                .get(producer.as_str())
                .ok_or_else(|| GraphError::UnresolvedInput {
                    node: self.node.clone(),
                    param: param.clone(),
                    producer: producer.clone(),
                })?;
            resolved.insert(param.clone(), (*value).clone());
        }

        let run_args = Args::from_inputs(self.method.params.filter(&resolved, &self.node));
        trace!(node = %self.node, callable = %self, "invoking");

        let value = match &self.method.kind {
            MethodKind::Class(call) => call(run_args).map_err(|e| self.failure(e))?,
            MethodKind::Instance => {
                let mut slot = self.lock_instance();

                if !self.eager {
                    let ctor = self.constructor.as_ref().ok_or_else(|| self.unconstructable())?;
                    let ctor_inputs = ctor.params.filter(&resolved, &self.node);
                    *slot = Some(self.construct(ctor, Config::new(), ctor_inputs)?);
                }

                let instance = slot.as_mut().ok_or_else(|| self.unconstructable())?;
                instance
                    .call(&self.method_name, run_args)
                    .map_err(|e| self.failure(e))?
            }
        };

        Ok(Outputs::from([(self.node.clone(), value)]))
    }

    fn construct(
        &self,
        ctor: &Constructor,
        config: Config,
        inputs: BTreeMap<String, Value>,
    ) -> Result<Box<dyn Component>> {
        let storage = match &self.artifacts {
            Some(root) if ctor.params.accepts_storage() => Some(root.allocate(&self.node)?),
            _ => None,
        };

        debug!(
            node = %self.node,
            component = %self.component.name(),
            eager = self.eager,
            persist = storage.is_some(),
            "constructing component"
        );

        (ctor.build)(Args::new(config, inputs, storage)).map_err(|e| self.failure(e))
    }

    fn lock_instance(&self) -> std::sync::MutexGuard<'_, Option<Box<dyn Component>>> {
        self.instance.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn failure(&self, source: anyhow::Error) -> GraphError {
        GraphError::Invocation {
            node: self.node.clone(),
            source,
        }
    }

    fn unconstructable(&self) -> GraphError {
        self.failure(anyhow!("component {} has no instance", self.component.name()))
    }
}

fn require_inputs(
    node: &str,
    params: &Params,
    inputs: &BTreeMap<String, NodeName>,
    callable: &str,
) -> Result<()> {
    match params.first_missing(|p| inputs.contains_key(p)) {
        Some(param) => Err(GraphError::MissingInput {
            node: node.to_string(),
            param: param.to_string(),
            callable: callable.to_string(),
        }),
        None => Ok(()),
    }
}

fn constructor_label(component: &ComponentType, selector: Option<&str>) -> String {
    match selector {
        Some(name) => format!("{}::{}", component.name(), name),
        None => format!("{}::new", component.name()),
    }
}

impl PartialEq for ComponentInvoker {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
            && self.component.name() == other.component.name()
            && self.config == other.config
            && self.method_name == other.method_name
    }
}

impl fmt::Display for ComponentInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component.name(), self.method_name)
    }
}

impl fmt::Debug for ComponentInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInvoker")
            .field("node", &self.node)
            .field("component", &self.component.name())
            .field("method", &self.method_name)
            .field("inputs", &self.inputs)
            .field("eager", &self.eager)
            .field("persist", &self.persists())
            .finish_non_exhaustive()
    }
}
