use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Canonical node name type used throughout the crate.
pub type NodeName = String;

/// Static node configuration: constructor-argument name -> value.
pub type Config = BTreeMap<String, toml::Value>;

/// Result of one or more node invocations, keyed by producing node name.
///
/// A single invocation yields exactly one entry; executors merge these maps
/// before handing them to dependents.
pub type Outputs = BTreeMap<NodeName, Value>;

/// Opaque value flowing between nodes.
///
/// Cloning is cheap and preserves identity, so every dependent of a node sees
/// the very same object.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Name of the Rust type this value was created from.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// True if both handles point at the same underlying object.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.downcast_ref::<toml::Value>() {
            return write!(f, "Value({v})");
        }
        if let Some(v) = self.downcast_ref::<i64>() {
            return write!(f, "Value({v})");
        }
        if let Some(v) = self.downcast_ref::<String>() {
            return write!(f, "Value({v:?})");
        }
        write!(f, "Value(<{}>)", self.type_name)
    }
}
