// src/builtins.rs

//! Generic components available to every spec run by the `graphrun` binary.
//!
//! They work on TOML values, which is what node `config` is made of, so a
//! graph built from them can be described entirely in a spec file.

use anyhow::{anyhow, bail, Context};

use crate::component::{Args, Component, ComponentRegistry, ComponentType, Params};
use crate::errors::Result;
use crate::storage::ArtifactDir;
use crate::types::Value;

/// File a `WriteToml` node persists its input to.
pub const OUTPUT_FILE: &str = "output.toml";

/// Registry with every built-in component.
pub fn registry() -> Result<ComponentRegistry> {
    ComponentRegistry::new()
        .with(constant())?
        .with(collect())?
        .with(write_toml())?
        .with(read_toml())
}

/// `Constant`: returns its `value` config entry.
pub fn constant() -> ComponentType {
    ComponentType::new("Constant")
        .constructor(Params::new().required("value"), |args| {
            let value: toml::Value = args.config_value("value")?;
            Ok(Box::new(Constant { value }))
        })
        .method("value", Params::new())
}

/// `Collect`: gathers all of its inputs into one TOML table.
pub fn collect() -> ComponentType {
    ComponentType::new("Collect").class_method("collect", Params::new().variadic(), |args| {
        let mut table = toml::Table::new();
        for (name, value) in args.inputs() {
            table.insert(name.clone(), to_toml(value).with_context(|| format!("input '{name}'"))?);
        }
        Ok(Value::new(toml::Value::Table(table)))
    })
}

/// `WriteToml`: persists its `data` input and reports its resource name.
pub fn write_toml() -> ComponentType {
    ComponentType::new("WriteToml")
        .constructor(Params::new().storage(), |mut args| {
            let storage = args.take_storage()?;
            Ok(Box::new(WriteToml { storage }))
        })
        .method("write", Params::new().required("data"))
}

/// `ReadToml`: loads what a `WriteToml` node persisted, located through the
/// resource name that node returned.
pub fn read_toml() -> ComponentType {
    ComponentType::new("ReadToml")
        .named_constructor(
            "load",
            Params::new().required("resource_name").storage(),
            |mut args| {
                let resource_name = args.get::<String>("resource_name")?.clone();
                let storage = args.take_storage()?;
                let path = storage.resource_path(&resource_name, OUTPUT_FILE);
                let contents = storage.fs().read_to_string(&path)?;
                let mut doc: toml::Table = toml::from_str(&contents)
                    .with_context(|| format!("parsing {:?}", path))?;
                let value = doc
                    .remove("data")
                    .ok_or_else(|| anyhow!("{:?} has no `data` entry", path))?;
                Ok(Box::new(ReadToml { value }))
            },
        )
        .method("read", Params::new())
}

struct Constant {
    value: toml::Value,
}

impl Component for Constant {
    fn call(&mut self, method: &str, _args: Args) -> anyhow::Result<Value> {
        match method {
            "value" => Ok(Value::new(self.value.clone())),
            other => bail!("Constant has no method '{other}'"),
        }
    }
}

struct WriteToml {
    storage: ArtifactDir,
}

impl Component for WriteToml {
    fn call(&mut self, method: &str, args: Args) -> anyhow::Result<Value> {
        if method != "write" {
            bail!("WriteToml has no method '{method}'");
        }

        let data = args
            .input("data")
            .ok_or_else(|| anyhow!("missing input 'data'"))?;

        // TOML documents must be tables, so wrap the value.
        let mut doc = toml::Table::new();
        doc.insert("data".to_string(), to_toml(data)?);
        let contents = toml::to_string(&doc).context("serializing output")?;

        let path = self.storage.file_for(OUTPUT_FILE)?;
        self.storage.fs().write(&path, contents.as_bytes())?;

        Ok(Value::new(self.storage.resource_name().to_string()))
    }
}

struct ReadToml {
    value: toml::Value,
}

impl Component for ReadToml {
    fn call(&mut self, method: &str, _args: Args) -> anyhow::Result<Value> {
        match method {
            "read" => Ok(Value::new(self.value.clone())),
            other => bail!("ReadToml has no method '{other}'"),
        }
    }
}

/// Convert a value produced by another node into TOML.
pub fn to_toml(value: &Value) -> anyhow::Result<toml::Value> {
    if let Some(v) = value.downcast_ref::<toml::Value>() {
        return Ok(v.clone());
    }
    if let Some(v) = value.downcast_ref::<i64>() {
        return Ok(toml::Value::Integer(*v));
    }
    if let Some(v) = value.downcast_ref::<f64>() {
        return Ok(toml::Value::Float(*v));
    }
    if let Some(v) = value.downcast_ref::<bool>() {
        return Ok(toml::Value::Boolean(*v));
    }
    if let Some(v) = value.downcast_ref::<String>() {
        return Ok(toml::Value::String(v.clone()));
    }
    Err(anyhow!("value of type {} has no TOML form", value.type_name()))
}
