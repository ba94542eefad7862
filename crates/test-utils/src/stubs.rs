#![allow(dead_code)]

//! Stub components that record what the engine does with them.
//!
//! Every constructor records `new <Type>` and every method call records
//! `<Type>.<method>` (or `run <tag>` for [`tagged`]) in a shared [`CallLog`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail};
use graphrun::component::{Args, Component, ComponentRegistry, ComponentType, Params};
use graphrun::storage::ArtifactDir;
use graphrun::types::Value;

/// Shared, ordered record of constructions and calls.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| *e == entry)
            .count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().unwrap().iter().position(|e| e == entry)
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Call log plus a concurrency gauge for [`tagged`] nodes.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    pub log: CallLog,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest number of `tagged` calls observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Registry holding every stub, all reporting to `probe`.
pub fn stub_registry(probe: &Probe) -> ComponentRegistry {
    ComponentRegistry::new()
        .with(load(probe))
        .and_then(|r| r.with(double(probe)))
        .and_then(|r| r.with(add_ten(probe)))
        .and_then(|r| r.with(add(probe)))
        .and_then(|r| r.with(scale(probe)))
        .and_then(|r| r.with(tagged(probe)))
        .and_then(|r| r.with(sum(probe)))
        .and_then(|r| r.with(make_list(probe)))
        .and_then(|r| r.with(echo(probe)))
        .and_then(|r| r.with(saver(probe)))
        .and_then(|r| r.with(fail(probe)))
        .and_then(|r| r.with(brittle(probe)))
        .expect("stub names are unique")
}

fn int(args: &Args, name: &str) -> anyhow::Result<i64> {
    args.get::<i64>(name).copied()
}

/// `Load(value).load() -> value`
pub fn load(probe: &Probe) -> ComponentType {
    let log = probe.log.clone();
    ComponentType::new("Load")
        .constructor(Params::new().required("value"), move |args| {
            log.record("new Load");
            let value: i64 = args.config_value("value")?;
            Ok(Box::new(Fixed {
                log: log.clone(),
                label: "Load.load",
                value,
            }))
        })
        .method("load", Params::new())
}

struct Fixed {
    log: CallLog,
    label: &'static str,
    value: i64,
}

impl Component for Fixed {
    fn call(&mut self, _method: &str, _args: Args) -> anyhow::Result<Value> {
        self.log.record(self.label);
        Ok(Value::new(self.value))
    }
}

/// `Double().double(x) -> 2x`
pub fn double(probe: &Probe) -> ComponentType {
    let log = probe.log.clone();
    ComponentType::new("Double")
        .constructor(Params::new(), move |_| {
            log.record("new Double");
            Ok(Box::new(Arith {
                log: log.clone(),
                label: "Double.double",
                op: |args| Ok(int(args, "x")? * 2),
            }))
        })
        .method("double", Params::new().required("x"))
}

/// `AddTen().add(x) -> x + 10`
pub fn add_ten(probe: &Probe) -> ComponentType {
    let log = probe.log.clone();
    ComponentType::new("AddTen")
        .constructor(Params::new(), move |_| {
            log.record("new AddTen");
            Ok(Box::new(Arith {
                log: log.clone(),
                label: "AddTen.add",
                op: |args| Ok(int(args, "x")? + 10),
            }))
        })
        .method("add", Params::new().required("x"))
}

/// `Add().add(a, b) -> a + b`
pub fn add(probe: &Probe) -> ComponentType {
    let log = probe.log.clone();
    ComponentType::new("Add")
        .constructor(Params::new(), move |_| {
            log.record("new Add");
            Ok(Box::new(Arith {
                log: log.clone(),
                label: "Add.add",
                op: |args| Ok(int(args, "a")? + int(args, "b")?),
            }))
        })
        .method("add", Params::new().required("a").required("b"))
}

struct Arith {
    log: CallLog,
    label: &'static str,
    op: fn(&Args) -> anyhow::Result<i64>,
}

impl Component for Arith {
    fn call(&mut self, _method: &str, args: Args) -> anyhow::Result<Value> {
        self.log.record(self.label);
        Ok(Value::new((self.op)(&args)?))
    }
}

/// `Scale(factor).apply(x) -> factor * x`
///
/// Eager nodes take `factor` from config; lazy nodes from an upstream node.
pub fn scale(probe: &Probe) -> ComponentType {
    let log = probe.log.clone();
    ComponentType::new("Scale")
        .constructor(Params::new().required("factor"), move |args| {
            log.record("new Scale");
            let factor = match args.input("factor") {
                Some(_) => int(&args, "factor")?,
                None => args.config_value("factor")?,
            };
            Ok(Box::new(Scale {
                log: log.clone(),
                factor,
            }))
        })
        .method("apply", Params::new().required("x"))
}

struct Scale {
    log: CallLog,
    factor: i64,
}

impl Component for Scale {
    fn call(&mut self, _method: &str, args: Args) -> anyhow::Result<Value> {
        self.log.record("Scale.apply");
        Ok(Value::new(self.factor * int(&args, "x")?))
    }
}

/// `Tagged(tag, sleep_ms?).run(**inputs) -> 1 + sum(inputs)`
///
/// Records `run <tag>`, so nodes sharing the type stay distinguishable.
pub fn tagged(probe: &Probe) -> ComponentType {
    let probe = probe.clone();
    ComponentType::new("Tagged")
        .constructor(
            Params::new().required("tag").optional("sleep_ms"),
            move |args| {
                let tag: String = args.config_value("tag")?;
                let sleep_ms: u64 = match args.config().get("sleep_ms") {
                    Some(_) => args.config_value("sleep_ms")?,
                    None => 0,
                };
                probe.log.record(format!("new {tag}"));
                Ok(Box::new(Tagged {
                    probe: probe.clone(),
                    tag,
                    sleep: Duration::from_millis(sleep_ms),
                }))
            },
        )
        .method("run", Params::new().variadic())
}

struct Tagged {
    probe: Probe,
    tag: String,
    sleep: Duration,
}

impl Component for Tagged {
    fn call(&mut self, _method: &str, args: Args) -> anyhow::Result<Value> {
        self.probe.enter();
        self.probe.log.record(format!("run {}", self.tag));
        std::thread::sleep(self.sleep);
        let total = args
            .inputs()
            .keys()
            .map(|name| int(&args, name))
            .sum::<anyhow::Result<i64>>();
        self.probe.leave();
        Ok(Value::new(1 + total?))
    }
}

/// `Sum.sum(**inputs)`, class-level. Its constructor exists only to prove it
/// is never used.
pub fn sum(probe: &Probe) -> ComponentType {
    let ctor_log = probe.log.clone();
    let call_log = probe.log.clone();
    ComponentType::new("Sum")
        .constructor(Params::new().required("never"), move |_| {
            ctor_log.record("new Sum");
            Err(anyhow!("Sum must not be constructed"))
        })
        .class_method("sum", Params::new().variadic(), move |args| {
            call_log.record("Sum.sum");
            let mut total = 0;
            for name in args.inputs().keys() {
                total += int(&args, name)?;
            }
            Ok(Value::new(total))
        })
}

/// `MakeList().make() -> vec![1, 2, 3]`
pub fn make_list(probe: &Probe) -> ComponentType {
    let log = probe.log.clone();
    ComponentType::new("MakeList")
        .constructor(Params::new(), move |_| {
            log.record("new MakeList");
            Ok(Box::new(MakeList { log: log.clone() }))
        })
        .method("make", Params::new())
}

struct MakeList {
    log: CallLog,
}

impl Component for MakeList {
    fn call(&mut self, _method: &str, _args: Args) -> anyhow::Result<Value> {
        self.log.record("MakeList.make");
        Ok(Value::new(vec![1_i64, 2, 3]))
    }
}

/// `Echo.echo(obj) -> obj`, class-level; hands back the very same value.
pub fn echo(probe: &Probe) -> ComponentType {
    let log = probe.log.clone();
    ComponentType::new("Echo").class_method("echo", Params::new().required("obj"), move |args| {
        log.record("Echo.echo");
        args.input("obj")
            .cloned()
            .ok_or_else(|| anyhow!("missing obj"))
    })
}

/// `Saver(persistor).save(x)`: writes `x` below its node directory and into
/// a fresh `snapshot/` sub-directory, then returns its resource name.
pub fn saver(probe: &Probe) -> ComponentType {
    let log = probe.log.clone();
    ComponentType::new("Saver")
        .constructor(Params::new().storage(), move |mut args| {
            log.record("new Saver");
            // persist = false leaves the handle out.
            let storage = args.take_storage().ok();
            Ok(Box::new(Saver {
                log: log.clone(),
                storage,
            }))
        })
        .method("save", Params::new().required("x"))
}

struct Saver {
    log: CallLog,
    storage: Option<ArtifactDir>,
}

impl Component for Saver {
    fn call(&mut self, _method: &str, args: Args) -> anyhow::Result<Value> {
        self.log.record("Saver.save");
        let x = int(&args, "x")?;
        let Some(storage) = &self.storage else {
            return Ok(Value::new(String::from("<unpersisted>")));
        };
        let file = storage.file_for("value.txt")?;
        storage.fs().write(&file, x.to_string().as_bytes())?;
        let snapshot = storage.directory_for("snapshot")?;
        storage
            .fs()
            .write(&snapshot.join("value.txt"), x.to_string().as_bytes())?;
        Ok(Value::new(storage.resource_name().to_string()))
    }
}

/// `Fail().fail()` always errors with "boom".
pub fn fail(probe: &Probe) -> ComponentType {
    let log = probe.log.clone();
    ComponentType::new("Fail")
        .constructor(Params::new(), move |_| {
            log.record("new Fail");
            Ok(Box::new(Fail { log: log.clone() }))
        })
        .method("fail", Params::new().variadic())
}

struct Fail {
    log: CallLog,
}

impl Component for Fail {
    fn call(&mut self, _method: &str, _args: Args) -> anyhow::Result<Value> {
        self.log.record("Fail.fail");
        bail!("boom")
    }
}

/// `Brittle().run(**inputs)`: the constructor always errors with
/// "constructor exploded", so the method is never reached.
pub fn brittle(probe: &Probe) -> ComponentType {
    let ctor_log = probe.log.clone();
    ComponentType::new("Brittle")
        .constructor(Params::new(), move |_| {
            ctor_log.record("new Brittle");
            bail!("constructor exploded")
        })
        .method("run", Params::new().variadic())
}
