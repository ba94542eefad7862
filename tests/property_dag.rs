// tests/property_dag.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use graphrun::dag::{ExecutionPlan, Graph, GraphCompiler, Targets};
use graphrun::exec::{ParallelExecutor, SequentialExecutor};
use graphrun::types::Outputs;
use graphrun_test_utils::builders::{GraphSpecBuilder, NodeSpecBuilder};
use graphrun_test_utils::mock_root;
use graphrun_test_utils::stubs::{stub_registry, Probe};
use proptest::prelude::*;

/// Random DAG as dependency lists plus target indices.
///
/// Acyclic by construction: node N may only depend on nodes 0..N-1.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = (Vec<BTreeSet<usize>>, Vec<usize>)> {
    (1..=max_nodes)
        .prop_flat_map(|n| {
            let deps = proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..n), n);
            let targets = proptest::collection::vec(0..n, 1..=n.min(4));
            (deps, targets)
        })
        .prop_map(|(raw, targets)| {
            let deps = raw
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    if i == 0 {
                        BTreeSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    }
                })
                .collect();
            (deps, targets)
        })
}

fn name(i: usize) -> String {
    format!("n{i}")
}

fn build_graph(deps: &[BTreeSet<usize>], probe: &Probe) -> Graph {
    let mut builder = GraphSpecBuilder::new();
    for (i, node_deps) in deps.iter().enumerate() {
        let mut node = NodeSpecBuilder::new("Tagged", "run").config("tag", name(i));
        for d in node_deps {
            node = node.needs(&format!("in{d}"), &name(*d));
        }
        builder = builder.with_node(&name(i), node.build());
    }

    let registry = stub_registry(probe);
    let (_fs, root) = mock_root();
    GraphCompiler::new(&registry, root)
        .compile_spec(&builder.build())
        .expect("generated graph compiles")
}

/// Value of every node: 1 + the sum of its dependencies' values.
fn expected_values(deps: &[BTreeSet<usize>]) -> Vec<i64> {
    let mut values: Vec<i64> = Vec::with_capacity(deps.len());
    for node_deps in deps {
        let v = 1 + node_deps.iter().map(|d| values[*d]).sum::<i64>();
        values.push(v);
    }
    values
}

fn closure(deps: &[BTreeSet<usize>], targets: &[usize]) -> BTreeSet<usize> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<usize> = targets.to_vec();
    while let Some(i) = stack.pop() {
        if seen.insert(i) {
            stack.extend(deps[i].iter().copied());
        }
    }
    seen
}

fn check_run(
    deps: &[BTreeSet<usize>],
    targets: &[usize],
    probe: &Probe,
    outputs: &Outputs,
) -> Result<(), TestCaseError> {
    let values = expected_values(deps);
    let wanted: BTreeSet<String> = targets.iter().map(|t| name(*t)).collect();
    let got: BTreeSet<String> = outputs.keys().cloned().collect();
    prop_assert_eq!(&got, &wanted);

    for t in targets {
        prop_assert_eq!(outputs[&name(*t)].downcast_ref::<i64>(), Some(&values[*t]));
    }

    let members = closure(deps, targets);
    for i in 0..deps.len() {
        let runs = probe.log.count(&format!("run {}", name(i)));
        if members.contains(&i) {
            prop_assert_eq!(runs, 1, "node {} in closure", i);
        } else {
            prop_assert_eq!(runs, 0, "node {} outside closure", i);
        }
    }

    for i in &members {
        let pos = probe.log.position(&format!("run {}", name(*i))).unwrap();
        for d in &deps[*i] {
            let dep_pos = probe.log.position(&format!("run {}", name(*d))).unwrap();
            prop_assert!(dep_pos < pos, "n{} ran before its dependency n{}", i, d);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn sequential_runs_exactly_the_closure((deps, targets) in dag_strategy(10)) {
        let probe = Probe::new();
        let graph = build_graph(&deps, &probe);
        let target_names: Vec<String> = targets.iter().map(|t| name(*t)).collect();

        let outputs = SequentialExecutor::new()
            .run(&graph, &Targets::from(target_names))
            .unwrap();

        check_run(&deps, &targets, &probe, &outputs)?;
    }

    #[test]
    fn parallel_runs_exactly_the_closure(
        (deps, targets) in dag_strategy(10),
        workers in 1..4usize,
    ) {
        let probe = Probe::new();
        let graph = Arc::new(build_graph(&deps, &probe));
        let target_names: Vec<String> = targets.iter().map(|t| name(*t)).collect();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let outputs = rt
            .block_on(ParallelExecutor::new(workers).run(graph, &Targets::from(target_names)))
            .unwrap();

        check_run(&deps, &targets, &probe, &outputs)?;
        prop_assert!(probe.peak_concurrency() <= workers);
    }

    #[test]
    fn plan_is_a_topological_order_of_the_closure((deps, targets) in dag_strategy(12)) {
        let map: BTreeMap<String, Vec<String>> = deps
            .iter()
            .enumerate()
            .map(|(i, d)| (name(i), d.iter().map(|x| name(*x)).collect()))
            .collect();
        let target_names: Vec<String> = targets.iter().map(|t| name(*t)).collect();

        let plan = ExecutionPlan::new(&map, &Targets::from(target_names)).unwrap();

        let members: BTreeSet<String> = closure(&deps, &targets).into_iter().map(name).collect();
        let planned: BTreeSet<String> = plan.order().iter().cloned().collect();
        prop_assert_eq!(plan.len(), members.len());
        prop_assert_eq!(planned, members);

        for (pos, node) in plan.order().iter().enumerate() {
            for dep in &map[node] {
                let dep_pos = plan.order().iter().position(|n| n == dep).unwrap();
                prop_assert!(dep_pos < pos);
            }
        }
    }
}
