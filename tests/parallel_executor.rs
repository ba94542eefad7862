// tests/parallel_executor.rs

use std::sync::Arc;

use graphrun::dag::{Graph, GraphCompiler, Targets};
use graphrun::errors::GraphError;
use graphrun::exec::ParallelExecutor;
use graphrun::types::Outputs;
use graphrun_test_utils::builders::{GraphSpecBuilder, NodeSpecBuilder};
use graphrun_test_utils::stubs::{stub_registry, Probe};
use graphrun_test_utils::{init_tracing, mock_root, with_timeout};

fn compile(builder: GraphSpecBuilder, probe: &Probe) -> Arc<Graph> {
    init_tracing();
    let registry = stub_registry(probe);
    let (_fs, root) = mock_root();
    let graph = GraphCompiler::new(&registry, root)
        .compile_spec(&builder.build())
        .expect("graph compiles");
    Arc::new(graph)
}

async fn run(
    workers: usize,
    graph: Arc<Graph>,
    targets: impl Into<Targets>,
) -> graphrun::errors::Result<Outputs> {
    with_timeout(ParallelExecutor::new(workers).run(graph, &targets.into())).await
}

fn tagged(tag: &str, sleep_ms: i64) -> NodeSpecBuilder {
    NodeSpecBuilder::new("Tagged", "run")
        .config("tag", tag)
        .config("sleep_ms", sleep_ms)
}

/// `count` independent sleeping nodes `w0..`, all feeding `sink`.
fn fan_in(count: usize, sleep_ms: i64) -> GraphSpecBuilder {
    let mut sink = tagged("sink", 0);
    let mut builder = GraphSpecBuilder::new();
    for i in 0..count {
        let name = format!("w{i}");
        builder = builder.with_node(&name, tagged(&name, sleep_ms).build());
        sink = sink.needs(&format!("in{i}"), &name);
    }
    builder.with_node("sink", sink.build())
}

#[tokio::test]
async fn diamond_matches_sequential_result() {
    let probe = Probe::new();
    let graph = compile(
        GraphSpecBuilder::new()
            .with_node("a", tagged("a", 5).build())
            .with_node("b", tagged("b", 5).needs("in", "a").build())
            .with_node("c", tagged("c", 5).needs("in", "a").build())
            .with_node(
                "d",
                tagged("d", 0).needs("left", "b").needs("right", "c").build(),
            ),
        &probe,
    );

    let outputs = run(4, graph, "d").await.unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs["d"].downcast_ref::<i64>(), Some(&5));
    for tag in ["a", "b", "c", "d"] {
        assert_eq!(probe.log.count(&format!("run {tag}")), 1, "node {tag}");
    }
    let pos = |tag: &str| probe.log.position(&format!("run {tag}")).unwrap();
    assert!(pos("a") < pos("b") && pos("a") < pos("c"));
    assert!(pos("b") < pos("d") && pos("c") < pos("d"));
}

#[tokio::test]
async fn worker_limit_is_respected() {
    let probe = Probe::new();
    let graph = compile(fan_in(6, 30), &probe);

    let outputs = run(2, graph, "sink").await.unwrap();

    assert_eq!(outputs["sink"].downcast_ref::<i64>(), Some(&7));
    assert!(probe.peak_concurrency() <= 2, "peak {}", probe.peak_concurrency());
}

#[tokio::test]
async fn independent_nodes_overlap() {
    let probe = Probe::new();
    let graph = compile(fan_in(4, 100), &probe);

    run(4, graph, "sink").await.unwrap();

    assert!(probe.peak_concurrency() >= 2, "peak {}", probe.peak_concurrency());
}

#[tokio::test]
async fn single_worker_runs_one_node_at_a_time() {
    let probe = Probe::new();
    let graph = compile(fan_in(3, 10), &probe);

    run(1, graph, "sink").await.unwrap();

    assert_eq!(probe.peak_concurrency(), 1);
}

#[tokio::test]
async fn failure_stops_dispatch_and_reports_the_node() {
    let probe = Probe::new();
    let graph = compile(
        GraphSpecBuilder::new()
            .with_node("a", tagged("a", 0).build())
            .with_node("boom", NodeSpecBuilder::new("Fail", "fail").needs("in", "a").build())
            .with_node("after", tagged("after", 0).needs("in", "boom").build()),
        &probe,
    );

    match run(3, graph, "after").await {
        Err(GraphError::Invocation { node, .. }) => assert_eq!(node, "boom"),
        other => panic!("Expected Invocation, got: {:?}", other),
    }
    assert_eq!(probe.log.count("run after"), 0);
}

#[tokio::test]
async fn unknown_target_is_rejected() {
    let probe = Probe::new();
    let graph = compile(fan_in(2, 0), &probe);

    assert!(matches!(
        run(2, graph, "nope").await,
        Err(GraphError::UnknownTarget(name)) if name == "nope"
    ));
    assert_eq!(probe.log.count("run w0"), 0);
}

#[tokio::test]
async fn only_the_closure_runs() {
    let probe = Probe::new();
    let graph = compile(fan_in(3, 0), &probe);

    let outputs = run(3, graph, ["w1"]).await.unwrap();

    assert_eq!(outputs.keys().collect::<Vec<_>>(), vec!["w1"]);
    assert_eq!(probe.log.count("run w1"), 1);
    assert_eq!(probe.log.count("run w0"), 0);
    assert_eq!(probe.log.count("run sink"), 0);
}

#[test]
fn worker_count_is_at_least_one() {
    assert_eq!(ParallelExecutor::new(0).max_workers(), 1);
    assert!(ParallelExecutor::default().max_workers() >= 1);
}

#[tokio::test]
async fn top_level_run_parallel_uses_spec_settings() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let probe = Probe::new();
    let registry = stub_registry(&probe);
    let spec = fan_in(4, 20)
        .artifact_root(dir.path().join("model"))
        .max_workers(2)
        .build();

    let outputs = with_timeout(graphrun::run_parallel(&spec, &registry, "sink"))
        .await
        .unwrap();

    assert_eq!(outputs["sink"].downcast_ref::<i64>(), Some(&5));
    assert!(probe.peak_concurrency() <= 2);
}
