// tests/compile_errors.rs

use graphrun::dag::{Graph, GraphCompiler};
use graphrun::errors::{GraphError, Result};
use graphrun_test_utils::builders::{GraphSpecBuilder, NodeSpecBuilder};
use graphrun_test_utils::stubs::{stub_registry, Probe};
use graphrun_test_utils::{init_tracing, mock_root};

fn compile(builder: &GraphSpecBuilder, probe: &Probe) -> Result<Graph> {
    init_tracing();
    let registry = stub_registry(probe);
    let (_fs, root) = mock_root();
    GraphCompiler::new(&registry, root).compile(&builder.nodes())
}

fn load(value: i64) -> NodeSpecBuilder {
    NodeSpecBuilder::new("Load", "load").config("value", value)
}

#[test]
fn missing_method_input_names_the_parameter() {
    let probe = Probe::new();
    let builder = GraphSpecBuilder::new()
        .with_node("load", load(5).build())
        .with_node("double", NodeSpecBuilder::new("Double", "double").build());

    match compile(&builder, &probe) {
        Err(GraphError::MissingInput { node, param, callable }) => {
            assert_eq!(node, "double");
            assert_eq!(param, "x");
            assert_eq!(callable, "Double.double");
        }
        other => panic!("Expected MissingInput, got: {:?}", other),
    }

    // Validation runs before any eager construction.
    assert!(probe.log.entries().is_empty(), "{:?}", probe.log.entries());
}

#[test]
fn missing_input_error_message_mentions_parameter() {
    let probe = Probe::new();
    let builder = GraphSpecBuilder::new().with_node(
        "add",
        NodeSpecBuilder::new("Add", "add").needs("a", "add_a").build(),
    )
    .with_node("add_a", load(1).build());

    let err = compile(&builder, &probe).unwrap_err();
    assert!(err.is_specification_error());
    assert!(err.to_string().contains("'b'"), "message: {err}");
}

#[test]
fn dangling_reference_is_rejected() {
    let probe = Probe::new();
    let builder = GraphSpecBuilder::new().with_node(
        "double",
        NodeSpecBuilder::new("Double", "double")
            .needs("x", "ghost")
            .build(),
    );

    match compile(&builder, &probe) {
        Err(GraphError::DanglingReference { node, reference }) => {
            assert_eq!(node, "double");
            assert_eq!(reference, "ghost");
        }
        other => panic!("Expected DanglingReference, got: {:?}", other),
    }
    assert!(probe.log.entries().is_empty());
}

#[test]
fn duplicate_node_name_is_rejected() {
    let result = GraphSpecBuilder::new()
        .try_with_node("load", load(1).build())
        .and_then(|b| b.try_with_node("load", load(2).build()));

    match result {
        Err(GraphError::DuplicateNode(name)) => assert_eq!(name, "load"),
        Err(e) => panic!("Expected DuplicateNode, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_component_method_and_constructor() {
    let probe = Probe::new();

    let builder =
        GraphSpecBuilder::new().with_node("n", NodeSpecBuilder::new("Nope", "run").build());
    assert!(matches!(
        compile(&builder, &probe),
        Err(GraphError::UnknownComponent { ref component, .. }) if component == "Nope"
    ));

    let builder = GraphSpecBuilder::new()
        .with_node("n", NodeSpecBuilder::new("Load", "nope").config("value", 1).build());
    assert!(matches!(
        compile(&builder, &probe),
        Err(GraphError::UnknownMethod { ref method, .. }) if method == "nope"
    ));

    let builder = GraphSpecBuilder::new().with_node("n", load(1).constructor("from_disk").build());
    assert!(matches!(
        compile(&builder, &probe),
        Err(GraphError::UnknownConstructor { ref constructor, .. }) if constructor == "from_disk"
    ));

    assert!(probe.log.entries().is_empty());
}

#[test]
fn eager_constructor_params_must_be_in_config() {
    let probe = Probe::new();
    let builder =
        GraphSpecBuilder::new().with_node("load", NodeSpecBuilder::new("Load", "load").build());

    match compile(&builder, &probe) {
        Err(GraphError::MissingConfig { node, param, callable }) => {
            assert_eq!(node, "load");
            assert_eq!(param, "value");
            assert_eq!(callable, "Load::new");
        }
        other => panic!("Expected MissingConfig, got: {:?}", other),
    }
}

#[test]
fn lazy_constructor_params_must_be_in_needs() {
    let probe = Probe::new();
    let builder = GraphSpecBuilder::new()
        .with_node("x", load(2).build())
        .with_node(
            "scale",
            NodeSpecBuilder::new("Scale", "apply")
                .needs("x", "x")
                .eager(false)
                .build(),
        );

    match compile(&builder, &probe) {
        Err(GraphError::MissingInput { param, callable, .. }) => {
            assert_eq!(param, "factor");
            assert_eq!(callable, "Scale::new");
        }
        other => panic!("Expected MissingInput, got: {:?}", other),
    }
}

#[test]
fn node_names_must_be_single_path_components() {
    for bad in ["a/b", "..", ".", "", "a\\b", "/abs"] {
        let probe = Probe::new();
        let builder = GraphSpecBuilder::new().with_node(bad, load(1).build());
        match compile(&builder, &probe) {
            Err(GraphError::InvalidNodeName(name)) => assert_eq!(name, bad),
            other => panic!("Expected InvalidNodeName for {bad:?}, got: {:?}", other),
        }
    }
}

#[test]
fn two_node_cycle_fails_before_anything_runs() {
    let probe = Probe::new();
    let builder = GraphSpecBuilder::new()
        .with_node(
            "A",
            NodeSpecBuilder::new("Double", "double").needs("x", "B").build(),
        )
        .with_node(
            "B",
            NodeSpecBuilder::new("Double", "double").needs("x", "A").build(),
        );

    match compile(&builder, &probe) {
        Err(GraphError::CyclicGraph(msg)) => {
            assert!(msg.contains("cycle detected"), "message: {msg}");
            assert!(msg.contains('A') && msg.contains('B'), "message: {msg}");
        }
        other => panic!("Expected CyclicGraph, got: {:?}", other),
    }
    assert!(probe.log.entries().is_empty());
}

#[test]
fn self_dependency_is_a_cycle() {
    let probe = Probe::new();
    let builder = GraphSpecBuilder::new().with_node(
        "A",
        NodeSpecBuilder::new("Double", "double").needs("x", "A").build(),
    );

    assert!(matches!(
        compile(&builder, &probe),
        Err(GraphError::CyclicGraph(_))
    ));
}

#[test]
fn validated_spec_also_rejects_cycles_and_dangling_references() {
    let cyclic = GraphSpecBuilder::new()
        .with_node("A", NodeSpecBuilder::new("Double", "double").needs("x", "B").build())
        .with_node("B", NodeSpecBuilder::new("Double", "double").needs("x", "A").build())
        .try_build();
    assert!(matches!(cyclic, Err(GraphError::CyclicGraph(_))));

    let dangling = GraphSpecBuilder::new()
        .with_node("A", NodeSpecBuilder::new("Double", "double").needs("x", "Z").build())
        .try_build();
    assert!(matches!(dangling, Err(GraphError::DanglingReference { .. })));
}

#[test]
fn class_level_method_needs_no_constructor_arguments() {
    let probe = Probe::new();
    let builder = GraphSpecBuilder::new()
        .with_node("a", load(1).build())
        .with_node("sum", NodeSpecBuilder::new("Sum", "sum").needs("a", "a").build());

    let graph = compile(&builder, &probe).expect("class-level node compiles");
    assert!(!graph.node("sum").unwrap().invoker().is_constructed());
    assert_eq!(probe.log.count("new Sum"), 0);
}

#[test]
fn check_validates_without_constructing() {
    let probe = Probe::new();
    let registry = stub_registry(&probe);
    let (fs, root) = mock_root();
    let builder = GraphSpecBuilder::new().with_node("load", load(3).build());

    GraphCompiler::new(&registry, root)
        .check(&builder.nodes())
        .expect("valid graph");

    assert!(probe.log.entries().is_empty());
    assert_eq!(fs.created_dirs().len(), 1, "only the root itself");
}

#[test]
fn failing_eager_constructor_aborts_compilation() {
    let probe = Probe::new();
    let builder = GraphSpecBuilder::new()
        .with_node("src", load(1).build())
        .with_node(
            "brittle",
            NodeSpecBuilder::new("Brittle", "run").needs("in", "src").build(),
        )
        .with_node(
            "after",
            NodeSpecBuilder::new("Double", "double").needs("x", "brittle").build(),
        );

    let err = compile(&builder, &probe).unwrap_err();

    match &err {
        GraphError::Invocation { node, source } => {
            assert_eq!(node, "brittle");
            assert!(source.to_string().contains("constructor exploded"));
        }
        other => panic!("Expected Invocation, got: {:?}", other),
    }
    assert!(!err.is_specification_error());
    assert_eq!(probe.log.count("new Brittle"), 1);
    for call in ["Load.load", "Brittle.run", "Double.double"] {
        assert_eq!(probe.log.count(call), 0, "{call}");
    }
}
