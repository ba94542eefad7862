// tests/persistence.rs

use std::path::PathBuf;
use std::sync::Arc;

use graphrun::dag::{Graph, GraphCompiler};
use graphrun::errors::GraphError;
use graphrun::exec::SequentialExecutor;
use graphrun::storage::ArtifactRoot;
use graphrun_test_utils::builders::{GraphSpecBuilder, NodeSpecBuilder};
use graphrun_test_utils::stubs::{stub_registry, Probe};
use graphrun_test_utils::{init_tracing, mock_root};

/// load(7) feeding two persisting savers.
fn two_savers() -> GraphSpecBuilder {
    GraphSpecBuilder::new()
        .with_node(
            "load",
            NodeSpecBuilder::new("Load", "load")
                .config("value", 7_i64)
                .persist(false)
                .build(),
        )
        .with_node(
            "first",
            NodeSpecBuilder::new("Saver", "save").needs("x", "load").build(),
        )
        .with_node(
            "second",
            NodeSpecBuilder::new("Saver", "save").needs("x", "load").build(),
        )
}

fn compile_at(builder: GraphSpecBuilder, root: Arc<ArtifactRoot>, probe: &Probe) -> Graph {
    init_tracing();
    let registry = stub_registry(probe);
    GraphCompiler::new(&registry, root)
        .compile_spec(&builder.build())
        .expect("graph compiles")
}

#[test]
fn each_persisting_node_gets_its_own_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = ArtifactRoot::create(dir.path().join("model")).unwrap();
    let probe = Probe::new();
    let graph = compile_at(two_savers(), root, &probe);

    let outputs = SequentialExecutor::new()
        .run(&graph, &["first", "second"].into())
        .unwrap();

    let first = dir.path().join("model/first");
    let second = dir.path().join("model/second");
    assert!(first.is_dir());
    assert!(second.is_dir());
    assert_ne!(first, second);
    assert_eq!(std::fs::read_to_string(first.join("value.txt")).unwrap(), "7");
    assert_eq!(
        std::fs::read_to_string(second.join("snapshot/value.txt")).unwrap(),
        "7"
    );

    // The resource name is how downstream nodes find these artifacts.
    assert_eq!(
        outputs["first"].downcast_ref::<String>().map(String::as_str),
        Some("first")
    );

    // Non-persisting nodes get nothing.
    assert!(!dir.path().join("model/load").exists());
}

#[test]
fn existing_sub_directory_is_never_reused() {
    let dir = tempfile::tempdir().unwrap();
    let probe = Probe::new();

    let root = ArtifactRoot::create(dir.path().join("model")).unwrap();
    let graph = compile_at(two_savers(), Arc::clone(&root), &probe);
    SequentialExecutor::new()
        .run(&graph, &"first".into())
        .unwrap();

    // Same artifact root, fresh graph: `first/snapshot` is already there.
    let graph = compile_at(two_savers(), root, &probe);
    let err = SequentialExecutor::new()
        .run(&graph, &"first".into())
        .unwrap_err();

    match err {
        GraphError::Invocation { node, source } => {
            assert_eq!(node, "first");
            match source.downcast_ref::<GraphError>() {
                Some(GraphError::AlreadyExists(path)) => {
                    assert_eq!(path, &dir.path().join("model/first/snapshot"));
                }
                other => panic!("Expected AlreadyExists, got: {:?}", other),
            }
        }
        other => panic!("Expected Invocation, got: {:?}", other),
    }
}

#[test]
fn directories_are_created_lazily() {
    let (fs, root) = mock_root();
    let probe = Probe::new();
    let graph = compile_at(two_savers(), root, &probe);

    // Both savers are constructed with a storage handle, yet nothing exists.
    assert_eq!(probe.log.count("new Saver"), 2);
    assert_eq!(fs.created_dirs(), vec![PathBuf::from("model")]);

    SequentialExecutor::new()
        .run(&graph, &"first".into())
        .unwrap();

    assert_eq!(
        fs.created_dirs(),
        vec![
            PathBuf::from("model"),
            PathBuf::from("model/first"),
            PathBuf::from("model/first/snapshot"),
        ]
    );
}

#[test]
fn non_persisting_node_gets_no_storage() {
    let (fs, root) = mock_root();
    let probe = Probe::new();
    let graph = compile_at(
        GraphSpecBuilder::new()
            .with_node(
                "load",
                NodeSpecBuilder::new("Load", "load").config("value", 1_i64).build(),
            )
            .with_node(
                "saver",
                NodeSpecBuilder::new("Saver", "save")
                    .needs("x", "load")
                    .persist(false)
                    .build(),
            ),
        root,
        &probe,
    );

    let outputs = SequentialExecutor::new()
        .run(&graph, &"saver".into())
        .unwrap();

    assert_eq!(
        outputs["saver"].downcast_ref::<String>().map(String::as_str),
        Some("<unpersisted>")
    );
    assert!(!graph.node("saver").unwrap().invoker().persists());
    assert_eq!(fs.created_dirs(), vec![PathBuf::from("model")]);
}

#[test]
fn artifact_scope_paths_and_names() {
    let (_fs, root) = mock_root();

    let scope = root.allocate("train").unwrap();
    assert_eq!(scope.resource_name(), "train");
    assert_eq!(scope.path(), PathBuf::from("model/train"));
    assert_eq!(
        scope.file_for("weights.bin").unwrap(),
        PathBuf::from("model/train/weights.bin")
    );
    assert_eq!(
        scope.resource_path("featurize", "vocab.toml"),
        PathBuf::from("model/featurize/vocab.toml")
    );

    assert!(matches!(
        root.allocate("../escape"),
        Err(GraphError::InvalidNodeName(_))
    ));
}

#[test]
fn directory_for_twice_fails() {
    let (_fs, root) = mock_root();
    let scope = root.allocate("node").unwrap();

    scope.directory_for("sub").unwrap();
    match scope.directory_for("sub") {
        Err(GraphError::AlreadyExists(path)) => {
            assert_eq!(path, PathBuf::from("model/node/sub"));
        }
        other => panic!("Expected AlreadyExists, got: {:?}", other),
    }

    // Plain files may be asked for any number of times.
    scope.file_for("a.txt").unwrap();
    scope.file_for("a.txt").unwrap();
}

#[test]
fn concurrent_requests_create_the_node_directory_once() {
    let (fs, root) = mock_root();
    let scope = root.allocate("shared").unwrap();

    std::thread::scope(|s| {
        for i in 0..8 {
            let scope = scope.clone();
            s.spawn(move || {
                scope.file_for(&format!("part-{i}")).unwrap();
            });
        }
    });

    let created: Vec<PathBuf> = fs
        .created_dirs()
        .into_iter()
        .filter(|p| p == &PathBuf::from("model/shared"))
        .collect();
    assert_eq!(created.len(), 1);
}
