pub mod builders;
pub mod stubs;

use std::sync::{Arc, Once};

use graphrun::fs::mock::MockFileSystem;
use graphrun::storage::ArtifactRoot;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// An artifact root at `model/` on a fresh in-memory filesystem.
///
/// The returned filesystem shares state with the one inside the root.
pub fn mock_root() -> (MockFileSystem, Arc<ArtifactRoot>) {
    let fs = MockFileSystem::new();
    let root = ArtifactRoot::with_fs("model", Arc::new(fs.clone()))
        .expect("mock artifact root");
    (fs, root)
}
