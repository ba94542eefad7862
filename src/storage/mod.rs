// src/storage/mod.rs

//! On-disk artifact scopes for persisting components.
//!
//! - [`ArtifactRoot`] is the single process-wide root (e.g. `model/`). It is
//!   created once, before any node is constructed, and is not owned by any
//!   node.
//! - [`ArtifactDir`] is the handle a persisting node receives. Its directory
//!   (`<root>/<node>`) is only created when the component first asks for a
//!   file or sub-directory.

use std::collections::HashMap;
use std::fmt;
use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::errors::{GraphError, Result};
use crate::fs::{is_already_exists, FileSystem, RealFileSystem};

/// Default artifact root, relative to the working directory.
pub const DEFAULT_ARTIFACT_ROOT: &str = "model";

/// Process-wide artifact root shared by every node of a graph.
pub struct ArtifactRoot {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    /// One lock per node name; creation is serialized per node only.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl fmt::Debug for ArtifactRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactRoot")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ArtifactRoot {
    /// Create (if needed) the root directory on the real filesystem.
    pub fn create(path: impl Into<PathBuf>) -> Result<Arc<Self>> {
        Self::with_fs(path, Arc::new(RealFileSystem))
    }

    /// Create (if needed) the root directory on the given filesystem.
    pub fn with_fs(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Result<Arc<Self>> {
        let root = Self::at(path, fs);
        root.prepare()?;
        Ok(root)
    }

    /// A root at `path` that has not touched the filesystem yet.
    ///
    /// Call [`prepare`](Self::prepare) before handing out node scopes.
    pub fn at(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            fs,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Make sure the root directory exists. Idempotent.
    pub fn prepare(&self) -> Result<()> {
        if !self.fs.is_dir(&self.path) {
            self.fs.create_dir_all(&self.path)?;
            debug!(root = ?self.path, "artifact root created");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Hand out the artifact scope for `node`.
    ///
    /// Nothing is created on disk yet. Repeated calls for the same node share
    /// the same creation lock.
    pub fn allocate(self: &Arc<Self>, node: &str) -> Result<ArtifactDir> {
        validate_node_name(node)?;

        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
            Arc::clone(locks.entry(node.to_string()).or_default())
        };

        Ok(ArtifactDir {
            node: node.to_string(),
            dir: self.path.join(node),
            root: Arc::clone(self),
            lock,
        })
    }

    /// Path of `filename` inside the scope of the node called `resource_name`.
    ///
    /// Downstream nodes use this to find an upstream node's artifacts by the
    /// name that node reported through [`ArtifactDir::resource_name`].
    pub fn resource_path(&self, resource_name: &str, filename: &str) -> PathBuf {
        self.path.join(resource_name).join(filename)
    }
}

/// Per-node artifact scope (`<root>/<node>`).
#[derive(Clone)]
pub struct ArtifactDir {
    node: String,
    dir: PathBuf,
    root: Arc<ArtifactRoot>,
    lock: Arc<Mutex<()>>,
}

impl fmt::Debug for ArtifactDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactDir")
            .field("node", &self.node)
            .field("dir", &self.dir)
            .finish()
    }
}

impl ArtifactDir {
    /// The node's identifier, which downstream nodes use to locate its
    /// artifacts.
    pub fn resource_name(&self) -> &str {
        &self.node
    }

    /// The node's directory. It may not exist yet.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        self.root.fs()
    }

    /// See [`ArtifactRoot::resource_path`].
    pub fn resource_path(&self, resource_name: &str, filename: &str) -> PathBuf {
        self.root.resource_path(resource_name, filename)
    }

    /// Ensure the node directory exists and return `<node dir>/<name>`.
    pub fn file_for(&self, name: &str) -> Result<PathBuf> {
        self.ensure_node_dir()?;
        Ok(self.dir.join(name))
    }

    /// Ensure the node directory exists and create a fresh `<node dir>/<name>`.
    ///
    /// Fails with [`GraphError::AlreadyExists`] if that sub-directory is
    /// already present; a leftover from an earlier run is never reused.
    pub fn directory_for(&self, name: &str) -> Result<PathBuf> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.create_node_dir_locked()?;

        let sub = self.dir.join(name);
        match self.fs().create_dir(&sub) {
            Ok(()) => {
                debug!(node = %self.node, dir = ?sub, "created artifact sub-directory");
                Ok(sub)
            }
            Err(e) if is_already_exists(&e) => Err(GraphError::AlreadyExists(sub)),
            Err(e) => Err(e.into()),
        }
    }

    fn ensure_node_dir(&self) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.create_node_dir_locked()
    }

    fn create_node_dir_locked(&self) -> Result<()> {
        if !self.fs().is_dir(&self.dir) {
            self.fs().create_dir_all(&self.dir)?;
            debug!(node = %self.node, dir = ?self.dir, "created node artifact directory");
        }
        Ok(())
    }
}

/// Node names double as directory names, so they must be one plain path
/// component.
pub fn validate_node_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let valid = matches!(
        (components.next(), components.next()),
        (Some(PathComponent::Normal(c)), None) if c == name
    );

    if valid && !name.contains(['/', '\\']) {
        Ok(())
    } else {
        Err(GraphError::InvalidNodeName(name.to_string()))
    }
}
