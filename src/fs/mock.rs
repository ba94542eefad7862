// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem for tests.
///
/// Also records every directory creation so tests can assert on how often
/// (and in which order) storage touched the disk.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    created_dirs: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("."), MockEntry::Dir);
        entries.insert(PathBuf::from("/"), MockEntry::Dir);

        Self {
            entries: Arc::new(Mutex::new(entries)),
            created_dirs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.lock();
        if let Some(parent) = path.parent() {
            Self::ensure_dirs(&mut entries, parent);
        }
        entries.insert(path, MockEntry::File(content.into()));
    }

    /// Directories created through the [`FileSystem`] API, in creation order.
    pub fn created_dirs(&self) -> Vec<PathBuf> {
        self.created_dirs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record(&self, path: &Path) {
        self.created_dirs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(path.to_path_buf());
    }

    fn ensure_dirs(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if path.as_os_str().is_empty() {
            return;
        }
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            entries
                .entry(ancestor.to_path_buf())
                .or_insert(MockEntry::Dir);
        }
    }

    fn parent_exists(entries: &HashMap<PathBuf, MockEntry>, path: &Path) -> bool {
        match path.parent() {
            None => true,
            Some(p) if p.as_os_str().is_empty() => true,
            Some(p) => matches!(entries.get(p), Some(MockEntry::Dir)),
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let entries = self.lock();
        match entries.get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir))
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut entries = self.lock();
        if let Some(MockEntry::File(_)) = entries.get(path) {
            return Err(anyhow!("Not a directory: {:?}", path));
        }
        if !entries.contains_key(path) {
            Self::ensure_dirs(&mut entries, path);
            drop(entries);
            self.record(path);
        }
        Ok(())
    }

    fn create_dir(&self, path: &Path) -> Result<()> {
        let mut entries = self.lock();
        if entries.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{:?} already exists", path),
            )
            .into());
        }
        if !Self::parent_exists(&entries, path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("parent of {:?} does not exist", path),
            )
            .into());
        }
        entries.insert(path.to_path_buf(), MockEntry::Dir);
        drop(entries);
        self.record(path);
        Ok(())
    }
}
