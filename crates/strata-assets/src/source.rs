//! Where raw asset bytes come from.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::info;

use crate::error::AssetError;
use crate::path::VirtualPath;

/// Reads the bytes behind a virtual path.
pub trait AssetSource {
    fn read(&self, path: &VirtualPath) -> Result<Vec<u8>, AssetError>;
}

/// Reads assets from `<root>/<virtual path>` on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("FileSource rooted at {}", root.display());
        Self { root }
    }

    /// Resolve a virtual path against the root directory.
    pub fn resolve(&self, path: &VirtualPath) -> PathBuf {
        let mut full = self.root.clone();
        for segment in path.as_str().split('/') {
            full.push(segment);
        }
        full
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for FileSource {
    fn read(&self, path: &VirtualPath) -> Result<Vec<u8>, AssetError> {
        let full_path = self.resolve(path);
        if !full_path.is_file() {
            return Err(AssetError::NotFound(full_path.display().to_string()));
        }
        fs::read(&full_path).map_err(|e| AssetError::Io(full_path, e))
    }
}

/// In-memory assets keyed by virtual path. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: Rc<RefCell<HashMap<String, Vec<u8>>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the bytes stored at `path` (a full virtual path).
    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.borrow_mut().insert(path.into(), bytes.into());
    }

    pub fn remove(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow_mut().remove(path)
    }

    pub fn len(&self) -> usize {
        self.files.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.borrow().is_empty()
    }
}

impl AssetSource for MemorySource {
    fn read(&self, path: &VirtualPath) -> Result<Vec<u8>, AssetError> {
        self.files
            .borrow()
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}
