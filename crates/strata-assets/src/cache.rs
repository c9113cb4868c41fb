//! Path-keyed store of cache roots.

use std::collections::HashMap;
use std::rc::Rc;

use crate::kind::AssetKind;
use crate::path::VirtualPath;
use crate::root::{Root, RootRef};

/// Called with the virtual path of every entry the cache drops.
pub type EvictionListener = Box<dyn FnMut(&VirtualPath)>;

/// Maps each virtual path to exactly one root.
///
/// The cache is the only place a root can be made invisible to lookups.
/// Aging is pull-based: [`Cache::sweep`] asks every root whether it is still
/// alive and removes the ones that are not, so roots never call back in here.
pub struct Cache<K: AssetKind> {
    name: String,
    entries: HashMap<VirtualPath, RootRef<K>>,
    listener: Option<EvictionListener>,
}

impl<K: AssetKind> Cache<K> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            listener: None,
        }
    }

    /// Namespace this cache serves.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Install the eviction listener, replacing any previous one.
    pub fn set_listener(&mut self, listener: EvictionListener) {
        self.listener = Some(listener);
    }

    /// Insert a root. Refuses, handing the root back untouched, when its path
    /// already has an entry.
    pub fn add(&mut self, root: Root<K>) -> Result<RootRef<K>, Root<K>> {
        if self.entries.contains_key(root.path()) {
            return Err(root);
        }
        let path = root.path().clone();
        let root = Rc::new(root);
        self.entries.insert(path, Rc::clone(&root));
        Ok(root)
    }

    /// Drop the entry for `path`, notifying the listener.
    pub fn remove(&mut self, path: &str) -> Option<RootRef<K>> {
        let (path, root) = self.entries.remove_entry(path)?;
        if let Some(listener) = self.listener.as_mut() {
            listener(&path);
        }
        Some(root)
    }

    /// Exact-match lookup.
    pub fn get(&self, path: &str) -> Option<&RootRef<K>> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached paths in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &VirtualPath> {
        self.entries.keys()
    }

    /// Age every root by `delay_ms` and remove the ones that expired.
    pub fn sweep(&mut self, delay_ms: u64) -> Vec<RootRef<K>> {
        let mut expired = Vec::new();
        for (path, root) in &self.entries {
            root.update(delay_ms);
            if !root.is_alive() {
                expired.push(path.clone());
            }
        }

        expired
            .into_iter()
            .filter_map(|path| self.remove(path.as_str()))
            .collect()
    }

    /// Remove every entry, notifying the listener for each.
    pub fn drain(&mut self) -> Vec<RootRef<K>> {
        let paths: Vec<VirtualPath> = self.entries.keys().cloned().collect();
        paths
            .into_iter()
            .filter_map(|path| self.remove(path.as_str()))
            .collect()
    }
}
