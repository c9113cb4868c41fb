//! Cross-thread asset requests.
//!
//! Handles are tied to the thread that owns the loaders, so other threads ask
//! for work through a [`RequestQueue`] that the owner drains once per tick.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::kind::AssetKindId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRequest {
    /// Load into the cache without holding a handle.
    Preload { kind: AssetKindId, name: String },
    /// Evict now.
    Unload { kind: AssetKindId, name: String },
}

impl AssetRequest {
    pub fn kind(&self) -> AssetKindId {
        match self {
            AssetRequest::Preload { kind, .. } | AssetRequest::Unload { kind, .. } => *kind,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AssetRequest::Preload { name, .. } | AssetRequest::Unload { name, .. } => name,
        }
    }
}

/// Multi-producer request queue. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    pending: Arc<Mutex<Vec<AssetRequest>>>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, request: AssetRequest) {
        self.pending.lock().push(request);
    }

    pub fn preload(&self, kind: AssetKindId, name: impl Into<String>) {
        self.push(AssetRequest::Preload {
            kind,
            name: name.into(),
        });
    }

    pub fn unload(&self, kind: AssetKindId, name: impl Into<String>) {
        self.push(AssetRequest::Unload {
            kind,
            name: name.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Take every pending request in submission order.
    pub fn drain(&self) -> Vec<AssetRequest> {
        std::mem::take(&mut *self.pending.lock())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn drains_in_order() {
        let queue = RequestQueue::new();
        queue.preload(AssetKindId::Texture, "rock");
        queue.unload(AssetKindId::Model, "tree");

        let requests = queue.drain();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].kind(), AssetKindId::Texture);
        assert_eq!(requests[1].name(), "tree");
        assert!(queue.is_empty());
    }

    #[test]
    fn accepts_requests_from_other_threads() {
        let queue = RequestQueue::new();
        let workers: Vec<_> = (0..4)
            .map(|i| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for j in 0..25 {
                        queue.preload(AssetKindId::World, format!("chunk_{}_{}", i, j));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(queue.len(), 100);
        assert_eq!(queue.drain().len(), 100);
    }
}
