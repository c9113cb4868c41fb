//! Cache roots: the single owner of one loaded asset's payload.

use std::cell::{BorrowMutError, Cell, RefCell};
#[cfg(test)]
use std::cell::RefMut;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use slotmap::{new_key_type, DenseSlotMap};

use crate::handle::Handle;
use crate::kind::AssetKind;
use crate::path::VirtualPath;

/// Idle time after which a handle-free root is evicted.
pub const DEFAULT_TTL_MS: u64 = 120_000;

static NEXT_ROOT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootId(u64);

impl RootId {
    fn next() -> Self {
        Self(NEXT_ROOT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

new_key_type! {
    /// Slot of one outstanding handle inside its root.
    pub struct HandleKey;
}

/// Shared reference to a root held by the cache.
pub type RootRef<K> = Rc<Root<K>>;

/// Exclusive owner of an asset's payload.
///
/// Tracks the handles referencing it and how long it has gone without any.
/// Handle bookkeeping and aging live in their own cells, so they stay usable
/// while a reader holds the payload.
pub struct Root<K: AssetKind> {
    id: RootId,
    path: VirtualPath,
    payload: RefCell<Option<K::Payload>>,
    handles: RefCell<DenseSlotMap<HandleKey, ()>>,
    idle_ms: Cell<u64>,
    ttl_ms: u64,
    evicted: Cell<bool>,
}

impl<K: AssetKind> Root<K> {
    /// Wrap a fully built payload. A zero TTL is raised to 1 ms so a root with
    /// live handles is always alive.
    pub fn new(path: VirtualPath, payload: K::Payload, ttl_ms: u64) -> Self {
        Self {
            id: RootId::next(),
            path,
            payload: RefCell::new(Some(payload)),
            handles: RefCell::new(DenseSlotMap::with_key()),
            idle_ms: Cell::new(0),
            ttl_ms: ttl_ms.max(1),
            evicted: Cell::new(false),
        }
    }

    /// Register a new handle on a shared root.
    pub fn create_handle(this: &RootRef<K>) -> Handle<K> {
        Handle::bind(this)
    }

    /// Taking a handle restarts the idle clock, even between ticks.
    pub(crate) fn register_handle(&self) -> HandleKey {
        self.idle_ms.set(0);
        self.handles.borrow_mut().insert(())
    }

    /// Detach `handle` from this root. Returns false when the handle is
    /// released, belongs to another root, or was already detached.
    pub fn remove_handle(&self, handle: &Handle<K>) -> bool {
        match handle.binding() {
            Some((root_id, key)) if root_id == self.id => {
                self.handles.borrow_mut().remove(key).is_some()
            }
            _ => false,
        }
    }

    pub(crate) fn has_handle(&self, key: HandleKey) -> bool {
        self.handles.borrow().contains_key(key)
    }

    /// Age the root by one tick.
    pub fn update(&self, elapsed_ms: u64) {
        if self.handles.borrow().is_empty() {
            self.idle_ms.set(self.idle_ms.get().saturating_add(elapsed_ms));
        } else {
            self.idle_ms.set(0);
        }
    }

    /// Whether the root is still within its idle budget.
    pub fn is_alive(&self) -> bool {
        !self.evicted.get() && self.idle_ms.get() < self.ttl_ms
    }

    /// Mark the root evicted and invalidate every outstanding handle.
    pub fn invalidate(&self) {
        self.evicted.set(true);
        self.handles.borrow_mut().clear();
    }

    /// Hand the payload back for teardown. Only the first successful call
    /// returns it; fails while a reader is borrowing the payload.
    pub fn take_payload(&self) -> Result<Option<K::Payload>, BorrowMutError> {
        Ok(self.payload.try_borrow_mut()?.take())
    }

    /// [`invalidate`](Self::invalidate) then [`take_payload`](Self::take_payload).
    pub fn evict(&self) -> Result<Option<K::Payload>, BorrowMutError> {
        self.invalidate();
        self.take_payload()
    }

    /// Run `f` against the payload, if it has not been taken.
    pub fn with_payload<R>(&self, f: impl FnOnce(&K::Payload) -> R) -> Option<R> {
        self.payload.borrow().as_ref().map(f)
    }

    /// Whether the payload is still present and fully built.
    pub fn is_ready(&self) -> bool {
        self.payload.borrow().as_ref().is_some_and(K::is_ready)
    }

    #[cfg(test)]
    pub(crate) fn payload_mut(&self) -> RefMut<'_, Option<K::Payload>> {
        self.payload.borrow_mut()
    }

    pub fn id(&self) -> RootId {
        self.id
    }

    pub fn path(&self) -> &VirtualPath {
        &self.path
    }

    pub fn handle_count(&self) -> usize {
        self.handles.borrow().len()
    }

    pub fn idle_ms(&self) -> u64 {
        self.idle_ms.get()
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    pub fn is_evicted(&self) -> bool {
        self.evicted.get()
    }
}
