use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::AssetError;
use crate::kind::AssetKind;
use crate::path::VirtualPath;
use crate::root::{HandleKey, Root, RootId, RootRef};

enum Binding<K: AssetKind> {
    Bound {
        root: Weak<Root<K>>,
        root_id: RootId,
        key: HandleKey,
    },
    Released,
}

/// A lightweight reference to a cached asset.
///
/// Handles never keep their root alive. Cloning a live handle registers a new
/// reference on the root; dropping or releasing one removes it. Once the root
/// is evicted every handle to it reports `valid() == false` and its accessors
/// fail with [`AssetError::UseAfterRelease`].
///
/// All of this works from inside a [`read`](Handle::read) closure on the same
/// root: reading only borrows the payload, never the handle bookkeeping.
pub struct Handle<K: AssetKind> {
    binding: Binding<K>,
}

impl<K: AssetKind> Handle<K> {
    pub(crate) fn bind(root: &RootRef<K>) -> Self {
        Self {
            binding: Binding::Bound {
                root: Rc::downgrade(root),
                root_id: root.id(),
                key: root.register_handle(),
            },
        }
    }

    pub(crate) fn binding(&self) -> Option<(RootId, HandleKey)> {
        match &self.binding {
            Binding::Bound { root_id, key, .. } => Some((*root_id, *key)),
            Binding::Released => None,
        }
    }

    /// The root this handle is still registered on, if any.
    fn root(&self) -> Option<RootRef<K>> {
        let Binding::Bound { root, key, .. } = &self.binding else {
            return None;
        };
        let root = root.upgrade()?;
        root.has_handle(*key).then_some(root)
    }

    /// Give the reference back to the root. The handle is unusable afterwards.
    pub fn release(&mut self) -> Result<(), AssetError> {
        let Binding::Bound { root, .. } = &self.binding else {
            return Err(AssetError::UseAfterRelease);
        };
        if let Some(root) = root.upgrade() {
            root.remove_handle(self);
        }
        self.binding = Binding::Released;
        Ok(())
    }

    /// Whether `release` has been called on this handle.
    pub fn is_released(&self) -> bool {
        matches!(self.binding, Binding::Released)
    }

    /// Bound, registered on a live root, and backed by a ready payload.
    pub fn valid(&self) -> bool {
        self.root()
            .is_some_and(|root| root.is_alive() && root.is_ready())
    }

    /// Virtual path of the referenced asset.
    pub fn path(&self) -> Result<VirtualPath, AssetError> {
        let root = self.root().ok_or(AssetError::UseAfterRelease)?;
        Ok(root.path().clone())
    }

    /// Run `f` against the payload.
    pub fn read<R>(&self, f: impl FnOnce(&K::Payload) -> R) -> Result<R, AssetError> {
        let root = self.root().ok_or(AssetError::UseAfterRelease)?;
        root.with_payload(f).ok_or(AssetError::UseAfterRelease)
    }

    /// Whether both handles reference the same root.
    pub fn same_root(&self, other: &Handle<K>) -> bool {
        match (self.binding(), other.binding()) {
            (Some((a, _)), Some((b, _))) => a == b,
            _ => false,
        }
    }

    /// Identity of the referenced root while bound.
    pub fn root_id(&self) -> Option<RootId> {
        self.binding().map(|(id, _)| id)
    }
}

impl<K: AssetKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        match self.root() {
            Some(root) => Handle::bind(&root),
            None => Self {
                binding: Binding::Released,
            },
        }
    }
}

impl<K: AssetKind> Drop for Handle<K> {
    fn drop(&mut self) {
        if let Binding::Bound { root, .. } = &self.binding {
            if let Some(root) = root.upgrade() {
                root.remove_handle(self);
            }
        }
    }
}

impl<K: AssetKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root() {
            Some(root) => f
                .debug_struct("Handle")
                .field("path", &root.path().as_str())
                .field("valid", &self.valid())
                .finish(),
            None if self.is_released() => f.write_str("Handle(released)"),
            None => f.write_str("Handle(evicted)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{blob_root, Blob};

    #[test]
    fn release_twice_is_use_after_release() {
        let root = blob_root("blobs/a.bin", 1_000);
        let mut handle = Root::create_handle(&root);
        handle.release().unwrap();
        assert!(handle.is_released());
        assert!(matches!(handle.release(), Err(AssetError::UseAfterRelease)));
        assert_eq!(root.handle_count(), 0);
    }

    #[test]
    fn accessors_fail_after_release() {
        let root = blob_root("blobs/a.bin", 1_000);
        let mut handle = Root::create_handle(&root);
        assert_eq!(handle.path().unwrap().as_str(), "blobs/a.bin");
        assert_eq!(handle.read(|p| p.id).unwrap(), 1);

        handle.release().unwrap();
        assert!(!handle.valid());
        assert!(matches!(handle.path(), Err(AssetError::UseAfterRelease)));
        assert!(matches!(handle.read(|p| p.id), Err(AssetError::UseAfterRelease)));
    }

    #[test]
    fn clone_registers_new_reference() {
        let root = blob_root("blobs/a.bin", 1_000);
        let handle = Root::create_handle(&root);
        let copy = handle.clone();
        assert_eq!(root.handle_count(), 2);
        assert!(copy.same_root(&handle));

        drop(handle);
        assert_eq!(root.handle_count(), 1);
        drop(copy);
        assert_eq!(root.handle_count(), 0);
    }

    #[test]
    fn clone_of_released_is_released() {
        let root = blob_root("blobs/a.bin", 1_000);
        let mut handle = Root::create_handle(&root);
        handle.release().unwrap();
        let copy = handle.clone();
        assert!(copy.is_released());
        assert_eq!(root.handle_count(), 0);
    }

    #[test]
    fn root_drop_invalidates_handles() {
        let root = blob_root("blobs/a.bin", 1_000);
        let mut handle: Handle<Blob> = Root::create_handle(&root);
        drop(root);

        assert!(!handle.valid());
        assert!(!handle.is_released());
        assert!(matches!(handle.path(), Err(AssetError::UseAfterRelease)));
        let copy = handle.clone();
        assert!(copy.is_released());
        // Releasing an orphaned handle is not an error.
        handle.release().unwrap();
    }

    #[test]
    fn not_ready_payload_is_invalid() {
        let root = blob_root("blobs/a.bin", 1_000);
        let handle = Root::create_handle(&root);
        assert!(handle.valid());
        root.payload_mut().as_mut().unwrap().id = 0;
        assert!(!handle.valid());
    }

    #[test]
    fn same_root_distinguishes_roots() {
        let a = blob_root("blobs/a.bin", 1_000);
        let b = blob_root("blobs/b.bin", 1_000);
        let ha = Root::create_handle(&a);
        let hb = Root::create_handle(&b);
        assert!(!ha.same_root(&hb));
        assert!(ha.same_root(&ha.clone()));
    }

    #[test]
    fn handle_operations_inside_read() {
        let root = blob_root("blobs/a.bin", 1_000);
        let reader = Root::create_handle(&root);
        let mut other = reader.clone();
        let dropped = reader.clone();

        let count = reader
            .read(|payload| {
                assert_eq!(payload.id, 1);
                let copy = reader.clone();
                assert!(copy.valid());
                other.release().unwrap();
                drop(dropped);
                let fresh = Root::create_handle(&root);
                assert!(fresh.same_root(&reader));
                root.handle_count()
            })
            .unwrap();

        // reader, copy and fresh were registered during the read.
        assert_eq!(count, 3);
        assert_eq!(root.handle_count(), 1);
        drop(reader);
        assert_eq!(root.handle_count(), 0);
    }
}
