//! Root documents
//!
//! The [`RootTable`] holds the only strong reference to each attached
//! root. Backends and queued UI tasks keep a `Weak` handle, so once a root
//! is detached everything still in flight for it fails to upgrade and is
//! dropped.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use trellis_core::{BackendKind, BridgeError, Result, RootId};

/// One attachable surface
#[derive(Debug)]
pub struct RootDocument {
    root_id: RootId,
    /// Device pixels per dp, fixed at attach time
    density: f32,
    backend: BackendKind,
}

impl RootDocument {
    pub fn new(root_id: RootId, density: f32, backend: BackendKind) -> Self {
        Self {
            root_id,
            density,
            backend,
        }
    }

    pub fn root_id(&self) -> RootId {
        self.root_id
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }
}

/// Weak handle to a root document
pub type RootHandle = Weak<RootDocument>;

/// Attached roots, keyed by id
#[derive(Debug, Default)]
pub struct RootTable {
    roots: RwLock<FxHashMap<RootId, Arc<RootDocument>>>,
}

impl RootTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, root: RootDocument) -> Result<RootHandle> {
        let mut roots = self.roots.write();
        if roots.contains_key(&root.root_id) {
            return Err(BridgeError::RootAlreadyAttached(root.root_id));
        }
        let root_id = root.root_id;
        let root = Arc::new(root);
        let handle = Arc::downgrade(&root);
        roots.insert(root_id, root);
        Ok(handle)
    }

    /// Forget a root; outstanding weak handles stop upgrading
    pub fn detach(&self, root_id: RootId) -> Result<()> {
        self.roots
            .write()
            .remove(&root_id)
            .map(|_| ())
            .ok_or(BridgeError::RootDetached(root_id))
    }

    pub fn get(&self, root_id: RootId) -> Option<Arc<RootDocument>> {
        self.roots.read().get(&root_id).cloned()
    }

    pub fn handle(&self, root_id: RootId) -> Option<RootHandle> {
        self.roots.read().get(&root_id).map(Arc::downgrade)
    }

    pub fn contains(&self, root_id: RootId) -> bool {
        self.roots.read().contains_key(&root_id)
    }

    pub fn len(&self) -> usize {
        self.roots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detach_invalidates_handles() {
        let table = RootTable::new();
        let handle = table
            .attach(RootDocument::new(1, 2.0, BackendKind::Direct))
            .unwrap();
        assert_eq!(handle.upgrade().map(|root| root.density()), Some(2.0));

        table.detach(1).unwrap();
        assert!(handle.upgrade().is_none());
        assert_eq!(table.detach(1), Err(BridgeError::RootDetached(1)));
    }

    #[test]
    fn test_attach_twice_fails() {
        let table = RootTable::new();
        table
            .attach(RootDocument::new(1, 1.0, BackendKind::Direct))
            .unwrap();
        let err = table
            .attach(RootDocument::new(1, 1.0, BackendKind::Serialized))
            .unwrap_err();
        assert_eq!(err, BridgeError::RootAlreadyAttached(1));
        assert_eq!(table.len(), 1);
    }
}
