//! Registered resources.

use parking_lot::Mutex;

use crate::resource::{ResourceHandle, ResourceKind};

/// Ordered, thread-safe set of registered resources.
///
/// Registration order is preserved; duplicates are kept as separate entries.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<Vec<ResourceHandle>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource. Returns the new count for its kind.
    pub fn add(&self, handle: ResourceHandle) -> usize {
        let kind = handle.kind();
        let mut entries = self.entries.lock();
        entries.push(handle);
        count_of(&entries, kind)
    }

    /// Remove the first entry for the same resource.
    ///
    /// Returns the remaining count for its kind, or `None` if it was not registered.
    pub fn remove(&self, handle: &ResourceHandle) -> Option<usize> {
        let mut entries = self.entries.lock();
        let index = entries.iter().position(|e| e.same_resource(handle))?;
        entries.remove(index);
        Some(count_of(&entries, handle.kind()))
    }

    /// Copy of the entries of one kind, in registration order.
    pub fn snapshot(&self, kind: ResourceKind) -> Vec<ResourceHandle> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }

    /// Copy of every entry, in registration order.
    pub fn snapshot_all(&self) -> Vec<ResourceHandle> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

fn count_of(entries: &[ResourceHandle], kind: ResourceKind) -> usize {
    entries.iter().filter(|e| e.kind() == kind).count()
}
