//! Revocable preview handles for submitted images.
//!
//! A [`PreviewRef`] resolves to the original bytes until it is revoked.
//! The store is shared between the scheduler and whatever renders
//! previews; clones share the same map.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use studiostyle_core::types::PreviewRef;

#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    entries: Arc<Mutex<HashMap<PreviewRef, Bytes>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and hand out a fresh reference to them.
    pub fn register(&self, bytes: Bytes) -> PreviewRef {
        let preview = PreviewRef::new();
        self.lock().insert(preview, bytes);
        preview
    }

    /// Bytes behind a live reference, or `None` once revoked.
    pub fn resolve(&self, preview: &PreviewRef) -> Option<Bytes> {
        self.lock().get(preview).cloned()
    }

    /// Invalidate a reference. Returns whether it was still live.
    pub fn revoke(&self, preview: &PreviewRef) -> bool {
        self.lock().remove(preview).is_some()
    }

    /// Revoke every live reference.
    pub fn revoke_all(&self) -> usize {
        let mut entries = self.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PreviewRef, Bytes>> {
        // A poisoned map is still structurally valid.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
