//! Preview resource handles.
//!
//! A [`PreviewHandle`] is an ephemeral reference to a file's bytes for
//! on-screen display, addressed by a `preview:` URI. Handles are registered
//! in a shared [`PreviewRegistry`] and release themselves when dropped, so
//! each one is released exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::media::{FileSource, MediaFile};

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    live: HashMap<u64, FileSource>,
}

/// Tracks live preview handles.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a preview for `file`. The handle is released when dropped.
    pub fn acquire(&self, file: &MediaFile) -> PreviewHandle {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.live.insert(id, file.source.clone());
        log::debug!("Preview {id} acquired for {}", file.name);

        PreviewHandle {
            id,
            uri: format!("preview:{id}/{}", file.name),
            registry: Arc::clone(&self.inner),
        }
    }

    /// Number of handles acquired and not yet released.
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    /// Look up the bytes behind a live handle.
    pub fn resolve(&self, id: u64) -> Option<FileSource> {
        self.lock().live.get(&id).cloned()
    }
}

/// A revocable reference to a file's bytes, valid until dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    uri: String,
    registry: Arc<Mutex<Registry>>,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if registry.live.remove(&self.id).is_some() {
            log::debug!("Preview {} released", self.id);
        }
    }
}
