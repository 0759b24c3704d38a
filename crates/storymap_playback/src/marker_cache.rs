// SPDX-License-Identifier: MIT OR Apache-2.0
//! Process-lifetime marker cache.
//!
//! Routes that join end-to-start with a shared icon reuse one marker across
//! segments; the render boundary looks handles up here instead of creating
//! a marker per leg. The cache is an explicitly owned object handed to the
//! gateway on every render call — never global state.

use indexmap::IndexMap;
use parking_lot::Mutex;
use storymap_timeline::MarkerChainKey;

/// Opaque handle to a marker owned by the render boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

#[derive(Debug, Default)]
struct CacheInner {
    entries: IndexMap<MarkerChainKey, MarkerHandle>,
    next_handle: u64,
}

/// Cache of marker handles keyed by chain identity.
///
/// Internally synchronized so the gateway can be called with `&MarkerCache`
/// from concurrent render passes.
#[derive(Debug, Default)]
pub struct MarkerCache {
    inner: Mutex<CacheInner>,
}

impl MarkerCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the handle for a chain, allocating one on first sight
    pub fn get_or_insert(&self, key: MarkerChainKey) -> MarkerHandle {
        let mut inner = self.inner.lock();
        if let Some(handle) = inner.entries.get(&key) {
            return *handle;
        }
        let handle = MarkerHandle(inner.next_handle);
        inner.next_handle += 1;
        inner.entries.insert(key, handle);
        handle
    }

    /// Look up a handle without allocating
    pub fn get(&self, key: MarkerChainKey) -> Option<MarkerHandle> {
        self.inner.lock().entries.get(&key).copied()
    }

    /// Drop a single chain's handle
    pub fn invalidate(&self, key: MarkerChainKey) -> Option<MarkerHandle> {
        self.inner.lock().entries.shift_remove(&key)
    }

    /// Drop every handle
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Number of cached chains
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}
