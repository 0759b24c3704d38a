// SPDX-License-Identifier: MIT OR Apache-2.0
//! Segment-epoch cancellation.
//!
//! Every reset (segment change, stop, pause, scheduler re-anchor) advances
//! a single shared counter. Async chains capture the epoch at spawn and
//! compare it before each state-mutating step; a stale chain abandons
//! itself instead of touching shared state. This replaces per-task boolean
//! cancellation flags with one token that cannot be forgotten.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A captured epoch value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

/// Shared epoch counter
#[derive(Debug, Clone, Default)]
pub struct EpochCounter {
    value: Arc<AtomicU64>,
}

impl EpochCounter {
    /// Create a counter at epoch zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the current epoch
    pub fn current(&self) -> Epoch {
        Epoch(self.value.load(Ordering::SeqCst))
    }

    /// Invalidate every outstanding epoch and return the new one
    pub fn advance(&self) -> Epoch {
        Epoch(self.value.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether a captured epoch is still the live one
    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.current() == epoch
    }
}
