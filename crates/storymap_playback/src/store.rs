// SPDX-License-Identifier: MIT OR Apache-2.0
//! The consumed data boundary.
//!
//! Fetch failures never halt playback: the sequencer treats them as empty
//! results and degrades to plain duration-based pacing.

use crate::error::StoreError;
use parking_lot::Mutex;
use std::collections::HashMap;
use storymap_timeline::{
    Location, LocationId, RouteAnimation, SegmentId, TimelineId, Transition,
};

/// Read access to timeline content the engine does not own
#[async_trait::async_trait]
pub trait DataStore: Send + Sync {
    /// All transitions recorded for a timeline
    async fn fetch_transitions(&self, timeline_id: TimelineId)
        -> Result<Vec<Transition>, StoreError>;

    /// Route animations attached to one segment, in storage order; the
    /// engine sorts them itself
    async fn fetch_route_animations(
        &self,
        timeline_id: TimelineId,
        segment_id: SegmentId,
    ) -> Result<Vec<RouteAnimation>, StoreError>;

    /// Location lookup for arrival-info display
    async fn fetch_location(&self, id: LocationId) -> Result<Option<Location>, StoreError>;
}

#[derive(Debug, Default)]
struct StoreInner {
    transitions: Vec<Transition>,
    routes: HashMap<SegmentId, Vec<RouteAnimation>>,
    locations: HashMap<LocationId, Location>,
}

/// HashMap-backed store for tests, examples and embedded hosts
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a transition
    pub fn add_transition(&self, transition: Transition) {
        self.inner.lock().transitions.push(transition);
    }

    /// Attach a route animation to a segment
    pub fn add_route(&self, segment_id: SegmentId, route: RouteAnimation) {
        self.inner.lock().routes.entry(segment_id).or_default().push(route);
    }

    /// Register a location
    pub fn add_location(&self, location: Location) {
        self.inner.lock().locations.insert(location.id, location);
    }
}

#[async_trait::async_trait]
impl DataStore for InMemoryStore {
    async fn fetch_transitions(
        &self,
        _timeline_id: TimelineId,
    ) -> Result<Vec<Transition>, StoreError> {
        Ok(self.inner.lock().transitions.clone())
    }

    async fn fetch_route_animations(
        &self,
        _timeline_id: TimelineId,
        segment_id: SegmentId,
    ) -> Result<Vec<RouteAnimation>, StoreError> {
        Ok(self
            .inner
            .lock()
            .routes
            .get(&segment_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_location(&self, id: LocationId) -> Result<Option<Location>, StoreError> {
        Ok(self.inner.lock().locations.get(&id).cloned())
    }
}
