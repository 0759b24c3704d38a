// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared fixtures for engine tests: a recording render gateway, a failing
//! data store, and virtual-clock helpers.

use crate::error::{RenderError, StoreError};
use crate::gateway::{CameraOptions, RenderGateway, RenderOptions, RenderedSegment};
use crate::marker_cache::MarkerCache;
use crate::store::DataStore;
use parking_lot::Mutex;
use storymap_timeline::{
    Bounds, CameraDescriptor, LngLat, Location, LocationId, RouteAnimation, RouteSchedule,
    Segment, SegmentId, TimelineId, Transition,
};
use tokio::time::{Duration, Instant};

/// One recorded gateway call, tagged with virtual elapsed milliseconds
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GatewayCall {
    Render {
        segment: String,
        skip_camera: bool,
        suppress_two_phase: bool,
    },
    Camera {
        zoom: f64,
    },
    FitBounds,
    CrossFade {
        fade_ms: u64,
    },
}

/// Render gateway that records calls against a virtual clock
pub(crate) struct RecordingGateway {
    started: Instant,
    render_latency: Duration,
    fail_renders: bool,
    calls: Mutex<Vec<(u64, GatewayCall)>>,
}

impl RecordingGateway {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            render_latency: Duration::ZERO,
            fail_renders: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_render_latency(mut self, ms: u64) -> Self {
        self.render_latency = Duration::from_millis(ms);
        self
    }

    pub(crate) fn failing_renders(mut self) -> Self {
        self.fail_renders = true;
        self
    }

    fn record(&self, call: GatewayCall) {
        let at_ms = Instant::now().duration_since(self.started).as_millis() as u64;
        self.calls.lock().push((at_ms, call));
    }

    pub(crate) fn calls(&self) -> Vec<(u64, GatewayCall)> {
        self.calls.lock().clone()
    }

    pub(crate) fn camera_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(_, c)| matches!(c, GatewayCall::Camera { .. }))
            .count()
    }

    pub(crate) fn cross_fade_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(_, c)| matches!(c, GatewayCall::CrossFade { .. }))
            .count()
    }

    pub(crate) fn render_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(_, c)| matches!(c, GatewayCall::Render { .. }))
            .count()
    }
}

#[async_trait::async_trait]
impl RenderGateway for RecordingGateway {
    async fn render_segment(
        &self,
        segment: &Segment,
        options: &RenderOptions,
        _markers: &MarkerCache,
    ) -> Result<RenderedSegment, RenderError> {
        if !self.render_latency.is_zero() {
            tokio::time::sleep(self.render_latency).await;
        }
        if self.fail_renders {
            return Err(RenderError::Layer("synthetic failure".into()));
        }
        self.record(GatewayCall::Render {
            segment: segment.name.clone(),
            skip_camera: options.skip_camera,
            suppress_two_phase: options.suppress_two_phase,
        });
        let bounds = segment.has_bounded_content().then(|| {
            Bounds::new(LngLat::new(0.0, 0.0), LngLat::new(1.0, 1.0))
        });
        Ok(RenderedSegment {
            layer_handles: vec![segment.name.clone()],
            bounds,
        })
    }

    async fn apply_camera(
        &self,
        target: &CameraDescriptor,
        _options: &CameraOptions,
    ) -> Result<(), RenderError> {
        self.record(GatewayCall::Camera { zoom: target.zoom });
        Ok(())
    }

    async fn fit_bounds(
        &self,
        _bounds: &Bounds,
        _options: &CameraOptions,
    ) -> Result<(), RenderError> {
        self.record(GatewayCall::FitBounds);
        Ok(())
    }

    async fn cross_fade_layers(
        &self,
        _old: &RenderedSegment,
        _new: &RenderedSegment,
        fade_ms: u64,
    ) -> Result<(), RenderError> {
        self.record(GatewayCall::CrossFade { fade_ms });
        Ok(())
    }
}

/// Data store where every fetch fails
pub(crate) struct FailingStore;

#[async_trait::async_trait]
impl DataStore for FailingStore {
    async fn fetch_transitions(
        &self,
        _timeline_id: TimelineId,
    ) -> Result<Vec<Transition>, StoreError> {
        Err(StoreError::Backend("unreachable".into()))
    }

    async fn fetch_route_animations(
        &self,
        _timeline_id: TimelineId,
        _segment_id: SegmentId,
    ) -> Result<Vec<RouteAnimation>, StoreError> {
        Err(StoreError::Backend("unreachable".into()))
    }

    async fn fetch_location(&self, _id: LocationId) -> Result<Option<Location>, StoreError> {
        Err(StoreError::Backend("unreachable".into()))
    }
}

/// Time-anchored route helper
pub(crate) fn anchored(start_ms: u64, duration_ms: u64) -> RouteAnimation {
    RouteAnimation::new(
        LngLat::new(0.0, 0.0),
        LngLat::new(1.0, 1.0),
        duration_ms,
        RouteSchedule::TimeAnchored {
            start_ms,
            end_ms: None,
        },
    )
}

/// Chained route helper
pub(crate) fn chained(duration_ms: u64) -> RouteAnimation {
    RouteAnimation::new(
        LngLat::new(0.0, 0.0),
        LngLat::new(1.0, 1.0),
        duration_ms,
        RouteSchedule::Chained { start_delay_ms: 0 },
    )
}

/// A camera descriptor used for route pre/post cameras in tests
pub(crate) fn camera(zoom: f64) -> CameraDescriptor {
    CameraDescriptor::new(LngLat::new(2.35, 48.85), zoom)
}

/// Let spawned tasks run after a virtual-clock step
pub(crate) async fn settle_tasks() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock and let tasks observe it
pub(crate) async fn step_ms(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle_tasks().await;
}
