// SPDX-License-Identifier: MIT OR Apache-2.0
//! The consumed render boundary.
//!
//! The engine never draws; it hands fully resolved parameters to an
//! implementation of [`RenderGateway`] and absorbs whatever errors come
//! back. Render latency is expected to be non-trivial (geometry parsing),
//! which is why route anchors are captured before any render call.

use crate::error::RenderError;
use crate::marker_cache::MarkerCache;
use storymap_timeline::{Bounds, CameraDescriptor, CameraStyle, Segment, TransitionStyle};

/// Fully resolved options for one segment render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Layer transition style
    pub transition_style: TransitionStyle,
    /// Layer transition duration in milliseconds
    pub transition_duration_ms: u64,
    /// Camera motion style
    pub camera_style: CameraStyle,
    /// Camera motion duration in milliseconds
    pub camera_duration_ms: u64,
    /// Cross-fade duration for outgoing/incoming layers
    pub layer_fade_ms: u64,
    /// Skip all camera motion for this render (routes-only mode)
    pub skip_camera: bool,
    /// Remove old layers synchronously instead of the two-phase cross-fade
    /// (set for Jump-style transitions)
    pub suppress_two_phase: bool,
}

/// Options for a standalone camera or bounds operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraOptions {
    /// Camera motion style
    pub style: CameraStyle,
    /// Motion duration in milliseconds
    pub duration_ms: u64,
}

/// What a render call produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedSegment {
    /// Handles of the layers now on the surface
    pub layer_handles: Vec<String>,
    /// Combined bounds of the rendered content, when any content is bounded
    pub bounds: Option<Bounds>,
}

/// Draws segments onto a map surface.
///
/// All methods are asynchronous and may fail; the engine logs failures and
/// keeps pacing. Implementations must not assume calls arrive in render
/// order — the epoch discipline upstream only guarantees that stale calls
/// are never *started*.
#[async_trait::async_trait]
pub trait RenderGateway: Send + Sync {
    /// Draw a segment's layers. The marker cache is consulted for chained
    /// route markers that survive across segments.
    async fn render_segment(
        &self,
        segment: &Segment,
        options: &RenderOptions,
        markers: &MarkerCache,
    ) -> Result<RenderedSegment, RenderError>;

    /// Move the camera to a target
    async fn apply_camera(
        &self,
        target: &CameraDescriptor,
        options: &CameraOptions,
    ) -> Result<(), RenderError>;

    /// Fit the camera to bounds
    async fn fit_bounds(&self, bounds: &Bounds, options: &CameraOptions)
        -> Result<(), RenderError>;

    /// Cross-fade from the old segment's layers to the new ones
    async fn cross_fade_layers(
        &self,
        old: &RenderedSegment,
        new: &RenderedSegment,
        fade_ms: u64,
    ) -> Result<(), RenderError>;
}
