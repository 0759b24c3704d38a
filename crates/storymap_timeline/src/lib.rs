// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline data model for StoryMap.
//!
//! This crate provides the pure data side of the storytelling timeline:
//! - Segments with camera descriptors and content references
//! - Transitions between ordered segment pairs, with style normalization
//! - Route animations with their two scheduling variants
//! - Marker-chain detection for cached marker reuse
//! - Timeline documents (JSON load/save)
//!
//! Everything here is synchronous and side-effect free; the playback engine
//! lives in `storymap_playback`.

pub mod chain;
pub mod error;
pub mod route;
pub mod segment;
pub mod timeline;
pub mod transition;

pub use chain::{detect_chains, MarkerChain, MarkerChainKey};
pub use error::TimelineError;
pub use route::{sort_routes, RouteAnimation, RouteAnimationId, RouteIcon, RouteSchedule};
pub use segment::{Bounds, CameraDescriptor, LngLat, Location, LocationId, Segment, SegmentId, ZoneId};
pub use timeline::{Timeline, TimelineId};
pub use transition::{CameraStyle, Transition, TransitionSet, TransitionStyle};
