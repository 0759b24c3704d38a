// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline playback and route-animation scheduling engine for StoryMap.
//!
//! This crate decides *when* and *in what order* things happen on a
//! story-map timeline and *what parameters* to hand the rendering boundary.
//! It renders nothing itself.
//!
//! ## Architecture
//!
//! - [`PlaybackController`]: user-facing façade (play/pause/stop and the
//!   special single-segment / routes-only modes)
//! - [`SegmentSequencer`]: advances through segments, computing effective
//!   durations and arming the advance timer
//! - [`RouteAnimationScheduler`]: runs a segment's route animations under
//!   the time-anchored and chained strategies
//! - [`RenderGateway`] / [`DataStore`]: the consumed async boundaries
//!
//! ## Concurrency
//!
//! Single-threaded cooperative concurrency: every component runs correctly
//! on a current-thread tokio runtime. Cancellation is carried by a segment
//! epoch counter; every spawned chain compares its captured epoch before
//! mutating shared state. No operation blocks its caller, and no failure of
//! the render or data boundary ever stalls pacing.

pub mod config;
pub mod controller;
pub mod epoch;
pub mod error;
pub mod gateway;
pub mod marker_cache;
pub mod plan;
pub mod scheduler;
pub mod sequencer;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::PlaybackConfig;
pub use controller::PlaybackController;
pub use epoch::{Epoch, EpochCounter};
pub use error::{RenderError, StoreError};
pub use gateway::{CameraOptions, RenderGateway, RenderOptions, RenderedSegment};
pub use marker_cache::{MarkerCache, MarkerHandle};
pub use plan::RenderPlan;
pub use scheduler::{routes_completion_ms, RouteAnimationScheduler, ScheduleOptions};
pub use sequencer::SegmentSequencer;
pub use session::{ArrivalInfo, PlaybackPhase, PlaybackStatus, RoutePlayState, SessionState};
pub use store::{DataStore, InMemoryStore};
