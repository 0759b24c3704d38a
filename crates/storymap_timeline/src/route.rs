// SPDX-License-Identifier: MIT OR Apache-2.0
//! Route animations: markers moving along a path, attached to a segment.
//!
//! Each route is scheduled by exactly one of two strategies, chosen by its
//! schedule variant: anchored to an explicit offset from the segment start,
//! or chained one-after-another in display order. The wire format expresses
//! that choice as `startTimeMs` nullability; deserialization folds it into
//! the [`RouteSchedule`] enum so the engine never null-checks.

use crate::segment::{CameraDescriptor, LngLat, LocationId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a route animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteAnimationId(pub Uuid);

impl RouteAnimationId {
    /// Create a new random route animation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RouteAnimationId {
    fn default() -> Self {
        Self::new()
    }
}

/// Marker icon drawn for a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteIcon {
    /// Walking figure
    Walk,
    /// Bicycle
    Bike,
    /// Car
    Car,
    /// Bus
    Bus,
    /// Train
    Train,
    /// Boat
    Boat,
    /// Airplane
    Plane,
    /// Plain marker pin
    #[default]
    Marker,
}

impl RouteIcon {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Walk => "Walk",
            Self::Bike => "Bike",
            Self::Car => "Car",
            Self::Bus => "Bus",
            Self::Train => "Train",
            Self::Boat => "Boat",
            Self::Plane => "Plane",
            Self::Marker => "Marker",
        }
    }
}

/// How a route's timing is derived.
///
/// The two variants are mutually exclusive per route and may freely mix
/// within one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSchedule {
    /// Timing is relative to the segment-start anchor
    TimeAnchored {
        /// Offset from the anchor at which motion starts
        start_ms: u64,
        /// Optional explicit activity end; completion effects are postponed
        /// until this offset when it exceeds `start_ms + duration_ms`
        end_ms: Option<u64>,
    },
    /// Executed strictly after the previous chained route finishes
    Chained {
        /// Delay before motion starts, once this route's turn arrives
        start_delay_ms: u64,
    },
}

impl RouteSchedule {
    /// Whether this is the time-anchored variant
    pub fn is_time_anchored(&self) -> bool {
        matches!(self, Self::TimeAnchored { .. })
    }

    /// Explicit start offset, when one exists
    pub fn start_hint(&self) -> Option<u64> {
        match self {
            Self::TimeAnchored { start_ms, .. } => Some(*start_ms),
            Self::Chained { .. } => None,
        }
    }
}

/// A moving-marker animation on a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRouteAnimation", into = "RawRouteAnimation")]
pub struct RouteAnimation {
    /// Unique route animation ID
    pub id: RouteAnimationId,
    /// Path start coordinate
    pub from: LngLat,
    /// Path end coordinate
    pub to: LngLat,
    /// Marker icon
    pub icon: RouteIcon,
    /// Motion duration in milliseconds
    pub duration_ms: u64,
    /// Scheduling variant
    pub schedule: RouteSchedule,
    /// Ordering key within the segment
    pub display_order: u32,
    /// Whether the route runs during automatic playback
    pub auto_play: bool,
    /// Camera applied once when motion starts
    pub pre_camera: Option<CameraDescriptor>,
    /// Camera applied once when the route completes
    pub post_camera: Option<CameraDescriptor>,
    /// Location looked up for the arrival-info display
    pub arrival_location_id: Option<LocationId>,
    /// How long the arrival-info display stays up
    pub arrival_display_ms: Option<u64>,
}

impl RouteAnimation {
    /// Create a route with a schedule, defaulting to auto-play
    pub fn new(from: LngLat, to: LngLat, duration_ms: u64, schedule: RouteSchedule) -> Self {
        Self {
            id: RouteAnimationId::new(),
            from,
            to,
            icon: RouteIcon::default(),
            duration_ms,
            schedule,
            display_order: 0,
            auto_play: true,
            pre_camera: None,
            post_camera: None,
            arrival_location_id: None,
            arrival_display_ms: None,
        }
    }

    /// Set the marker icon
    pub fn with_icon(mut self, icon: RouteIcon) -> Self {
        self.icon = icon;
        self
    }

    /// Set the ordering key
    pub fn with_display_order(mut self, order: u32) -> Self {
        self.display_order = order;
        self
    }

    /// Whether the path endpoints are usable: valid, distinct coordinates
    pub fn has_valid_geometry(&self) -> bool {
        self.from.is_valid() && self.to.is_valid() && !self.from.approx_eq(&self.to)
    }

    /// For time-anchored routes, the offset at which completion effects
    /// fire: `max(start + duration, end)`. None for chained routes.
    pub fn completion_ms(&self) -> Option<u64> {
        match self.schedule {
            RouteSchedule::TimeAnchored { start_ms, end_ms } => {
                let natural = start_ms.saturating_add(self.duration_ms);
                Some(natural.max(end_ms.unwrap_or(0)))
            }
            RouteSchedule::Chained { .. } => None,
        }
    }

    /// Wall time one chained route occupies: start delay, motion, then a
    /// settle pause (the arrival display duration when one is configured).
    pub fn chained_slot_ms(&self, default_settle_ms: u64) -> u64 {
        match self.schedule {
            RouteSchedule::Chained { start_delay_ms } => {
                let settle = self.arrival_display_ms.unwrap_or(default_settle_ms);
                start_delay_ms + self.duration_ms + settle
            }
            RouteSchedule::TimeAnchored { .. } => 0,
        }
    }
}

/// Sort routes the way the engine consumes them: ascending display order,
/// ties broken by explicit start time, then by original position.
pub fn sort_routes(routes: &mut [RouteAnimation]) {
    routes.sort_by(|a, b| {
        a.display_order.cmp(&b.display_order).then_with(|| {
            let a_start = a.schedule.start_hint().unwrap_or(u64::MAX);
            let b_start = b.schedule.start_hint().unwrap_or(u64::MAX);
            a_start.cmp(&b_start)
        })
    });
}

/// Wire shape of a route animation.
///
/// `start_time_ms` nullability selects the scheduling variant: null means
/// chained, any number (including 0) means time-anchored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRouteAnimation {
    id: RouteAnimationId,
    from: LngLat,
    to: LngLat,
    #[serde(default)]
    icon: RouteIcon,
    duration_ms: u64,
    #[serde(default)]
    start_time_ms: Option<u64>,
    #[serde(default)]
    end_time_ms: Option<u64>,
    #[serde(default)]
    start_delay_ms: Option<u64>,
    #[serde(default)]
    display_order: u32,
    #[serde(default = "default_true")]
    auto_play: bool,
    #[serde(default)]
    pre_camera: Option<CameraDescriptor>,
    #[serde(default)]
    post_camera: Option<CameraDescriptor>,
    #[serde(default)]
    arrival_location_id: Option<LocationId>,
    #[serde(default)]
    arrival_display_ms: Option<u64>,
}

fn default_true() -> bool {
    true
}

impl From<RawRouteAnimation> for RouteAnimation {
    fn from(raw: RawRouteAnimation) -> Self {
        let schedule = match raw.start_time_ms {
            Some(start_ms) => RouteSchedule::TimeAnchored {
                start_ms,
                end_ms: raw.end_time_ms,
            },
            None => RouteSchedule::Chained {
                start_delay_ms: raw.start_delay_ms.unwrap_or(0),
            },
        };
        Self {
            id: raw.id,
            from: raw.from,
            to: raw.to,
            icon: raw.icon,
            duration_ms: raw.duration_ms,
            schedule,
            display_order: raw.display_order,
            auto_play: raw.auto_play,
            pre_camera: raw.pre_camera,
            post_camera: raw.post_camera,
            arrival_location_id: raw.arrival_location_id,
            arrival_display_ms: raw.arrival_display_ms,
        }
    }
}

impl From<RouteAnimation> for RawRouteAnimation {
    fn from(route: RouteAnimation) -> Self {
        let (start_time_ms, end_time_ms, start_delay_ms) = match route.schedule {
            RouteSchedule::TimeAnchored { start_ms, end_ms } => (Some(start_ms), end_ms, None),
            RouteSchedule::Chained { start_delay_ms } => (None, None, Some(start_delay_ms)),
        };
        Self {
            id: route.id,
            from: route.from,
            to: route.to,
            icon: route.icon,
            duration_ms: route.duration_ms,
            start_time_ms,
            end_time_ms,
            start_delay_ms,
            display_order: route.display_order,
            auto_play: route.auto_play,
            pre_camera: route.pre_camera,
            post_camera: route.post_camera,
            arrival_location_id: route.arrival_location_id,
            arrival_display_ms: route.arrival_display_ms,
        }
    }
}
