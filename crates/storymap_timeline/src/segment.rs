// SPDX-License-Identifier: MIT OR Apache-2.0
//! Segment definitions and the geographic primitives they reference.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    /// Create a new random segment ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a zone referenced by a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub Uuid);

impl ZoneId {
    /// Create a new random zone ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(pub Uuid);

impl LocationId {
    /// Create a new random location ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LocationId {
    fn default() -> Self {
        Self::new()
    }
}

/// A longitude/latitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    /// Longitude in degrees, [-180, 180]
    pub lng: f64,
    /// Latitude in degrees, [-90, 90]
    pub lat: f64,
}

impl LngLat {
    /// Create a coordinate pair
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Check that both components are finite and within range
    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Approximate equality, used for marker-chain endpoint matching.
    ///
    /// Tolerance is ~1e-6 degrees (roughly 10 cm), well below anything a
    /// route editor would produce as distinct points.
    pub fn approx_eq(&self, other: &LngLat) -> bool {
        (self.lng - other.lng).abs() < 1e-6 && (self.lat - other.lat).abs() < 1e-6
    }
}

/// A geographic bounding box (south-west / north-east corners)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// South-west corner
    pub sw: LngLat,
    /// North-east corner
    pub ne: LngLat,
}

impl Bounds {
    /// Create a bounds pair
    pub fn new(sw: LngLat, ne: LngLat) -> Self {
        Self { sw, ne }
    }

    /// Check corner validity and ordering
    pub fn is_valid(&self) -> bool {
        self.sw.is_valid() && self.ne.is_valid() && self.sw.lat <= self.ne.lat
    }

    /// Grow the bounds to include a point
    pub fn extend(&mut self, point: LngLat) {
        self.sw.lng = self.sw.lng.min(point.lng);
        self.sw.lat = self.sw.lat.min(point.lat);
        self.ne.lng = self.ne.lng.max(point.lng);
        self.ne.lat = self.ne.lat.max(point.lat);
    }
}

/// A camera target: where the map should look
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    /// Map center
    pub center: LngLat,
    /// Zoom level
    pub zoom: f64,
    /// Bearing in degrees, clockwise from north
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    /// Pitch in degrees from the nadir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
}

impl CameraDescriptor {
    /// Create a camera descriptor at a center and zoom
    pub fn new(center: LngLat, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            bearing: None,
            pitch: None,
        }
    }

    /// Check the descriptor is usable: valid center, sane zoom.
    ///
    /// Malformed descriptors are skipped by the playback engine rather than
    /// handed to the render boundary.
    pub fn is_valid(&self) -> bool {
        self.center.is_valid() && self.zoom.is_finite() && (0.0..=24.0).contains(&self.zoom)
    }
}

/// A named point of interest, used for arrival-info display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Unique location ID
    pub id: LocationId,
    /// Display name
    pub name: String,
    /// Optional description shown alongside the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Position on the map
    pub coord: LngLat,
}

impl Location {
    /// Create a location
    pub fn new(name: impl Into<String>, coord: LngLat) -> Self {
        Self {
            id: LocationId::new(),
            name: name.into(),
            description: None,
            coord,
        }
    }
}

/// One ordered stop on the timeline.
///
/// A segment is an immutable snapshot during a play pass: the engine never
/// mutates it, and edits elsewhere only take effect on the next play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Unique segment ID
    pub id: SegmentId,
    /// Segment name
    pub name: String,
    /// Camera position for this segment, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraDescriptor>,
    /// Base display duration in milliseconds, before route extension
    pub base_duration_ms: u64,
    /// Zones shown while this segment is active
    #[serde(default)]
    pub zone_ids: Vec<ZoneId>,
    /// Locations shown while this segment is active
    #[serde(default)]
    pub location_ids: Vec<LocationId>,
    /// Map style layers toggled on for this segment
    #[serde(default)]
    pub layer_ids: Vec<String>,
}

impl Segment {
    /// Create a segment with a name and base duration
    pub fn new(name: impl Into<String>, base_duration_ms: u64) -> Self {
        Self {
            id: SegmentId::new(),
            name: name.into(),
            camera: None,
            base_duration_ms,
            zone_ids: Vec::new(),
            location_ids: Vec::new(),
            layer_ids: Vec::new(),
        }
    }

    /// Set the camera descriptor
    pub fn with_camera(mut self, camera: CameraDescriptor) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Whether the segment carries any content that could produce bounds
    pub fn has_bounded_content(&self) -> bool {
        !self.zone_ids.is_empty() || !self.location_ids.is_empty() || !self.layer_ids.is_empty()
    }
}
