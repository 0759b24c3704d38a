// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline documents: an ordered list of segments with JSON load/save.

use crate::error::TimelineError;
use crate::segment::{Segment, SegmentId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimelineId(pub Uuid);

impl TimelineId {
    /// Create a new random timeline ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimelineId {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered sequence of segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Unique timeline ID
    pub id: TimelineId,
    /// Timeline name
    pub name: String,
    /// Segments in playback order
    pub segments: Vec<Segment>,
}

impl Timeline {
    /// Create an empty timeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TimelineId::new(),
            name: name.into(),
            segments: Vec::new(),
        }
    }

    /// Append a segment
    pub fn push_segment(&mut self, segment: Segment) -> SegmentId {
        let id = segment.id;
        self.segments.push(segment);
        id
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the timeline has no segments
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment at a playback index
    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Playback index of a segment
    pub fn index_of(&self, id: SegmentId) -> Option<usize> {
        self.segments.iter().position(|s| s.id == id)
    }

    /// Load a timeline from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, TimelineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the timeline to pretty JSON
    pub fn to_json_string(&self) -> Result<String, TimelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_of() {
        let mut timeline = Timeline::new("Tour");
        let a = timeline.push_segment(Segment::new("A", 5000));
        let b = timeline.push_segment(Segment::new("B", 5000));
        assert_eq!(timeline.index_of(a), Some(0));
        assert_eq!(timeline.index_of(b), Some(1));
        assert_eq!(timeline.index_of(SegmentId::new()), None);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut timeline = Timeline::new("Tour");
        timeline.push_segment(Segment::new("A", 5000));
        let json = timeline.to_json_string().unwrap();
        let back = Timeline::from_json_str(&json).unwrap();
        assert_eq!(timeline, back);
    }

    #[test]
    fn test_malformed_document() {
        assert!(Timeline::from_json_str("{not json").is_err());
    }
}
