// SPDX-License-Identifier: MIT OR Apache-2.0
//! Model-level errors.

use crate::segment::SegmentId;

/// Error constructing or loading timeline data
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// A second transition was inserted for an ordered segment pair
    #[error("duplicate transition for pair {from:?} -> {to:?}")]
    DuplicateTransition {
        /// Pair origin
        from: SegmentId,
        /// Pair destination
        to: SegmentId,
    },
    /// A referenced segment does not exist in the timeline
    #[error("unknown segment {0:?}")]
    UnknownSegment(SegmentId),
    /// Malformed JSON document
    #[error("failed to parse timeline document: {0}")]
    Parse(#[from] serde_json::Error),
}
