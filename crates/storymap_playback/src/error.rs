// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine error taxonomy.
//!
//! Nothing here propagates to the playback caller: every failure is
//! absorbed and logged at the point it occurs, and pacing proceeds on
//! schedule. The types exist so the absorption sites log with structure
//! instead of strings.

/// Error from the render boundary
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// No render surface is attached; the render call is skipped
    #[error("no render surface available")]
    SurfaceUnavailable,
    /// A layer failed to draw
    #[error("layer error: {0}")]
    Layer(String),
    /// A camera operation failed
    #[error("camera error: {0}")]
    Camera(String),
}

/// Error from the data boundary
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not serve the request
    #[error("data store error: {0}")]
    Backend(String),
}
