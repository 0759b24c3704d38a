// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine configuration.

use serde::Deserialize;

/// Tunable timings for the playback engine.
///
/// The defaults are the documented engine behavior; configuration exists for
/// hosts that need different pacing (kiosks, tests, embeds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaybackConfig {
    /// Minimum displayed duration of any segment, in milliseconds
    pub min_segment_duration_ms: u64,
    /// Camera motion duration when a transition does not declare one
    pub default_camera_duration_ms: u64,
    /// Layer cross-fade duration when no transition is on record
    pub default_layer_fade_ms: u64,
    /// Tick interval of the time-anchored route poll
    pub poll_interval_ms: u64,
    /// Settle pause between chained routes when no arrival display runs
    pub chain_settle_ms: u64,
    /// Delay before the sequencer applies its own camera, yielding to any
    /// route camera fired at the same instant
    pub camera_settle_ms: u64,
    /// Anchors closer than this are considered the same scheduling pass
    pub anchor_tolerance_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            min_segment_duration_ms: 5000,
            default_camera_duration_ms: 1500,
            default_layer_fade_ms: 800,
            poll_interval_ms: 100,
            chain_settle_ms: 500,
            camera_settle_ms: 100,
            anchor_tolerance_ms: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.min_segment_duration_ms, 5000);
        assert_eq!(config.default_camera_duration_ms, 1500);
        assert_eq!(config.default_layer_fade_ms, 800);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.chain_settle_ms, 500);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: PlaybackConfig =
            serde_json::from_str(r#"{"minSegmentDurationMs": 2000}"#).unwrap();
        assert_eq!(config.min_segment_duration_ms, 2000);
        assert_eq!(config.poll_interval_ms, 100);
    }
}
