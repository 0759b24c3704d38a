// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pure mapping from a resolved transition to render options.

use crate::config::PlaybackConfig;
use crate::gateway::RenderOptions;
use storymap_timeline::{CameraStyle, Transition, TransitionStyle};

/// Resolver for the render options of one segment entry
#[derive(Debug, Clone, Copy)]
pub struct RenderPlan;

impl RenderPlan {
    /// Map an optionally recorded transition to concrete render options.
    ///
    /// With no transition on record: Ease layers over the default fade,
    /// camera jumps. With one: the transition's style and duration, and the
    /// camera animates in its declared style only when the transition asks
    /// for animated camera motion; Jump-style transitions remove old layers
    /// synchronously instead of cross-fading.
    pub fn for_transition(
        transition: Option<&Transition>,
        config: &PlaybackConfig,
    ) -> RenderOptions {
        match transition {
            None => RenderOptions {
                transition_style: TransitionStyle::Ease,
                transition_duration_ms: config.default_layer_fade_ms,
                camera_style: CameraStyle::Jump,
                camera_duration_ms: config.default_camera_duration_ms,
                layer_fade_ms: config.default_layer_fade_ms,
                skip_camera: false,
                suppress_two_phase: false,
            },
            Some(t) => RenderOptions {
                transition_style: t.style,
                transition_duration_ms: t.duration_ms,
                camera_style: if t.animate_camera {
                    t.camera_style
                } else {
                    CameraStyle::Jump
                },
                camera_duration_ms: t
                    .camera_duration_ms
                    .unwrap_or(config.default_camera_duration_ms),
                layer_fade_ms: t.duration_ms,
                skip_camera: false,
                suppress_two_phase: t.style == TransitionStyle::Jump,
            },
        }
    }
}
