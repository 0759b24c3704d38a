// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transitions between ordered segment pairs.
//!
//! Style strings arrive free-form from editors and imports; this module
//! normalizes them case-insensitively into closed enumerations and holds
//! the at-most-one-per-ordered-pair transition table.

use crate::error::TimelineError;
use crate::segment::SegmentId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How the view moves between two segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionStyle {
    /// Cut with no interpolation
    Jump,
    /// Constant-rate interpolation
    Linear,
    /// Symmetric ease
    #[default]
    Ease,
    /// Ease on the way in
    EaseIn,
    /// Ease on the way out
    EaseOut,
    /// Ease at both ends
    EaseInOut,
}

impl TransitionStyle {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Jump => "Jump",
            Self::Linear => "Linear",
            Self::Ease => "Ease",
            Self::EaseIn => "EaseIn",
            Self::EaseOut => "EaseOut",
            Self::EaseInOut => "EaseInOut",
        }
    }

    /// Parse a free-form style string, case-insensitively.
    ///
    /// Accepts the bare names plus dashed and underscored spellings
    /// ("ease-in-out", "ease_in_out", "EaseInOut").
    pub fn parse(s: &str) -> Option<Self> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "jump" => Some(Self::Jump),
            "linear" => Some(Self::Linear),
            "ease" => Some(Self::Ease),
            "easein" => Some(Self::EaseIn),
            "easeout" => Some(Self::EaseOut),
            "easeinout" => Some(Self::EaseInOut),
            _ => None,
        }
    }

    /// Parse with an explicit fallback for unrecognized input.
    ///
    /// Document loads fall back to [`TransitionStyle::Ease`]; programmatic
    /// builders fall back to [`TransitionStyle::Linear`].
    pub fn parse_or(s: &str, fallback: Self) -> Self {
        Self::parse(s).unwrap_or(fallback)
    }
}

/// How the camera itself travels during a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CameraStyle {
    /// Teleport instantly
    Jump,
    /// Eased pan/zoom
    Ease,
    /// Flight arc (zoom out, travel, zoom in)
    #[default]
    Fly,
}

impl CameraStyle {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Jump => "Jump",
            Self::Ease => "Ease",
            Self::Fly => "Fly",
        }
    }

    /// Parse a free-form style string, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jump" => Some(Self::Jump),
            "ease" => Some(Self::Ease),
            "fly" => Some(Self::Fly),
            _ => None,
        }
    }

    /// Parse, falling back to [`CameraStyle::Fly`] for unrecognized input
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Fly)
    }
}

/// The rule for moving from one segment to the next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Segment the transition leaves
    pub from: SegmentId,
    /// Segment the transition enters
    pub to: SegmentId,
    /// Layer transition style
    #[serde(default)]
    pub style: TransitionStyle,
    /// Layer transition duration in milliseconds
    pub duration_ms: u64,
    /// Whether camera motion is animated at all
    #[serde(default)]
    pub animate_camera: bool,
    /// Camera motion style, used only when `animate_camera` is set
    #[serde(default)]
    pub camera_style: CameraStyle,
    /// Camera motion duration in milliseconds; the engine default applies
    /// when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_duration_ms: Option<u64>,
    /// Whether playback must wait for an explicit user action at this
    /// boundary
    #[serde(default)]
    pub require_user_action: bool,
    /// Label shown on the user-action trigger, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_label: Option<String>,
}

impl Transition {
    /// Create a transition between two segments with defaults
    pub fn new(from: SegmentId, to: SegmentId) -> Self {
        Self {
            from,
            to,
            style: TransitionStyle::default(),
            duration_ms: 1000,
            animate_camera: false,
            camera_style: CameraStyle::default(),
            camera_duration_ms: None,
            require_user_action: false,
            trigger_label: None,
        }
    }

    /// Set the layer transition style
    pub fn with_style(mut self, style: TransitionStyle) -> Self {
        self.style = style;
        self
    }

    /// Enable animated camera motion with a style
    pub fn with_camera(mut self, style: CameraStyle, duration_ms: Option<u64>) -> Self {
        self.animate_camera = true;
        self.camera_style = style;
        self.camera_duration_ms = duration_ms;
        self
    }

    /// Require a user action before playback crosses this boundary
    pub fn with_user_gate(mut self, label: impl Into<String>) -> Self {
        self.require_user_action = true;
        self.trigger_label = Some(label.into());
        self
    }
}

/// Lookup table of transitions, keyed by the ordered (from, to) pair.
///
/// Resolution is a pure lookup with no side effects; a set is safe to
/// memoize for as long as its identity is unchanged.
#[derive(Debug, Clone, Default)]
pub struct TransitionSet {
    by_pair: IndexMap<(SegmentId, SegmentId), Transition>,
}

impl TransitionSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            by_pair: IndexMap::new(),
        }
    }

    /// Build a set from a list, rejecting duplicate ordered pairs
    pub fn from_transitions(
        transitions: impl IntoIterator<Item = Transition>,
    ) -> Result<Self, TimelineError> {
        let mut set = Self::new();
        for transition in transitions {
            set.insert(transition)?;
        }
        Ok(set)
    }

    /// Insert a transition.
    ///
    /// At most one transition may exist per ordered pair; a second insert
    /// for the same pair is rejected.
    pub fn insert(&mut self, transition: Transition) -> Result<(), TimelineError> {
        let key = (transition.from, transition.to);
        if self.by_pair.contains_key(&key) {
            return Err(TimelineError::DuplicateTransition {
                from: transition.from,
                to: transition.to,
            });
        }
        self.by_pair.insert(key, transition);
        Ok(())
    }

    /// Resolve the transition governing movement into `to`.
    ///
    /// Returns none for the first segment (`from` is none) or when no rule
    /// was recorded for the pair.
    pub fn resolve(&self, from: Option<SegmentId>, to: SegmentId) -> Option<&Transition> {
        let from = from?;
        self.by_pair.get(&(from, to))
    }

    /// Number of transitions in the set
    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }

    /// Iterate transitions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.by_pair.values()
    }
}
