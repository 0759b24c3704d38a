// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ephemeral playback session state.
//!
//! Created on play start, fully reset on stop or a new segment anchor,
//! never persisted. The UI boundary observes it through [`PlaybackStatus`]
//! snapshots on a watch channel.

use parking_lot::Mutex;
use storymap_timeline::{Location, RouteAnimationId, Transition};
use tokio::sync::watch;

/// Where the playback state machine currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    /// Nothing playing
    #[default]
    Idle,
    /// A segment is active and the advance timer is armed
    Playing,
    /// Playback halted with position retained
    Paused,
    /// Halted at a gated boundary until the user continues
    WaitingForUserAction,
}

impl PlaybackPhase {
    /// Check if a segment is actively playing
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackPhase::Playing)
    }

    /// Check if playback is paused
    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackPhase::Paused)
    }

    /// Check if playback is waiting on a user action
    pub fn is_waiting(&self) -> bool {
        matches!(self, PlaybackPhase::WaitingForUserAction)
    }

    /// Check if nothing is in flight
    pub fn is_idle(&self) -> bool {
        matches!(self, PlaybackPhase::Idle)
    }
}

/// Motion state of one route animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutePlayState {
    /// The marker is currently moving
    pub is_playing: bool,
    /// Motion has started at least once this pass
    pub has_started: bool,
    /// Completion effects have fired
    pub has_completed: bool,
}

/// An active arrival-info display
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalInfo {
    /// Route that arrived
    pub route_id: RouteAnimationId,
    /// Looked-up location, when the fetch succeeded
    pub location: Option<Location>,
    /// How long the display stays up before auto-dismissing
    pub display_ms: u64,
}

/// Snapshot of session state for the UI boundary
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackStatus {
    /// Current phase
    pub phase: PlaybackPhase,
    /// Index of the active (or last active) segment
    pub current_index: usize,
    /// Wall-clock anchor of the active segment, unix epoch milliseconds;
    /// drives visual progress indicators
    pub segment_started_at_ms: Option<u64>,
    /// The gating transition, while waiting for a user action
    pub waiting_transition: Option<Transition>,
    /// Per-route play states for the active segment, in engine order
    pub route_states: Vec<RoutePlayState>,
    /// Active arrival-info display, if any
    pub arrival: Option<ArrivalInfo>,
}

/// Mutable session fields, guarded by the session lock
#[derive(Debug, Default)]
pub(crate) struct PlaybackSession {
    pub(crate) phase: PlaybackPhase,
    pub(crate) current_index: usize,
    pub(crate) started_at_ms: Option<u64>,
    pub(crate) waiting: Option<Transition>,
    pub(crate) route_states: Vec<RoutePlayState>,
    pub(crate) arrival: Option<ArrivalInfo>,
    pub(crate) restore_index: Option<usize>,
}

impl PlaybackSession {
    fn snapshot(&self) -> PlaybackStatus {
        PlaybackStatus {
            phase: self.phase,
            current_index: self.current_index,
            segment_started_at_ms: self.started_at_ms,
            waiting_transition: self.waiting.clone(),
            route_states: self.route_states.clone(),
            arrival: self.arrival.clone(),
        }
    }
}

/// Shared session state with change publication
#[derive(Debug)]
pub struct SessionState {
    inner: Mutex<PlaybackSession>,
    tx: watch::Sender<PlaybackStatus>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// Create a fresh idle session
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PlaybackStatus::default());
        Self {
            inner: Mutex::new(PlaybackSession::default()),
            tx,
        }
    }

    /// Mutate the session and publish the resulting snapshot
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut PlaybackSession) -> R) -> R {
        let mut session = self.inner.lock();
        let result = f(&mut session);
        self.tx.send_replace(session.snapshot());
        result
    }

    /// Read without mutating
    pub(crate) fn read<R>(&self, f: impl FnOnce(&PlaybackSession) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Current status snapshot
    pub fn status(&self) -> PlaybackStatus {
        self.inner.lock().snapshot()
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.tx.subscribe()
    }

    /// Full reset to idle at index 0
    pub(crate) fn reset(&self) {
        self.mutate(|session| *session = PlaybackSession::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_helpers() {
        assert!(PlaybackPhase::Idle.is_idle());
        assert!(PlaybackPhase::Playing.is_playing());
        assert!(PlaybackPhase::Paused.is_paused());
        assert!(PlaybackPhase::WaitingForUserAction.is_waiting());
        assert!(!PlaybackPhase::Playing.is_idle());
    }

    #[test]
    fn test_mutate_publishes() {
        let state = SessionState::new();
        let mut rx = state.subscribe();
        state.mutate(|session| {
            session.phase = PlaybackPhase::Playing;
            session.current_index = 3;
        });
        let status = rx.borrow_and_update().clone();
        assert_eq!(status.phase, PlaybackPhase::Playing);
        assert_eq!(status.current_index, 3);
    }

    #[test]
    fn test_reset_clears_everything() {
        let state = SessionState::new();
        state.mutate(|session| {
            session.phase = PlaybackPhase::Playing;
            session.current_index = 2;
            session.route_states = vec![RoutePlayState {
                is_playing: true,
                has_started: true,
                has_completed: false,
            }];
        });
        state.reset();
        let status = state.status();
        assert_eq!(status.phase, PlaybackPhase::Idle);
        assert_eq!(status.current_index, 0);
        assert!(status.route_states.is_empty());
    }
}
