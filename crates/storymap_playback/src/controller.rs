// SPDX-License-Identifier: MIT OR Apache-2.0
//! The user-facing playback façade.
//!
//! The controller owns a [`SegmentSequencer`] and adds the pieces a host UI
//! needs: lazy transition loading from the data store, id-based entry points
//! for the single-segment and routes-only modes, and status subscription.
//! Every operation is safe to call in any state; out-of-place calls are
//! logged and ignored.

use crate::config::PlaybackConfig;
use crate::gateway::RenderGateway;
use crate::sequencer::SegmentSequencer;
use crate::session::PlaybackStatus;
use crate::store::DataStore;
use parking_lot::Mutex;
use std::sync::Arc;
use storymap_timeline::{SegmentId, Timeline, TransitionSet};
use tokio::sync::watch;

/// Public playback surface: play, pause, stop, resume and the special modes
pub struct PlaybackController {
    sequencer: SegmentSequencer,
    store: Arc<dyn DataStore>,
    transitions_loaded: Mutex<bool>,
}

impl PlaybackController {
    /// Create a controller for a timeline
    pub fn new(
        timeline: Timeline,
        gateway: Arc<dyn RenderGateway>,
        store: Arc<dyn DataStore>,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            sequencer: SegmentSequencer::new(timeline, gateway, store.clone(), config),
            store,
            transitions_loaded: Mutex::new(false),
        }
    }

    /// The sequencer driving this controller
    pub fn sequencer(&self) -> &SegmentSequencer {
        &self.sequencer
    }

    /// Play the timeline from its first segment
    pub async fn play_from_start(&self) {
        self.ensure_transitions().await;
        self.sequencer.start(Some(0)).await;
    }

    /// Play the timeline from a specific segment index
    pub async fn play_from_index(&self, index: usize) {
        self.ensure_transitions().await;
        self.sequencer.start(Some(index)).await;
    }

    /// Resume a paused session, or start from the beginning when idle
    pub async fn resume(&self) {
        self.ensure_transitions().await;
        self.sequencer.start(None).await;
    }

    /// Pause playback in place
    pub fn pause(&self) {
        self.sequencer.pause();
    }

    /// Stop playback and discard session state
    pub fn stop(&self) {
        self.sequencer.stop();
    }

    /// Cross a user-gated segment boundary
    pub async fn continue_after_user_action(&self) {
        self.sequencer.on_user_continue().await;
    }

    /// Play one segment in isolation, returning to the prior position after
    pub async fn play_single_segment(&self, segment_id: SegmentId) {
        match self.sequencer.timeline().index_of(segment_id) {
            Some(index) => self.sequencer.play_single(index).await,
            None => tracing::warn!(segment = ?segment_id, "unknown segment; ignoring"),
        }
    }

    /// Play one segment's route animations with segment camera motion
    /// skipped
    pub async fn play_route_animations_only(&self, segment_id: SegmentId) {
        match self.sequencer.timeline().index_of(segment_id) {
            Some(index) => self.sequencer.play_routes_only(index).await,
            None => tracing::warn!(segment = ?segment_id, "unknown segment; ignoring"),
        }
    }

    /// Current status snapshot
    pub fn status(&self) -> PlaybackStatus {
        self.sequencer.status()
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.sequencer.subscribe()
    }

    /// Load the transition table once per controller. A fetch failure leaves
    /// default transitions in place and retries on the next play.
    async fn ensure_transitions(&self) {
        if *self.transitions_loaded.lock() {
            return;
        }
        let timeline_id = self.sequencer.timeline().id;
        match self.store.fetch_transitions(timeline_id).await {
            Ok(transitions) => {
                let mut set = TransitionSet::new();
                for transition in transitions {
                    if let Err(e) = set.insert(transition) {
                        tracing::warn!("ignoring transition: {e}");
                    }
                }
                tracing::debug!(count = set.len(), "transition table loaded");
                self.sequencer.set_transitions(set);
                *self.transitions_loaded.lock() = true;
            }
            Err(e) => {
                tracing::warn!("transition fetch failed; defaults apply: {e}");
            }
        }
    }
}
