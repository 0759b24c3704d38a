// SPDX-License-Identifier: MIT OR Apache-2.0
//! Route-animation scheduling.
//!
//! A segment's routes run under two strategies, dispatched per route on the
//! [`RouteSchedule`] variant:
//!
//! - **Time-anchored** routes are evaluated by a fixed-interval poll against
//!   the segment-start anchor, each through the machine
//!   NotStarted → Started → Stopped → Completed. A route stays active
//!   (postponing completion effects) until `max(start + duration, end)`.
//! - **Chained** routes execute strictly one at a time in engine order,
//!   each occupying start-delay + motion + settle.
//!
//! Both strategies run concurrently within one segment. Scheduling is
//! idempotent per anchor: a re-invocation at the same anchor (within the
//! configured tolerance) keeps the pass already in flight — or revives its
//! tasks under the live epoch when the caller's own epoch bump cancelled
//! them — so re-renders never double-fire camera or arrival side effects.
//! A materially different anchor cancels everything via the epoch counter
//! and starts over.

use crate::config::PlaybackConfig;
use crate::epoch::{Epoch, EpochCounter};
use crate::gateway::{CameraOptions, RenderGateway};
use crate::session::{ArrivalInfo, RoutePlayState, SessionState};
use crate::store::DataStore;
use parking_lot::Mutex;
use std::sync::Arc;
use storymap_timeline::{
    sort_routes, CameraDescriptor, CameraStyle, LocationId, RouteAnimation, RouteAnimationId,
    RouteSchedule,
};
use tokio::time::{Duration, Instant};

/// Caller knobs for one scheduling pass
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleOptions {
    /// Skip route post-cameras; set when the next segment will immediately
    /// override the camera anyway
    pub suppress_post_camera: bool,
}

/// Wall time needed for every eligible route in the slice to finish.
///
/// Time-anchored routes contribute their completion offset; chained routes
/// contribute cumulative slots. The two strategies run concurrently, so the
/// result is the max of the two, and `auto_play = false` or degenerate
/// routes contribute nothing.
pub fn routes_completion_ms(routes: &[RouteAnimation], config: &PlaybackConfig) -> u64 {
    let mut anchored_max: u64 = 0;
    let mut chained_total: u64 = 0;
    for route in routes {
        if !route.auto_play || !route.has_valid_geometry() {
            continue;
        }
        match route.schedule {
            RouteSchedule::TimeAnchored { .. } => {
                anchored_max = anchored_max.max(route.completion_ms().unwrap_or(0));
            }
            RouteSchedule::Chained { .. } => {
                chained_total += route.chained_slot_ms(config.chain_settle_ms);
            }
        }
    }
    anchored_max.max(chained_total)
}

/// Per-route position in the route machine. Variant order is the machine
/// order, so phase guards can compare with `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RoutePhase {
    NotStarted,
    Started,
    Stopped,
    Completed,
}

#[derive(Debug)]
struct ScheduleState {
    anchor: Instant,
    epoch: Epoch,
    routes: Vec<RouteAnimation>,
    phases: Vec<RoutePhase>,
    suppress_post_camera: bool,
}

/// A camera or arrival side effect collected under the state lock and
/// executed after it is released
#[derive(Debug)]
enum SideEffect {
    Camera(CameraDescriptor),
    Arrival {
        route_id: RouteAnimationId,
        location_id: Option<LocationId>,
        display_ms: u64,
    },
}

struct SchedulerInner {
    gateway: Arc<dyn RenderGateway>,
    store: Arc<dyn DataStore>,
    session: Arc<SessionState>,
    epoch: EpochCounter,
    config: PlaybackConfig,
    state: Mutex<Option<ScheduleState>>,
}

/// Runs a segment's route animations to completion
#[derive(Clone)]
pub struct RouteAnimationScheduler {
    inner: Arc<SchedulerInner>,
}

impl RouteAnimationScheduler {
    /// Create a scheduler sharing the session, epoch and boundaries with
    /// its sequencer
    pub fn new(
        gateway: Arc<dyn RenderGateway>,
        store: Arc<dyn DataStore>,
        session: Arc<SessionState>,
        epoch: EpochCounter,
        config: PlaybackConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                gateway,
                store,
                session,
                epoch,
                config,
                state: Mutex::new(None),
            }),
        }
    }

    /// Start (or keep) a scheduling pass for a segment's routes.
    ///
    /// Returns immediately; the pass runs on spawned tasks. Idempotent for
    /// the same anchor within the configured tolerance.
    pub fn schedule(&self, mut routes: Vec<RouteAnimation>, anchor: Instant, options: ScheduleOptions) {
        let tolerance = Duration::from_millis(self.inner.config.anchor_tolerance_ms);
        let epoch;
        let chained_indices: Vec<usize>;
        let has_anchored: bool;
        {
            let mut state = self.inner.state.lock();
            if let Some(existing) = state.as_mut() {
                let drift = if anchor >= existing.anchor {
                    anchor - existing.anchor
                } else {
                    existing.anchor - anchor
                };
                if drift <= tolerance {
                    if self.inner.epoch.is_current(existing.epoch) {
                        tracing::debug!("schedule re-invoked at the same anchor; keeping pass");
                        return;
                    }
                    // Same anchor, but the caller bumped the epoch before
                    // re-invoking (a same-instant re-render) and that killed
                    // the running tasks. Revive them under the live epoch
                    // with the per-route state kept: nothing restarts and no
                    // side effect double-fires.
                    let revived = self.inner.epoch.current();
                    existing.epoch = revived;
                    let anchor = existing.anchor;
                    let resume_anchored = existing
                        .routes
                        .iter()
                        .zip(&existing.phases)
                        .any(|(r, p)| r.schedule.is_time_anchored() && *p != RoutePhase::Completed);
                    let chain: Vec<usize> = existing
                        .routes
                        .iter()
                        .enumerate()
                        .filter(|(_, r)| {
                            !r.schedule.is_time_anchored() && r.auto_play && r.has_valid_geometry()
                        })
                        .map(|(index, _)| index)
                        .collect();
                    let resume_chain = chain
                        .iter()
                        .any(|&index| existing.phases[index] != RoutePhase::Completed);
                    drop(state);
                    tracing::debug!("same anchor after cancellation; reviving pass");
                    if resume_anchored {
                        let this = self.clone();
                        tokio::spawn(async move {
                            this.poll_loop(revived, anchor).await;
                        });
                    }
                    if resume_chain {
                        let this = self.clone();
                        tokio::spawn(async move {
                            this.chain_loop(revived, anchor, chain).await;
                        });
                    }
                    return;
                }
            }
            // New anchor: cancel whatever was in flight and rebuild.
            epoch = self.inner.epoch.advance();
            sort_routes(&mut routes);

            let mut phases = vec![RoutePhase::NotStarted; routes.len()];
            let mut states = vec![RoutePlayState::default(); routes.len()];
            for (index, route) in routes.iter().enumerate() {
                if !route.auto_play {
                    phases[index] = RoutePhase::Completed;
                    states[index].has_completed = true;
                } else if !route.has_valid_geometry() {
                    tracing::warn!(
                        route = ?route.id,
                        "route has degenerate geometry; skipping"
                    );
                    phases[index] = RoutePhase::Completed;
                    states[index].has_completed = true;
                }
            }
            has_anchored = routes
                .iter()
                .zip(&phases)
                .any(|(r, p)| *p == RoutePhase::NotStarted && r.schedule.is_time_anchored());
            chained_indices = routes
                .iter()
                .zip(&phases)
                .enumerate()
                .filter(|(_, (r, p))| {
                    **p == RoutePhase::NotStarted && !r.schedule.is_time_anchored()
                })
                .map(|(index, _)| index)
                .collect();

            self.inner.session.mutate(|session| {
                session.route_states = states;
                session.arrival = None;
            });
            *state = Some(ScheduleState {
                anchor,
                epoch,
                routes,
                phases,
                suppress_post_camera: options.suppress_post_camera,
            });
        }

        if has_anchored {
            let this = self.clone();
            tokio::spawn(async move {
                this.poll_loop(epoch, anchor).await;
            });
        }
        if !chained_indices.is_empty() {
            let this = self.clone();
            tokio::spawn(async move {
                this.chain_loop(epoch, anchor, chained_indices).await;
            });
        }
    }

    /// Read-only query of one route's motion state
    pub fn play_state(&self, route_index: usize) -> RoutePlayState {
        self.inner
            .session
            .read(|session| session.route_states.get(route_index).copied())
            .unwrap_or_default()
    }

    /// Cancel the pass and clear all per-route state
    pub fn reset(&self) {
        self.inner.epoch.advance();
        *self.inner.state.lock() = None;
        self.inner.session.mutate(|session| {
            session.route_states.clear();
            session.arrival = None;
        });
    }

    /// Cancel the pass but keep the per-route states frozen (pause).
    /// Any moving marker is reported as stopped.
    pub(crate) fn halt(&self) {
        *self.inner.state.lock() = None;
        self.inner.session.mutate(|session| {
            for state in &mut session.route_states {
                state.is_playing = false;
            }
            session.arrival = None;
        });
    }

    // ---- time-anchored strategy -------------------------------------------

    async fn poll_loop(&self, epoch: Epoch, anchor: Instant) {
        let period = Duration::from_millis(self.inner.config.poll_interval_ms.max(1));
        let mut interval = tokio::time::interval_at(anchor, period);
        loop {
            interval.tick().await;
            if !self.inner.epoch.is_current(epoch) {
                return;
            }
            let elapsed_ms = Instant::now().duration_since(anchor).as_millis() as u64;
            let (effects, all_completed) = self.evaluate_anchored(elapsed_ms);
            for effect in effects {
                self.spawn_effect(effect, epoch);
            }
            if all_completed {
                tracing::debug!("all time-anchored routes completed; poll stops");
                return;
            }
        }
    }

    /// Advance the machine for every time-anchored route. Returns the side
    /// effects to run and whether the poll is finished.
    fn evaluate_anchored(&self, elapsed_ms: u64) -> (Vec<SideEffect>, bool) {
        let mut effects = Vec::new();
        let mut marks: Vec<(usize, RoutePhase)> = Vec::new();
        let mut all_completed = true;

        let mut guard = self.inner.state.lock();
        let Some(state) = guard.as_mut() else {
            return (effects, true);
        };
        let suppress_post = state.suppress_post_camera;
        let settle_default = self.inner.config.chain_settle_ms;

        for (index, route) in state.routes.iter().enumerate() {
            let RouteSchedule::TimeAnchored { start_ms, .. } = route.schedule else {
                continue;
            };
            let phase = &mut state.phases[index];

            if *phase == RoutePhase::NotStarted && elapsed_ms >= start_ms {
                *phase = RoutePhase::Started;
                marks.push((index, RoutePhase::Started));
                push_camera(&mut effects, route.pre_camera, route.id, "pre");
            }
            if *phase == RoutePhase::Started
                && elapsed_ms >= start_ms.saturating_add(route.duration_ms)
            {
                *phase = RoutePhase::Stopped;
                marks.push((index, RoutePhase::Stopped));
            }
            if *phase == RoutePhase::Stopped
                && elapsed_ms >= route.completion_ms().unwrap_or(0)
            {
                *phase = RoutePhase::Completed;
                marks.push((index, RoutePhase::Completed));
                if !suppress_post {
                    push_camera(&mut effects, route.post_camera, route.id, "post");
                }
                if route.arrival_location_id.is_some() || route.arrival_display_ms.is_some() {
                    effects.push(SideEffect::Arrival {
                        route_id: route.id,
                        location_id: route.arrival_location_id,
                        display_ms: route.arrival_display_ms.unwrap_or(settle_default),
                    });
                }
            }
            if *phase != RoutePhase::Completed {
                all_completed = false;
            }
        }
        drop(guard);

        if !marks.is_empty() {
            self.inner.session.mutate(|session| {
                for (index, phase) in &marks {
                    let Some(rs) = session.route_states.get_mut(*index) else {
                        continue;
                    };
                    match phase {
                        RoutePhase::Started => {
                            rs.is_playing = true;
                            rs.has_started = true;
                        }
                        RoutePhase::Stopped => rs.is_playing = false,
                        RoutePhase::Completed => rs.has_completed = true,
                        RoutePhase::NotStarted => {}
                    }
                }
            });
        }
        (effects, all_completed)
    }

    // ---- chained strategy -------------------------------------------------

    async fn chain_loop(&self, epoch: Epoch, anchor: Instant, indices: Vec<usize>) {
        let (routes, suppress_post) = {
            let guard = self.inner.state.lock();
            let Some(state) = guard.as_ref() else { return };
            (state.routes.clone(), state.suppress_post_camera)
        };
        let settle_default = self.inner.config.chain_settle_ms;
        // Every boundary is an absolute offset from the anchor. A task woken
        // late (or a revived chain) lands on the same boundaries instead of
        // accumulating drift, and the phase guards keep already-passed
        // boundaries from re-firing their effects.
        let at = |offset_ms: u64| anchor + Duration::from_millis(offset_ms);
        let mut offset_ms: u64 = 0;

        for index in indices {
            let route = routes[index].clone();
            let RouteSchedule::Chained { start_delay_ms } = route.schedule else {
                continue;
            };
            let slot_begin = offset_ms;
            let motion_start = slot_begin + start_delay_ms;
            let motion_stop = motion_start + route.duration_ms;
            let has_arrival =
                route.arrival_location_id.is_some() || route.arrival_display_ms.is_some();
            let settle_ms = if has_arrival {
                route.arrival_display_ms.unwrap_or(settle_default)
            } else {
                settle_default
            };
            offset_ms = motion_stop + settle_ms;

            tokio::time::sleep_until(at(slot_begin)).await;
            if !self.inner.epoch.is_current(epoch) {
                return;
            }
            if self.phase_below(index, RoutePhase::Started) {
                push_spawned_camera(self, route.pre_camera, route.id, "pre", epoch);
            }

            tokio::time::sleep_until(at(motion_start)).await;
            if !self.inner.epoch.is_current(epoch) {
                return;
            }
            if self.phase_below(index, RoutePhase::Started) {
                self.set_phase(index, RoutePhase::Started);
                self.mark(index, |rs| {
                    rs.is_playing = true;
                    rs.has_started = true;
                });
            }

            tokio::time::sleep_until(at(motion_stop)).await;
            if !self.inner.epoch.is_current(epoch) {
                return;
            }
            if self.phase_below(index, RoutePhase::Completed) {
                self.set_phase(index, RoutePhase::Stopped);
                self.mark(index, |rs| rs.is_playing = false);

                if !suppress_post {
                    push_spawned_camera(self, route.post_camera, route.id, "post", epoch);
                }
                if has_arrival {
                    self.spawn_effect(
                        SideEffect::Arrival {
                            route_id: route.id,
                            location_id: route.arrival_location_id,
                            display_ms: settle_ms,
                        },
                        epoch,
                    );
                }
                self.set_phase(index, RoutePhase::Completed);
                self.mark(index, |rs| rs.has_completed = true);
            }
            // The settle pause is part of the next route's slot_begin
            // deadline; nothing sleeps here.
        }
        tracing::debug!("chained routes finished");
    }

    fn phase_below(&self, index: usize, phase: RoutePhase) -> bool {
        let guard = self.inner.state.lock();
        guard
            .as_ref()
            .and_then(|state| state.phases.get(index).copied())
            .is_some_and(|current| current < phase)
    }

    fn set_phase(&self, index: usize, phase: RoutePhase) {
        let mut guard = self.inner.state.lock();
        if let Some(state) = guard.as_mut() {
            if let Some(slot) = state.phases.get_mut(index) {
                *slot = phase;
            }
        }
    }

    fn mark(&self, index: usize, f: impl FnOnce(&mut RoutePlayState)) {
        self.inner.session.mutate(|session| {
            if let Some(rs) = session.route_states.get_mut(index) {
                f(rs);
            }
        });
    }

    // ---- side effects -----------------------------------------------------

    fn spawn_effect(&self, effect: SideEffect, epoch: Epoch) {
        let this = self.clone();
        tokio::spawn(async move {
            if !this.inner.epoch.is_current(epoch) {
                return;
            }
            match effect {
                SideEffect::Camera(camera) => {
                    let options = CameraOptions {
                        style: CameraStyle::Ease,
                        duration_ms: this.inner.config.default_camera_duration_ms,
                    };
                    if let Err(e) = this.inner.gateway.apply_camera(&camera, &options).await {
                        tracing::warn!("route camera failed: {e}");
                    }
                }
                SideEffect::Arrival {
                    route_id,
                    location_id,
                    display_ms,
                } => {
                    this.show_arrival(route_id, location_id, display_ms, epoch).await;
                }
            }
        });
    }

    async fn show_arrival(
        &self,
        route_id: RouteAnimationId,
        location_id: Option<LocationId>,
        display_ms: u64,
        epoch: Epoch,
    ) {
        let location = match location_id {
            Some(id) => match self.inner.store.fetch_location(id).await {
                Ok(location) => location,
                Err(e) => {
                    tracing::warn!("arrival location fetch failed: {e}");
                    None
                }
            },
            None => None,
        };
        if !self.inner.epoch.is_current(epoch) {
            return;
        }
        self.inner.session.mutate(|session| {
            session.arrival = Some(ArrivalInfo {
                route_id,
                location,
                display_ms,
            });
        });
        tokio::time::sleep(Duration::from_millis(display_ms)).await;
        if !self.inner.epoch.is_current(epoch) {
            return;
        }
        self.inner.session.mutate(|session| {
            if session
                .arrival
                .as_ref()
                .is_some_and(|arrival| arrival.route_id == route_id)
            {
                session.arrival = None;
            }
        });
    }
}

fn push_camera(
    effects: &mut Vec<SideEffect>,
    camera: Option<CameraDescriptor>,
    route_id: RouteAnimationId,
    which: &str,
) {
    let Some(camera) = camera else { return };
    if camera.is_valid() {
        effects.push(SideEffect::Camera(camera));
    } else {
        tracing::warn!(route = ?route_id, "invalid {which}-camera descriptor; skipping");
    }
}

fn push_spawned_camera(
    scheduler: &RouteAnimationScheduler,
    camera: Option<CameraDescriptor>,
    route_id: RouteAnimationId,
    which: &str,
    epoch: Epoch,
) {
    let Some(camera) = camera else { return };
    if camera.is_valid() {
        scheduler.spawn_effect(SideEffect::Camera(camera), epoch);
    } else {
        tracing::warn!(route = ?route_id, "invalid {which}-camera descriptor; skipping");
    }
}
