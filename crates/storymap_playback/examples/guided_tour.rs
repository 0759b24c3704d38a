// SPDX-License-Identifier: MIT OR Apache-2.0
//! A three-stop guided tour played against a logging render gateway.
//!
//! Run with `cargo run --example guided_tour`.

use std::sync::Arc;
use storymap_playback::{
    CameraOptions, DataStore, InMemoryStore, MarkerCache, PlaybackConfig, PlaybackController,
    RenderError, RenderGateway, RenderOptions, RenderedSegment,
};
use storymap_timeline::{
    Bounds, CameraDescriptor, LngLat, Location, RouteAnimation, RouteSchedule, Segment,
    Timeline, Transition,
};

/// Gateway that narrates every render call instead of drawing
struct LoggingGateway;

#[async_trait::async_trait]
impl RenderGateway for LoggingGateway {
    async fn render_segment(
        &self,
        segment: &Segment,
        options: &RenderOptions,
        markers: &MarkerCache,
    ) -> Result<RenderedSegment, RenderError> {
        tracing::info!(
            segment = %segment.name,
            style = options.transition_style.name(),
            cached_markers = markers.len(),
            "render"
        );
        Ok(RenderedSegment {
            layer_handles: vec![segment.name.clone()],
            bounds: None,
        })
    }

    async fn apply_camera(
        &self,
        target: &CameraDescriptor,
        options: &CameraOptions,
    ) -> Result<(), RenderError> {
        tracing::info!(
            lng = target.center.lng,
            lat = target.center.lat,
            zoom = target.zoom,
            style = options.style.name(),
            "camera"
        );
        Ok(())
    }

    async fn fit_bounds(
        &self,
        bounds: &Bounds,
        _options: &CameraOptions,
    ) -> Result<(), RenderError> {
        tracing::info!(?bounds, "fit bounds");
        Ok(())
    }

    async fn cross_fade_layers(
        &self,
        old: &RenderedSegment,
        new: &RenderedSegment,
        fade_ms: u64,
    ) -> Result<(), RenderError> {
        tracing::info!(
            from = ?old.layer_handles,
            to = ?new.layer_handles,
            fade_ms,
            "cross-fade"
        );
        Ok(())
    }
}

fn build_tour(store: &InMemoryStore) -> Timeline {
    let mut timeline = Timeline::new("Paris in three stops");
    let louvre = timeline.push_segment(
        Segment::new("The Louvre", 2000)
            .with_camera(CameraDescriptor::new(LngLat::new(2.3376, 48.8606), 15.0)),
    );
    let seine = timeline.push_segment(
        Segment::new("Along the Seine", 2000)
            .with_camera(CameraDescriptor::new(LngLat::new(2.3500, 48.8550), 13.0)),
    );
    let montmartre = timeline.push_segment(
        Segment::new("Montmartre", 2000)
            .with_camera(CameraDescriptor::new(LngLat::new(2.3431, 48.8867), 14.0)),
    );

    // A ferry leg up the river, chained after the segment entry.
    let basilica = Location::new("Sacré-Cœur", LngLat::new(2.3431, 48.8867));
    let mut ferry = RouteAnimation::new(
        LngLat::new(2.3500, 48.8550),
        LngLat::new(2.3431, 48.8867),
        1500,
        RouteSchedule::Chained { start_delay_ms: 250 },
    );
    ferry.arrival_location_id = Some(basilica.id);
    ferry.arrival_display_ms = Some(1000);
    store.add_location(basilica);
    store.add_route(seine, ferry);

    store.add_transition(Transition::new(louvre, seine));
    store.add_transition(Transition::new(seine, montmartre).with_user_gate("Climb the hill"));
    timeline
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let store = Arc::new(InMemoryStore::new());
    let timeline = build_tour(&store);
    let config: PlaybackConfig =
        serde_json::from_str(r#"{"minSegmentDurationMs": 1500}"#).unwrap_or_default();
    let controller = Arc::new(PlaybackController::new(
        timeline,
        Arc::new(LoggingGateway),
        store as Arc<dyn DataStore>,
        config,
    ));

    let mut rx = controller.subscribe();
    controller.play_from_start().await;

    let mut saw_playing = false;
    loop {
        let status = rx.borrow_and_update().clone();
        if status.phase.is_playing() {
            saw_playing = true;
        }
        if status.phase.is_waiting() {
            let label = status
                .waiting_transition
                .and_then(|t| t.trigger_label)
                .unwrap_or_else(|| "Continue".into());
            tracing::info!(label = %label, "gate reached; continuing on the user's behalf");
            controller.continue_after_user_action().await;
        }
        if let Some(arrival) = &status.arrival {
            if let Some(location) = &arrival.location {
                tracing::info!(location = %location.name, "arrived");
            }
        }
        if status.phase.is_idle() && saw_playing {
            break;
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
    tracing::info!("tour finished");
}
