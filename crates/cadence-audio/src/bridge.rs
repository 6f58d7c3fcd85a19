//! Synchronization between playback state and the audio driver.
//!
//! The bridge is the only component holding the driver. It does not decide
//! anything about playback: state transitions produce [`Intent`]s which the
//! bridge turns into driver commands, and driver events are forwarded to the
//! matching state transition.
//!
//! A load is in flight from `load()` until the driver reports metadata (or an
//! error) for that track. While it is in flight no other driver command is
//! issued except output level changes. When it settles the bridge looks at
//! the state again: if the current track changed meanwhile it loads the new
//! one, otherwise it applies any pending seek and starts playback if the
//! transport asks for it.

use cadence_core::{Intent, PlaybackState, Track, TrackId};
use tracing::{debug, trace, warn};

use crate::driver::{AudioDriver, DriverEvent, LoadRequest};
use crate::error::{DriverError, PlaybackError};

/// Owns the driver and tracks what it has attached.
#[derive(Debug)]
pub struct Bridge<D> {
    driver: D,
    /// Track whose source the driver holds and has finished loading.
    attached: Option<TrackId>,
    /// Length the driver reported for the attached source.
    attached_duration: f64,
    /// Track whose load has been issued but not yet settled.
    pending: Option<TrackId>,
    /// Whether the driver is currently rendering the attached source.
    driver_playing: bool,
    last_error: Option<PlaybackError>,
}

impl<D: AudioDriver> Bridge<D> {
    pub const fn new(driver: D) -> Self {
        Self {
            driver,
            attached: None,
            attached_duration: 0.0,
            pending: None,
            driver_playing: false,
            last_error: None,
        }
    }

    pub const fn driver(&self) -> &D {
        &self.driver
    }

    pub const fn attached(&self) -> Option<&TrackId> {
        self.attached.as_ref()
    }

    pub const fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Most recent playback condition, if any.
    pub const fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Carry out an intent emitted by a state transition.
    pub fn apply(&mut self, intent: Intent, state: &mut PlaybackState) {
        trace!(?intent, "applying intent");
        match intent {
            Intent::LoadAndPlay => self.load_current(state),
            Intent::Resume => {
                if self.is_loading() {
                    debug!("resume deferred until load settles");
                } else if self.is_attached(state.current_track()) {
                    self.start_playback(state);
                } else {
                    self.load_current(state);
                }
            }
            Intent::Suspend => {
                if self.is_loading() {
                    debug!("suspend deferred until load settles");
                } else if self.attached.is_some() {
                    if let Err(e) = self.driver.pause() {
                        warn!("Driver pause failed: {e}");
                    }
                    self.driver_playing = false;
                }
            }
            Intent::Seek(seconds) => {
                if self.is_loading() {
                    debug!(seconds, "seek ignored while loading");
                } else if self.attached.is_some() {
                    if let Err(e) = self.driver.set_position(seconds) {
                        warn!("Driver seek failed: {e}");
                    }
                }
            }
            Intent::OutputLevel(level) => {
                if let Err(e) = self.driver.set_output_level(level) {
                    warn!("Driver output level failed: {e}");
                }
            }
            Intent::Restart => {
                if self.is_loading() {
                    debug!("restart deferred until load settles");
                } else if self.is_attached(state.current_track()) {
                    if let Err(e) = self.driver.set_position(0.0) {
                        warn!("Driver rewind failed: {e}");
                    }
                    self.start_playback(state);
                } else {
                    self.load_current(state);
                }
            }
        }
    }

    /// Forward a driver event to the state. Events for any track other than
    /// the one attached (or loading) are stale and dropped.
    pub fn handle_event(&mut self, event: DriverEvent, state: &mut PlaybackState) {
        match event {
            DriverEvent::MetadataLoaded { track_id, duration } => {
                if self.pending.as_ref() == Some(&track_id) {
                    self.settle_load(track_id, duration, state);
                } else if self.attached.as_ref() == Some(&track_id) && !self.is_loading() {
                    self.attached_duration = duration;
                    state.on_metadata_loaded(duration);
                } else {
                    debug!(track = %track_id, "discarding stale metadata");
                }
            }
            DriverEvent::TimeUpdate { track_id, seconds } => {
                if self.is_live(&track_id) {
                    state.on_time_update(seconds);
                } else {
                    trace!(track = %track_id, "discarding stale time update");
                }
            }
            DriverEvent::Ended { track_id } => {
                if self.is_live(&track_id) {
                    debug!(track = %track_id, "track ended");
                    self.driver_playing = false;
                    if let Some(intent) = state.on_ended() {
                        self.apply(intent, state);
                    }
                } else {
                    debug!(track = %track_id, "discarding stale end of track");
                }
            }
            DriverEvent::Error { track_id, reason } => self.handle_error(track_id, reason, state),
        }
    }

    fn settle_load(&mut self, track_id: TrackId, duration: f64, state: &mut PlaybackState) {
        self.pending = None;
        self.attached = Some(track_id);

        if !self.is_attached(state.current_track()) {
            debug!("current track changed while loading, redirecting");
            self.load_current(state);
            return;
        }

        self.attached_duration = duration;
        state.on_metadata_loaded(duration);
        if state.is_playing() {
            self.start_playback(state);
        }
    }

    fn handle_error(&mut self, track_id: Option<TrackId>, reason: String, state: &mut PlaybackState) {
        match track_id {
            Some(id) if self.pending.as_ref() == Some(&id) => {
                warn!(track = %id, "Load failed: {reason}");
                self.pending = None;
                let moved_on = !state.current_track().is_some_and(|t| t.id == id);
                self.last_error = Some(PlaybackError::LoadFailed { track_id: id, reason });
                if moved_on {
                    self.load_current(state);
                }
            }
            Some(id) if self.attached.as_ref() != Some(&id) => {
                debug!(track = %id, "discarding stale driver error: {reason}");
            }
            track_id => {
                warn!("Driver error: {reason}");
                self.last_error = Some(PlaybackError::Driver { track_id, reason });
            }
        }
    }

    /// Attach the current track unless it is already attached and playing.
    /// A skipped reload hands the known length back to the state, since the
    /// driver will not report it again.
    fn load_current(&mut self, state: &mut PlaybackState) {
        let Some(track) = state.current_track() else {
            return;
        };

        if let Some(loading) = &self.pending {
            debug!(loading = %loading, target = %track.id, "load in flight, will redirect when it settles");
            return;
        }

        if self.driver_playing && state.is_playing() && self.is_attached(Some(track)) {
            debug!(track = %track.id, "already playing, skipping reload");
            state.on_metadata_loaded(self.attached_duration);
            return;
        }

        let request = LoadRequest {
            track_id: track.id.clone(),
            source: track.source_locator.clone(),
        };
        debug!(track = %track.id, source = %track.source_locator, "loading");

        self.attached = None;
        self.attached_duration = 0.0;
        self.driver_playing = false;
        match self.driver.load(request) {
            Ok(()) => self.pending = Some(track.id.clone()),
            Err(e) => {
                warn!(track = %track.id, "Driver refused load: {e}");
                self.last_error = Some(PlaybackError::LoadFailed {
                    track_id: track.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Ask the driver to play. A refusal is recorded but the transport is
    /// left as requested so a later resume can retry.
    fn start_playback(&mut self, state: &PlaybackState) {
        match self.driver.play() {
            Ok(()) => {
                self.driver_playing = true;
                if matches!(self.last_error, Some(PlaybackError::StartFailed { .. })) {
                    self.last_error = None;
                }
            }
            Err(e) => {
                self.driver_playing = false;
                self.record_start_failure(state, &e);
            }
        }
    }

    fn record_start_failure(&mut self, state: &PlaybackState, err: &DriverError) {
        let Some(track) = state.current_track() else {
            return;
        };
        warn!(track = %track.id, "Playback start failed: {err}");
        self.last_error = Some(PlaybackError::StartFailed {
            track_id: track.id.clone(),
            reason: err.to_string(),
        });
    }

    fn is_attached(&self, track: Option<&Track>) -> bool {
        matches!((track, &self.attached), (Some(t), Some(id)) if &t.id == id)
    }

    fn is_live(&self, track_id: &TrackId) -> bool {
        !self.is_loading() && self.attached.as_ref() == Some(track_id)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;
    use crate::testing::{DriverCall, RecordingDriver};
    use cadence_core::PlayerConfig;
    use proptest::prelude::*;

    fn make_track(id: &str) -> Track {
        Track::new(id, format!("Track {id}"), format!("mem://{id}"))
    }

    fn abc() -> Vec<Track> {
        vec![make_track("A"), make_track("B"), make_track("C")]
    }

    fn setup() -> (Bridge<RecordingDriver>, PlaybackState) {
        let state = PlaybackState::with_config(&PlayerConfig {
            shuffle_seed: Some(1),
            ..PlayerConfig::default()
        });
        (Bridge::new(RecordingDriver::default()), state)
    }

    fn metadata(id: &str, duration: f64) -> DriverEvent {
        DriverEvent::MetadataLoaded {
            track_id: TrackId::new(id),
            duration,
        }
    }

    /// Start `id` from [A, B, C] and let its load settle.
    fn playing(bridge: &mut Bridge<RecordingDriver>, state: &mut PlaybackState, id: &str) {
        let intent = state.load_and_play(make_track(id), abc()).unwrap();
        bridge.apply(intent, state);
        bridge.handle_event(metadata(id, 200.0), state);
    }

    #[test]
    fn test_load_then_play_after_metadata() {
        let (mut bridge, mut state) = setup();
        let intent = state.load_and_play(make_track("A"), abc()).unwrap();
        bridge.apply(intent, &mut state);

        assert!(bridge.is_loading());
        assert_eq!(bridge.driver().calls, vec![DriverCall::Load(TrackId::new("A"), "mem://A".into())]);

        bridge.handle_event(metadata("A", 200.0), &mut state);
        assert!(!bridge.is_loading());
        assert_eq!(bridge.attached(), Some(&TrackId::new("A")));
        assert_eq!(state.duration_seconds(), 200.0);
        assert_eq!(bridge.driver().calls.last(), Some(&DriverCall::Play));
    }

    #[test]
    fn test_reload_of_playing_track_is_idempotent() {
        let (mut bridge, mut state) = setup();
        playing(&mut bridge, &mut state, "A");
        assert_eq!(bridge.driver().loads(), 1);

        let intent = state.load_and_play(make_track("A"), abc()).unwrap();
        bridge.apply(intent, &mut state);
        bridge.apply(Intent::LoadAndPlay, &mut state);

        assert_eq!(bridge.driver().loads(), 1);
        assert!(!bridge.is_loading());

        // The driver will not report the length again, so the known one is kept.
        assert_eq!(state.duration_seconds(), 200.0);
        assert_eq!(state.position_seconds(), 0.0);
        let intent = state.seek(120.0).unwrap();
        bridge.apply(intent, &mut state);
        assert_eq!(state.position_seconds(), 120.0);
        assert_eq!(bridge.driver().calls.last(), Some(&DriverCall::SetPosition(120.0)));
    }

    #[test]
    fn test_seek_during_load_is_not_replayed() {
        let (mut bridge, mut state) = setup();
        let intent = state.load_and_play(make_track("A"), abc()).unwrap();
        bridge.apply(intent, &mut state);

        // Length is unknown until metadata arrives, so the target clamps to 0.
        let intent = state.seek(45.0).unwrap();
        bridge.apply(intent, &mut state);
        assert_eq!(state.position_seconds(), 0.0);

        bridge.handle_event(metadata("A", 200.0), &mut state);
        assert!(!bridge
            .driver()
            .calls
            .iter()
            .any(|c| matches!(c, DriverCall::SetPosition(_))));
        assert_eq!(bridge.driver().calls.last(), Some(&DriverCall::Play));
    }

    #[test]
    fn test_reload_of_paused_track_loads_again() {
        let (mut bridge, mut state) = setup();
        playing(&mut bridge, &mut state, "A");
        let intent = state.set_playing(false).unwrap();
        bridge.apply(intent, &mut state);

        let intent = state.load_and_play(make_track("A"), abc()).unwrap();
        bridge.apply(intent, &mut state);
        assert_eq!(bridge.driver().loads(), 2);
    }

    #[test]
    fn test_commands_wait_for_pending_load() {
        let (mut bridge, mut state) = setup();
        let intent = state.load_and_play(make_track("A"), abc()).unwrap();
        bridge.apply(intent, &mut state);

        let intent = state.next().unwrap();
        bridge.apply(intent, &mut state);
        let intent = state.set_playing(false).unwrap();
        bridge.apply(intent, &mut state);

        // Only the first load has reached the driver.
        assert_eq!(bridge.driver().calls.len(), 1);

        // A settles, but B is current now: redirect instead of playing A.
        bridge.handle_event(metadata("A", 200.0), &mut state);
        assert_eq!(
            bridge.driver().calls,
            vec![
                DriverCall::Load(TrackId::new("A"), "mem://A".into()),
                DriverCall::Load(TrackId::new("B"), "mem://B".into()),
            ]
        );
        assert_eq!(state.duration_seconds(), 0.0);

        // B settles while paused: attached but not started.
        bridge.handle_event(metadata("B", 150.0), &mut state);
        assert_eq!(bridge.attached(), Some(&TrackId::new("B")));
        assert!(!bridge.driver().calls.contains(&DriverCall::Play));
        assert_eq!(state.duration_seconds(), 150.0);
    }

    #[test]
    fn test_stale_events_are_discarded() {
        let (mut bridge, mut state) = setup();
        playing(&mut bridge, &mut state, "A");

        let intent = state.next().unwrap();
        bridge.apply(intent, &mut state);

        bridge.handle_event(
            DriverEvent::TimeUpdate {
                track_id: TrackId::new("A"),
                seconds: 120.0,
            },
            &mut state,
        );
        bridge.handle_event(DriverEvent::Ended { track_id: TrackId::new("A") }, &mut state);

        assert_eq!(state.position_seconds(), 0.0);
        assert_eq!(state.current_index(), Some(1));
        assert_eq!(bridge.driver().loads(), 2);
    }

    #[test]
    fn test_time_update_for_attached_track() {
        let (mut bridge, mut state) = setup();
        playing(&mut bridge, &mut state, "A");
        bridge.handle_event(
            DriverEvent::TimeUpdate {
                track_id: TrackId::new("A"),
                seconds: 42.0,
            },
            &mut state,
        );
        assert_eq!(state.position_seconds(), 42.0);
    }

    #[test]
    fn test_play_rejection_keeps_transport() {
        let (mut bridge, mut state) = setup();
        bridge.driver.reject_play = Some("device busy".into());
        playing(&mut bridge, &mut state, "A");

        assert!(state.is_playing());
        assert!(matches!(
            bridge.last_error(),
            Some(PlaybackError::StartFailed { track_id, .. }) if track_id.as_str() == "A"
        ));

        // Manual retry once the device recovers.
        bridge.driver.reject_play = None;
        let intent = state.set_playing(true).unwrap();
        bridge.apply(intent, &mut state);
        assert!(bridge.last_error().is_none());
        assert_eq!(bridge.driver().loads(), 1);
        assert_eq!(bridge.driver().calls.last(), Some(&DriverCall::Play));
    }

    #[test]
    fn test_driver_error_keeps_transport_and_index() {
        let (mut bridge, mut state) = setup();
        playing(&mut bridge, &mut state, "B");

        bridge.handle_event(
            DriverEvent::Error {
                track_id: Some(TrackId::new("B")),
                reason: "source unreachable".into(),
            },
            &mut state,
        );

        assert!(state.is_playing());
        assert_eq!(state.current_index(), Some(1));
        assert!(matches!(bridge.last_error(), Some(PlaybackError::Driver { .. })));
    }

    #[test]
    fn test_load_error_surfaces_and_allows_navigation() {
        let (mut bridge, mut state) = setup();
        let intent = state.load_and_play(make_track("A"), abc()).unwrap();
        bridge.apply(intent, &mut state);
        bridge.handle_event(
            DriverEvent::Error {
                track_id: Some(TrackId::new("A")),
                reason: "404".into(),
            },
            &mut state,
        );

        assert!(!bridge.is_loading());
        assert!(matches!(bridge.last_error(), Some(PlaybackError::LoadFailed { .. })));
        assert!(state.is_playing());

        let intent = state.next().unwrap();
        bridge.apply(intent, &mut state);
        assert_eq!(bridge.driver().loads(), 2);
    }

    #[test]
    fn test_ended_advances_and_loads_next() {
        let (mut bridge, mut state) = setup();
        playing(&mut bridge, &mut state, "C");

        bridge.handle_event(DriverEvent::Ended { track_id: TrackId::new("C") }, &mut state);
        assert_eq!(state.current_index(), Some(0));
        assert_eq!(
            bridge.driver().calls.last(),
            Some(&DriverCall::Load(TrackId::new("A"), "mem://A".into()))
        );

        bridge.handle_event(metadata("A", 100.0), &mut state);
        assert_eq!(bridge.driver().calls.last(), Some(&DriverCall::Play));
    }

    #[test]
    fn test_ended_on_single_track_queue_reloads() {
        let (mut bridge, mut state) = setup();
        let intent = state.load_and_play(make_track("solo"), Vec::new()).unwrap();
        bridge.apply(intent, &mut state);
        bridge.handle_event(metadata("solo", 10.0), &mut state);

        bridge.handle_event(DriverEvent::Ended { track_id: TrackId::new("solo") }, &mut state);
        assert_eq!(bridge.driver().loads(), 2);
    }

    #[test]
    fn test_repeat_rewinds_without_reload() {
        let (mut bridge, mut state) = setup();
        playing(&mut bridge, &mut state, "B");
        state.toggle_repeat();

        bridge.handle_event(DriverEvent::Ended { track_id: TrackId::new("B") }, &mut state);
        let calls = &bridge.driver().calls;
        assert_eq!(calls[calls.len() - 2], DriverCall::SetPosition(0.0));
        assert_eq!(calls[calls.len() - 1], DriverCall::Play);
        assert_eq!(bridge.driver().loads(), 1);
        assert_eq!(state.current_index(), Some(1));
    }

    #[test]
    fn test_seek_and_pause_go_straight_to_driver() {
        let (mut bridge, mut state) = setup();
        playing(&mut bridge, &mut state, "A");
        let play_count = bridge.driver().count(&DriverCall::Play);

        let intent = state.seek(30.0).unwrap();
        bridge.apply(intent, &mut state);
        let intent = state.toggle_playing().unwrap();
        bridge.apply(intent, &mut state);

        let calls = &bridge.driver().calls;
        assert_eq!(calls[calls.len() - 2], DriverCall::SetPosition(30.0));
        assert_eq!(calls[calls.len() - 1], DriverCall::Pause);
        assert_eq!(bridge.driver().count(&DriverCall::Play), play_count);
    }

    #[test]
    fn test_output_level_tracks_mute() {
        let (mut bridge, mut state) = setup();
        for intent in [state.set_volume(0.4), state.set_muted(true), state.set_muted(false)] {
            bridge.apply(intent.unwrap(), &mut state);
        }
        let levels: Vec<_> = bridge
            .driver()
            .calls
            .iter()
            .filter_map(|c| match c {
                DriverCall::SetOutputLevel(level) => Some(*level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec![0.4, 0.0, 0.4]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Next,
        Previous,
        Toggle,
        Replay(usize),
        Settle,
        End,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Next),
            Just(Op::Previous),
            Just(Op::Toggle),
            (0usize..3).prop_map(Op::Replay),
            Just(Op::Settle),
            Just(Op::End),
        ]
    }

    fn settle(bridge: &mut Bridge<RecordingDriver>, state: &mut PlaybackState) {
        if let Some(id) = bridge.pending.clone() {
            bridge.handle_event(
                DriverEvent::MetadataLoaded {
                    track_id: id,
                    duration: 100.0,
                },
                state,
            );
        }
    }

    proptest! {
        #[test]
        fn prop_one_load_in_flight(ops in prop::collection::vec(op(), 0..40)) {
            let (mut bridge, mut state) = setup();
            let intent = state.load_and_play(make_track("A"), abc()).unwrap();
            bridge.apply(intent, &mut state);

            for op in ops {
                let was_loading = bridge.is_loading();
                let loads_before = bridge.driver().loads();
                match op {
                    Op::Next => {
                        if let Some(intent) = state.next() {
                            bridge.apply(intent, &mut state);
                        }
                    }
                    Op::Previous => {
                        if let Some(intent) = state.previous() {
                            bridge.apply(intent, &mut state);
                        }
                    }
                    Op::Toggle => {
                        if let Some(intent) = state.toggle_playing() {
                            bridge.apply(intent, &mut state);
                        }
                    }
                    Op::Replay(index) => {
                        let queue = abc();
                        let intent = state.load_and_play(queue[index].clone(), queue).unwrap();
                        bridge.apply(intent, &mut state);
                    }
                    Op::Settle => settle(&mut bridge, &mut state),
                    Op::End => {
                        if let Some(id) = bridge.attached().cloned() {
                            bridge.handle_event(DriverEvent::Ended { track_id: id }, &mut state);
                        }
                    }
                }
                let issued = bridge.driver().loads() - loads_before;
                if was_loading {
                    prop_assert!(issued <= usize::from(matches!(op, Op::Settle)));
                } else {
                    prop_assert!(issued <= 1);
                }
            }

            // Once every load settles the driver holds the current track.
            for _ in 0..2 {
                settle(&mut bridge, &mut state);
            }
            prop_assert!(!bridge.is_loading());
            prop_assert_eq!(bridge.attached(), state.current_track().map(|t| &t.id));
        }
    }
}
