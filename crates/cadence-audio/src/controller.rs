//! Playback controller: the command surface exposed to the UI.

use cadence_core::{Intent, PlaybackState, PlayerConfig, Track};
use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, info};

use crate::bridge::Bridge;
use crate::driver::{AudioDriver, DriverEvent};
use crate::error::PlaybackError;

/// Owns one [`PlaybackState`] and the [`Bridge`] to its driver.
///
/// All mutation happens through `&mut self` on a single thread: commands are
/// applied to the state and their intent forwarded before the call returns,
/// and driver events are drained one at a time in arrival order by
/// [`pump_events`](Self::pump_events).
pub struct Controller<D> {
    state: PlaybackState,
    bridge: Bridge<D>,
    events: Receiver<DriverEvent>,
}

impl<D: AudioDriver> Controller<D> {
    /// Create a controller around `driver`, whose notifications arrive on
    /// `events`. The configured volume is pushed to the driver right away.
    pub fn new(driver: D, events: Receiver<DriverEvent>, config: &PlayerConfig) -> Self {
        let mut state = PlaybackState::with_config(config);
        let mut bridge = Bridge::new(driver);
        bridge.apply(Intent::OutputLevel(state.effective_level()), &mut state);
        info!(volume = state.volume(), "Playback controller ready");

        Self {
            state,
            bridge,
            events,
        }
    }

    /// Read-only view of the playback state.
    pub const fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Owned copy of the playback state.
    pub fn snapshot(&self) -> PlaybackState {
        self.state.clone()
    }

    pub const fn last_error(&self) -> Option<&PlaybackError> {
        self.bridge.last_error()
    }

    pub fn clear_error(&mut self) {
        self.bridge.clear_error();
    }

    pub const fn driver(&self) -> &D {
        self.bridge.driver()
    }

    pub fn load_and_play(&mut self, track: Track, candidates: Vec<Track>) {
        let intent = self.state.load_and_play(track, candidates);
        self.dispatch(intent);
    }

    pub fn toggle_playing(&mut self) {
        let intent = self.state.toggle_playing();
        self.dispatch(intent);
    }

    pub fn set_playing(&mut self, playing: bool) {
        let intent = self.state.set_playing(playing);
        self.dispatch(intent);
    }

    #[allow(clippy::should_implement_trait)] // Not implementing Iterator
    pub fn next(&mut self) {
        let intent = self.state.next();
        self.dispatch(intent);
    }

    pub fn previous(&mut self) {
        let intent = self.state.previous();
        self.dispatch(intent);
    }

    pub fn seek(&mut self, seconds: f64) {
        let intent = self.state.seek(seconds);
        self.dispatch(intent);
    }

    pub fn set_volume(&mut self, volume: f32) {
        let intent = self.state.set_volume(volume);
        self.dispatch(intent);
    }

    pub fn toggle_muted(&mut self) {
        let intent = self.state.toggle_muted();
        self.dispatch(intent);
    }

    pub fn set_muted(&mut self, muted: bool) {
        let intent = self.state.set_muted(muted);
        self.dispatch(intent);
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.state.toggle_shuffle()
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.state.toggle_repeat()
    }

    /// Process a single driver notification.
    pub fn handle_event(&mut self, event: DriverEvent) {
        self.bridge.handle_event(event, &mut self.state);
    }

    /// Drain every queued driver notification. Returns how many were handled.
    pub fn pump_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("Driver event channel closed");
                    break;
                }
            }
        }
        handled
    }

    fn dispatch(&mut self, intent: Option<Intent>) {
        if let Some(intent) = intent {
            self.bridge.apply(intent, &mut self.state);
        }
    }
}
