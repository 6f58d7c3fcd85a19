//! Playback state and its transition rules.
//!
//! [`PlaybackState`] is the single source of truth for what is playing. It is
//! owned by one controller and mutated only through the methods below. Each
//! transition that needs the audio driver to act returns an [`Intent`]; the
//! caller forwards it to the driver bridge. Transitions never fail: inputs
//! out of range are clamped and navigation on an empty queue does nothing.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::config::{MissingTrackPolicy, PlayerConfig};
use crate::types::{Queue, Track, Volume};

/// Transport mode. Nothing loaded is `Paused` with no current track.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Playing,
    #[default]
    Paused,
}

/// What the driver bridge should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Load the current track; start it if the transport is `Playing`.
    LoadAndPlay,
    /// Continue the loaded source.
    Resume,
    /// Pause the loaded source.
    Suspend,
    /// Move the driver to this position, in seconds.
    Seek(f64),
    /// Apply this output level (already accounts for mute).
    OutputLevel(f32),
    /// Rewind the loaded source to zero and play it again.
    Restart,
}

/// The playback aggregate.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackState {
    queue: Queue,
    transport: Transport,
    position_seconds: f64,
    duration_seconds: f64,
    volume: Volume,
    muted: bool,
    shuffle: bool,
    repeat: bool,
    #[serde(skip)]
    missing_track_policy: MissingTrackPolicy,
    #[serde(skip)]
    rng: StdRng,
}

impl PlaybackState {
    /// Create an empty state with default configuration.
    pub fn new() -> Self {
        Self::with_config(&PlayerConfig::default())
    }

    pub fn with_config(config: &PlayerConfig) -> Self {
        let rng = config
            .shuffle_seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        Self {
            queue: Queue::new(),
            transport: Transport::Paused,
            position_seconds: 0.0,
            duration_seconds: 0.0,
            volume: Volume::new(config.initial_volume.as_f32()),
            muted: false,
            shuffle: false,
            repeat: false,
            missing_track_policy: config.missing_track_policy,
            rng,
        }
    }

    // ---------------------------------------------------------------------
    // Read access
    // ---------------------------------------------------------------------

    pub const fn queue(&self) -> &Queue {
        &self.queue
    }

    pub const fn current_index(&self) -> Option<usize> {
        self.queue.current_index()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current()
    }

    pub const fn transport(&self) -> Transport {
        self.transport
    }

    pub fn is_playing(&self) -> bool {
        self.transport == Transport::Playing
    }

    pub const fn position_seconds(&self) -> f64 {
        self.position_seconds
    }

    /// Zero until the driver reports metadata for the current track.
    pub const fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub const fn volume(&self) -> f32 {
        self.volume.as_f32()
    }

    pub const fn is_muted(&self) -> bool {
        self.muted
    }

    pub const fn is_shuffle(&self) -> bool {
        self.shuffle
    }

    pub const fn is_repeat(&self) -> bool {
        self.repeat
    }

    /// Level the driver should output: silence while muted, else the volume.
    pub const fn effective_level(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume.as_f32()
        }
    }

    // ---------------------------------------------------------------------
    // User commands
    // ---------------------------------------------------------------------

    /// Replace the queue with `candidates` and start `track`.
    pub fn load_and_play(&mut self, track: Track, candidates: Vec<Track>) -> Option<Intent> {
        debug!(track = %track.id, candidates = candidates.len(), "load and play");
        self.queue = Queue::from_candidates(track, candidates, self.missing_track_policy);
        self.transport = Transport::Playing;
        self.reset_timeline();
        Some(Intent::LoadAndPlay)
    }

    /// Flip the transport. Does nothing while no track is current.
    pub fn toggle_playing(&mut self) -> Option<Intent> {
        let playing = !self.is_playing();
        self.set_playing(playing)
    }

    /// Set the transport. Re-requesting `Playing` is how a failed start is
    /// retried, so it always yields an intent when a track is current.
    pub fn set_playing(&mut self, playing: bool) -> Option<Intent> {
        self.current_track()?;
        if playing {
            self.transport = Transport::Playing;
            Some(Intent::Resume)
        } else {
            self.transport = Transport::Paused;
            Some(Intent::Suspend)
        }
    }

    /// Step forward. Keeps the transport as it is.
    pub fn next(&mut self) -> Option<Intent> {
        if self.queue.is_empty() {
            return None;
        }
        if self.shuffle {
            let index = self.random_index();
            self.queue.jump_to(index);
        } else {
            self.queue.advance();
        }
        self.reset_timeline();
        debug!(index = ?self.current_index(), shuffle = self.shuffle, "next");
        Some(Intent::LoadAndPlay)
    }

    /// Step back. Keeps the transport as it is.
    pub fn previous(&mut self) -> Option<Intent> {
        if self.queue.is_empty() {
            return None;
        }
        if self.shuffle {
            let index = self.random_index();
            self.queue.jump_to(index);
        } else {
            self.queue.previous();
        }
        self.reset_timeline();
        debug!(index = ?self.current_index(), shuffle = self.shuffle, "previous");
        Some(Intent::LoadAndPlay)
    }

    /// Seek within the current track, clamped to `[0, duration]`.
    pub fn seek(&mut self, target_seconds: f64) -> Option<Intent> {
        self.current_track()?;
        let target = if target_seconds.is_nan() {
            0.0
        } else {
            target_seconds.clamp(0.0, self.duration_seconds)
        };
        self.position_seconds = target;
        Some(Intent::Seek(target))
    }

    /// Set the volume, clamped to `[0, 1]`. A positive volume also unmutes.
    pub fn set_volume(&mut self, volume: f32) -> Option<Intent> {
        if volume.is_nan() {
            return None;
        }
        self.volume = Volume::new(volume);
        if volume > 0.0 && self.muted {
            self.muted = false;
        }
        Some(Intent::OutputLevel(self.effective_level()))
    }

    pub fn toggle_muted(&mut self) -> Option<Intent> {
        self.set_muted(!self.muted)
    }

    /// Set the mute flag. The stored volume is left alone.
    pub fn set_muted(&mut self, muted: bool) -> Option<Intent> {
        self.muted = muted;
        Some(Intent::OutputLevel(self.effective_level()))
    }

    /// Flip shuffle and return the new value. Queue order is not touched.
    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    /// Flip repeat-one and return the new value.
    pub fn toggle_repeat(&mut self) -> bool {
        self.repeat = !self.repeat;
        self.repeat
    }

    // ---------------------------------------------------------------------
    // Driver-reported events
    // ---------------------------------------------------------------------

    /// Position reported by the driver, clamped once the duration is known.
    pub fn on_time_update(&mut self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        self.position_seconds = self.clamp_position(seconds);
    }

    /// Duration reported by the driver. Non-finite values (live sources)
    /// leave the duration unknown.
    pub fn on_metadata_loaded(&mut self, duration_seconds: f64) {
        self.duration_seconds = if duration_seconds.is_finite() && duration_seconds > 0.0 {
            duration_seconds
        } else {
            0.0
        };
        self.position_seconds = self.clamp_position(self.position_seconds);
    }

    /// The current track played to its end.
    ///
    /// With repeat on, the same track starts over. Otherwise this is `next()`
    /// with the transport forced to `Playing`.
    pub fn on_ended(&mut self) -> Option<Intent> {
        self.current_track()?;
        self.transport = Transport::Playing;
        if self.repeat {
            self.position_seconds = 0.0;
            Some(Intent::Restart)
        } else {
            self.next()
        }
    }

    fn reset_timeline(&mut self) {
        self.position_seconds = 0.0;
        self.duration_seconds = 0.0;
    }

    fn clamp_position(&self, seconds: f64) -> f64 {
        let seconds = seconds.max(0.0);
        if self.duration_seconds > 0.0 {
            seconds.min(self.duration_seconds)
        } else {
            seconds
        }
    }

    fn random_index(&mut self) -> usize {
        self.rng.gen_range(0..self.queue.len())
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}
