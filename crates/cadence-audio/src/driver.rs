//! The audio driver capability.

use cadence_core::TrackId;
use serde::Serialize;

use crate::DriverError;

/// Source to attach, tagged with the track it belongs to so that events can
/// be matched back to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub track_id: TrackId,
    pub source: String,
}

/// Notifications from the driver. Every event names the track it concerns;
/// events for a track that is no longer attached are discarded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DriverEvent {
    /// Playback position moved.
    TimeUpdate { track_id: TrackId, seconds: f64 },
    /// The source finished loading and its length is known.
    MetadataLoaded { track_id: TrackId, duration: f64 },
    /// The source played to its end.
    Ended { track_id: TrackId },
    /// Loading or rendering failed.
    Error {
        track_id: Option<TrackId>,
        reason: String,
    },
}

impl DriverEvent {
    pub const fn track_id(&self) -> Option<&TrackId> {
        match self {
            Self::TimeUpdate { track_id, .. }
            | Self::MetadataLoaded { track_id, .. }
            | Self::Ended { track_id } => Some(track_id),
            Self::Error { track_id, .. } => track_id.as_ref(),
        }
    }
}

/// An audio-rendering device.
///
/// Commands return once the device has accepted them. Completion of a
/// load is reported later as [`DriverEvent::MetadataLoaded`].
pub trait AudioDriver {
    /// Replace the attached source.
    fn load(&mut self, request: LoadRequest) -> Result<(), DriverError>;

    /// Start or continue the attached source.
    fn play(&mut self) -> Result<(), DriverError>;

    fn pause(&mut self) -> Result<(), DriverError>;

    fn set_position(&mut self, seconds: f64) -> Result<(), DriverError>;

    /// Output gain in `[0, 1]`.
    fn set_output_level(&mut self, level: f32) -> Result<(), DriverError>;
}

impl<D: AudioDriver + ?Sized> AudioDriver for Box<D> {
    fn load(&mut self, request: LoadRequest) -> Result<(), DriverError> {
        (**self).load(request)
    }

    fn play(&mut self) -> Result<(), DriverError> {
        (**self).play()
    }

    fn pause(&mut self) -> Result<(), DriverError> {
        (**self).pause()
    }

    fn set_position(&mut self, seconds: f64) -> Result<(), DriverError> {
        (**self).set_position(seconds)
    }

    fn set_output_level(&mut self, level: f32) -> Result<(), DriverError> {
        (**self).set_output_level(level)
    }
}
