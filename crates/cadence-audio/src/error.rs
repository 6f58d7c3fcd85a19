//! Driver and playback error types.

use cadence_core::TrackId;
use thiserror::Error;

/// Failure returned synchronously by an [`AudioDriver`](crate::AudioDriver)
/// command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("Driver not ready: {0}")]
    NotReady(String),

    #[error("Driver rejected the request: {0}")]
    Rejected(String),

    #[error("Driver disconnected")]
    Disconnected,
}

impl From<DriverError> for cadence_core::Error {
    fn from(err: DriverError) -> Self {
        Self::Driver(err.to_string())
    }
}

/// Non-fatal playback condition surfaced to the UI.
///
/// None of these change the transport; the user decides whether to retry,
/// skip or stop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Playback of {track_id} could not start: {reason}")]
    StartFailed { track_id: TrackId, reason: String },

    #[error("Loading {track_id} failed: {reason}")]
    LoadFailed { track_id: TrackId, reason: String },

    #[error("Playback error: {reason}")]
    Driver {
        track_id: Option<TrackId>,
        reason: String,
    },
}

impl PlaybackError {
    /// Track the condition refers to, when known.
    pub const fn track_id(&self) -> Option<&TrackId> {
        match self {
            Self::StartFailed { track_id, .. } | Self::LoadFailed { track_id, .. } => Some(track_id),
            Self::Driver { track_id, .. } => track_id.as_ref(),
        }
    }
}
