//! Player configuration.

use serde::{Deserialize, Serialize};

use crate::types::Volume;

/// What `load_and_play` does when the requested track is not part of the
/// listing it was started from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingTrackPolicy {
    /// Keep the listing as-is and start from its first entry.
    #[default]
    FirstCandidate,
    /// Put the requested track in front of the listing and start from it.
    PrependRequested,
}

/// Tunables for a single playback controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Volume applied to the driver at construction.
    pub initial_volume: Volume,
    /// Fallback when the started track is missing from its listing.
    pub missing_track_policy: MissingTrackPolicy,
    /// Fixed seed for shuffle selection. `None` seeds from OS entropy.
    pub shuffle_seed: Option<u64>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_volume: Volume::DEFAULT,
            missing_track_policy: MissingTrackPolicy::default(),
            shuffle_seed: None,
        }
    }
}
