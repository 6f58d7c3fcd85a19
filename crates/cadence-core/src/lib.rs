//! # cadence-core
//!
//! Playback state machine, queue and track types for the Cadence player.
//!
//! Everything in this crate is pure: transitions mutate a [`PlaybackState`]
//! and hand back an [`Intent`] describing what the audio driver should do.
//! Nothing here touches a device.

pub mod config;
pub mod error;
pub mod state;
pub mod types;

pub use config::{MissingTrackPolicy, PlayerConfig};
pub use error::{Error, Result};
pub use state::{Intent, PlaybackState, Transport};
pub use types::*;
