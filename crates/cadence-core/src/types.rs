//! Core domain types for Cadence.

pub mod common;
pub mod queue;
pub mod track;

pub use common::{format_clock, DurationLabel, Volume};
pub use queue::Queue;
pub use track::{Track, TrackId};
