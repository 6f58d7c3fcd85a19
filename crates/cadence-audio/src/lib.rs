//! # cadence-audio
//!
//! Keeps an audio driver in step with a [`cadence_core::PlaybackState`].
//!
//! - [`AudioDriver`] is the device capability the controller is given
//! - [`Bridge`] turns state intents into driver commands and driver events
//!   back into state transitions
//! - [`Controller`] owns the state and the bridge and exposes the command set
//! - [`SimulatedDriver`] is a hardware-free driver running on its own thread

pub mod bridge;
pub mod controller;
pub mod driver;
pub mod error;
pub mod simulated;

pub use bridge::Bridge;
pub use controller::Controller;
pub use driver::{AudioDriver, DriverEvent, LoadRequest};
pub use error::{DriverError, PlaybackError};
pub use simulated::{SimulatedConfig, SimulatedDriver};

#[cfg(test)]
mod testing;
