//! Test double that records every driver command.

use cadence_core::TrackId;

use crate::driver::{AudioDriver, LoadRequest};
use crate::error::DriverError;

#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Load(TrackId, String),
    Play,
    Pause,
    SetPosition(f64),
    SetOutputLevel(f32),
}

#[derive(Debug, Default)]
pub struct RecordingDriver {
    pub calls: Vec<DriverCall>,
    /// When set, `play()` fails with this reason.
    pub reject_play: Option<String>,
}

impl RecordingDriver {
    pub fn loads(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DriverCall::Load(..)))
            .count()
    }

    pub fn count(&self, call: &DriverCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl AudioDriver for RecordingDriver {
    fn load(&mut self, request: LoadRequest) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Load(request.track_id, request.source));
        Ok(())
    }

    fn play(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Play);
        match &self.reject_play {
            Some(reason) => Err(DriverError::Rejected(reason.clone())),
            None => Ok(()),
        }
    }

    fn pause(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Pause);
        Ok(())
    }

    fn set_position(&mut self, seconds: f64) -> Result<(), DriverError> {
        self.calls.push(DriverCall::SetPosition(seconds));
        Ok(())
    }

    fn set_output_level(&mut self, level: f32) -> Result<(), DriverError> {
        self.calls.push(DriverCall::SetOutputLevel(level));
        Ok(())
    }
}
