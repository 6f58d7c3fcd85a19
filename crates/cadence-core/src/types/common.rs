//! Common value types shared across the workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Display length of a track, e.g. `3:20`.
///
/// Catalog records carry this as text; it is informational only. The
/// authoritative duration comes from the audio driver once metadata loads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(try_from = "String", into = "String")]
pub struct DurationLabel(u64);

impl DurationLabel {
    pub const fn from_seconds(seconds: u64) -> Self {
        Self(seconds)
    }

    pub const fn as_seconds(&self) -> u64 {
        self.0
    }

    /// Format as M:SS or H:MM:SS.
    pub fn format(&self) -> String {
        format_clock(self.0)
    }
}

impl FromStr for DurationLabel {
    type Err = Error;

    /// Parses `SS`, `M:SS` or `H:MM:SS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidArgument(format!("invalid duration label: {s:?}"));

        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(invalid());
        }

        let mut total = 0u64;
        for (i, part) in parts.iter().enumerate() {
            let value: u64 = part.parse().map_err(|_| invalid())?;
            // Every field after the leading one is a base-60 digit.
            if i > 0 && value >= 60 {
                return Err(invalid());
            }
            total = total
                .checked_mul(60)
                .and_then(|t| t.checked_add(value))
                .ok_or_else(invalid)?;
        }
        Ok(Self(total))
    }
}

impl TryFrom<String> for DurationLabel {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DurationLabel> for String {
    fn from(label: DurationLabel) -> Self {
        label.format()
    }
}

impl fmt::Display for DurationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Format whole seconds as a clock string.
pub fn format_clock(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Volume level (0.0 to 1.0).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct Volume(f32);

impl Volume {
    pub const MIN: Self = Self(0.0);
    pub const MAX: Self = Self(1.0);
    pub const DEFAULT: Self = Self(1.0);

    /// Clamp into `[0, 1]`. NaN maps to silence.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Self::MIN
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub const fn as_f32(&self) -> f32 {
        self.0
    }

    pub fn as_percentage(&self) -> u8 {
        (self.0 * 100.0).round() as u8
    }

    pub fn from_percentage(percent: u8) -> Self {
        Self::new(f32::from(percent) / 100.0)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::DEFAULT
    }
}
