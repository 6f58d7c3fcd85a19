//! Application settings.

use std::path::{Path, PathBuf};

use cadence_audio::SimulatedConfig;
use cadence_core::{Error, PlayerConfig, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Environment variable pointing at an explicit settings file.
pub const CONFIG_ENV: &str = "CADENCE_CONFIG";

const SETTINGS_FILE: &str = "settings.json";

/// Everything the binary reads at startup. Missing fields take defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Playback controller tunables.
    pub player: PlayerConfig,
    /// JSON library to browse. The bundled library is used when unset.
    pub library_path: Option<PathBuf>,
    /// Artificial catalog delay in milliseconds.
    pub catalog_latency_ms: u64,
    /// Simulated audio device.
    pub simulation: SimulatedConfig,
}

impl Settings {
    /// Load from `$CADENCE_CONFIG`, else the per-user config directory.
    /// No file at the default location means defaults.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_path(Path::new(&path));
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => {
                debug!("No settings file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        info!("Loading settings from {}", path.display());
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        let settings: Self = serde_json::from_str(&json)
            .map_err(|e| Error::Config(format!("invalid settings in {}: {e}", path.display())))?;
        settings.validate()?;
        Ok(settings)
    }

    /// `<config dir>/cadence/settings.json`, when a home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "cadence").map(|d| d.config_dir().join(SETTINGS_FILE))
    }

    fn validate(&self) -> Result<()> {
        if self.simulation.tick.is_zero() {
            return Err(Error::Config("simulation.tick must be positive".to_string()));
        }
        if !(self.simulation.time_scale.is_finite() && self.simulation.time_scale > 0.0) {
            return Err(Error::Config("simulation.time_scale must be positive".to_string()));
        }
        Ok(())
    }
}
