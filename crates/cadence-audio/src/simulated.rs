//! Hardware-free audio driver.
//!
//! Behaves like a real device from the controller's point of view: commands
//! are queued to a worker thread, loading takes time, position advances in
//! real time while playing and the end of a source is reported. Track
//! lengths come from a table keyed by source locator.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cadence_core::TrackId;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::driver::{AudioDriver, DriverEvent, LoadRequest};
use crate::error::DriverError;

/// Timing and content of the simulated device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    /// Interval between position reports while playing.
    #[serde(with = "millis")]
    pub tick: Duration,
    /// Time from `load()` to the metadata report.
    #[serde(with = "millis")]
    pub load_latency: Duration,
    /// Length used for sources missing from `track_lengths`.
    pub default_track_seconds: f64,
    /// Media seconds played per wall-clock second.
    pub time_scale: f64,
    /// Known source lengths in seconds.
    pub track_lengths: HashMap<String, f64>,
    /// Sources that fail to load.
    pub unreachable: HashSet<String>,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(250),
            load_latency: Duration::from_millis(120),
            default_track_seconds: 180.0,
            time_scale: 1.0,
            track_lengths: HashMap::new(),
            unreachable: HashSet::new(),
        }
    }
}

impl SimulatedConfig {
    #[must_use]
    pub fn with_track_length(mut self, source: impl Into<String>, seconds: f64) -> Self {
        self.track_lengths.insert(source.into(), seconds);
        self
    }

    #[must_use]
    pub fn with_unreachable(mut self, source: impl Into<String>) -> Self {
        self.unreachable.insert(source.into());
        self
    }

    fn length_of(&self, source: &str) -> f64 {
        self.track_lengths
            .get(source)
            .copied()
            .unwrap_or(self.default_track_seconds)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Commands sent to the worker thread.
#[derive(Debug, Clone)]
enum DeviceCommand {
    Load(LoadRequest),
    Play,
    Pause,
    Seek(f64),
    SetLevel(f32),
    Shutdown,
}

/// Device status shared between the handle and the worker.
#[derive(Debug, Clone, Default)]
struct DeviceStatus {
    /// Source that finished loading.
    loaded: Option<TrackId>,
    playing: bool,
    position: f64,
    level: f32,
}

/// Handle to a simulated device running on its own thread.
pub struct SimulatedDriver {
    command_tx: Sender<DeviceCommand>,
    status: Arc<RwLock<DeviceStatus>>,
}

impl SimulatedDriver {
    /// Start the device. Events are delivered on the returned receiver.
    pub fn spawn(config: SimulatedConfig) -> Result<(Self, Receiver<DriverEvent>), DriverError> {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let status = Arc::new(RwLock::new(DeviceStatus::default()));

        let worker = DeviceWorker::new(command_rx, event_tx, status.clone(), config);
        std::thread::Builder::new()
            .name("simulated-audio".to_string())
            .spawn(move || worker.run())
            .map_err(|e| DriverError::NotReady(format!("failed to spawn device thread: {e}")))?;

        Ok((Self { command_tx, status }, event_rx))
    }

    /// Whether the device is rendering audio right now.
    pub fn is_playing(&self) -> bool {
        self.status.read().playing
    }

    /// Current position in seconds.
    pub fn position(&self) -> f64 {
        self.status.read().position
    }

    /// Output level last applied.
    pub fn output_level(&self) -> f32 {
        self.status.read().level
    }

    fn send(&self, command: DeviceCommand) -> Result<(), DriverError> {
        self.command_tx
            .send(command)
            .map_err(|_| DriverError::Disconnected)
    }
}

impl AudioDriver for SimulatedDriver {
    fn load(&mut self, request: LoadRequest) -> Result<(), DriverError> {
        {
            let mut status = self.status.write();
            status.loaded = None;
            status.playing = false;
            status.position = 0.0;
        }
        self.send(DeviceCommand::Load(request))
    }

    fn play(&mut self) -> Result<(), DriverError> {
        if self.status.read().loaded.is_none() {
            return Err(DriverError::NotReady("no source loaded".to_string()));
        }
        self.send(DeviceCommand::Play)
    }

    fn pause(&mut self) -> Result<(), DriverError> {
        self.send(DeviceCommand::Pause)
    }

    fn set_position(&mut self, seconds: f64) -> Result<(), DriverError> {
        self.send(DeviceCommand::Seek(seconds))
    }

    fn set_output_level(&mut self, level: f32) -> Result<(), DriverError> {
        self.send(DeviceCommand::SetLevel(level.clamp(0.0, 1.0)))
    }
}

impl Drop for SimulatedDriver {
    fn drop(&mut self) {
        let _ = self.command_tx.send(DeviceCommand::Shutdown);
    }
}

/// Load waiting for its simulated latency to pass.
struct PendingLoad {
    request: LoadRequest,
    ready_at: Instant,
}

/// Source currently held by the device.
struct Attached {
    track_id: TrackId,
    length: f64,
}

/// Worker loop owning the simulated device.
struct DeviceWorker {
    command_rx: Receiver<DeviceCommand>,
    event_tx: Sender<DriverEvent>,
    status: Arc<RwLock<DeviceStatus>>,
    config: SimulatedConfig,
    pending: Option<PendingLoad>,
    attached: Option<Attached>,
}

impl DeviceWorker {
    fn new(
        command_rx: Receiver<DeviceCommand>,
        event_tx: Sender<DriverEvent>,
        status: Arc<RwLock<DeviceStatus>>,
        config: SimulatedConfig,
    ) -> Self {
        Self {
            command_rx,
            event_tx,
            status,
            config,
            pending: None,
            attached: None,
        }
    }

    fn run(mut self) {
        info!("Simulated audio device started");

        let mut last_tick = Instant::now();
        let mut last_report = Instant::now();

        loop {
            // Poll without blocking while there is work to time, otherwise
            // wait for the next command.
            let was_playing = self.status.read().playing;
            let busy = was_playing || self.pending.is_some();
            let command = if busy {
                match self.command_rx.try_recv() {
                    Ok(cmd) => Some(cmd),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match self.command_rx.recv_timeout(self.config.tick) {
                    Ok(cmd) => Some(cmd),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            };

            if let Some(cmd) = command {
                if matches!(cmd, DeviceCommand::Shutdown) {
                    info!("Simulated audio device shutting down");
                    break;
                }
                self.handle_command(cmd);
            }

            self.complete_load();

            let now = Instant::now();
            let elapsed = now.duration_since(last_tick);
            last_tick = now;
            if was_playing && self.status.read().playing {
                self.advance(elapsed, &mut last_report);
            }

            if busy {
                std::thread::sleep(Duration::from_millis(2));
            }
        }

        debug!("Simulated audio device stopped");
    }

    fn handle_command(&mut self, command: DeviceCommand) {
        trace!(?command, "device command");
        match command {
            DeviceCommand::Load(request) => {
                self.attached = None;
                {
                    let mut status = self.status.write();
                    status.loaded = None;
                    status.playing = false;
                }
                self.pending = Some(PendingLoad {
                    request,
                    ready_at: Instant::now() + self.config.load_latency,
                });
            }
            DeviceCommand::Play => {
                if self.attached.is_some() {
                    self.status.write().playing = true;
                } else {
                    warn!("Cannot play: no source attached");
                    self.emit(DriverEvent::Error {
                        track_id: None,
                        reason: "no source attached".to_string(),
                    });
                }
            }
            DeviceCommand::Pause => {
                self.status.write().playing = false;
            }
            DeviceCommand::Seek(seconds) => {
                if let Some(attached) = &self.attached {
                    let position = seconds.clamp(0.0, attached.length);
                    self.status.write().position = position;
                    let track_id = attached.track_id.clone();
                    self.emit(DriverEvent::TimeUpdate {
                        track_id,
                        seconds: position,
                    });
                }
            }
            DeviceCommand::SetLevel(level) => {
                self.status.write().level = level;
            }
            DeviceCommand::Shutdown => {
                // Handled in the main loop
            }
        }
    }

    fn complete_load(&mut self) {
        let ready = self
            .pending
            .as_ref()
            .is_some_and(|p| Instant::now() >= p.ready_at);
        if !ready {
            return;
        }
        let Some(PendingLoad { request, .. }) = self.pending.take() else {
            return;
        };

        if self.config.unreachable.contains(&request.source) {
            warn!(source = %request.source, "Source unreachable");
            self.emit(DriverEvent::Error {
                track_id: Some(request.track_id),
                reason: format!("source unreachable: {}", request.source),
            });
            return;
        }

        let length = self.config.length_of(&request.source);
        debug!(track = %request.track_id, length, "source loaded");
        {
            let mut status = self.status.write();
            status.loaded = Some(request.track_id.clone());
            status.position = 0.0;
            status.playing = false;
        }
        self.attached = Some(Attached {
            track_id: request.track_id.clone(),
            length,
        });
        self.emit(DriverEvent::MetadataLoaded {
            track_id: request.track_id,
            duration: length,
        });
    }

    fn advance(&mut self, elapsed: Duration, last_report: &mut Instant) {
        let Some(attached) = &self.attached else {
            return;
        };
        let track_id = attached.track_id.clone();
        let length = attached.length;

        let position = {
            let mut status = self.status.write();
            status.position =
                (status.position + elapsed.as_secs_f64() * self.config.time_scale).min(length);
            status.position
        };

        if position >= length {
            self.status.write().playing = false;
            self.emit(DriverEvent::TimeUpdate {
                track_id: track_id.clone(),
                seconds: length,
            });
            debug!(track = %track_id, "source finished");
            self.emit(DriverEvent::Ended { track_id });
        } else if last_report.elapsed() >= self.config.tick {
            *last_report = Instant::now();
            self.emit(DriverEvent::TimeUpdate {
                track_id,
                seconds: position,
            });
        }
    }

    fn emit(&self, event: DriverEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    fn fast_config() -> SimulatedConfig {
        SimulatedConfig {
            tick: Duration::from_millis(5),
            load_latency: Duration::from_millis(5),
            default_track_seconds: 1.0,
            time_scale: 20.0,
            ..SimulatedConfig::default()
        }
    }

    fn request(id: &str, source: &str) -> LoadRequest {
        LoadRequest {
            track_id: TrackId::new(id),
            source: source.to_string(),
        }
    }

    /// Receive events until one matches, failing after `WAIT`.
    fn wait_for(rx: &Receiver<DriverEvent>, pred: impl Fn(&DriverEvent) -> bool) -> DriverEvent {
        let deadline = Instant::now() + WAIT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = rx.recv_timeout(remaining).unwrap();
            if pred(&event) {
                return event;
            }
        }
    }

    #[test]
    fn test_play_before_load_is_rejected() {
        let (mut driver, _rx) = SimulatedDriver::spawn(fast_config()).unwrap();
        assert!(matches!(driver.play(), Err(DriverError::NotReady(_))));
    }

    #[test]
    fn test_load_reports_configured_length() {
        let config = fast_config().with_track_length("mem://a", 42.0);
        let (mut driver, rx) = SimulatedDriver::spawn(config).unwrap();
        driver.load(request("a", "mem://a")).unwrap();

        let event = wait_for(&rx, |e| matches!(e, DriverEvent::MetadataLoaded { .. }));
        assert_eq!(
            event,
            DriverEvent::MetadataLoaded {
                track_id: TrackId::new("a"),
                duration: 42.0,
            }
        );
        assert!(driver.play().is_ok());
    }

    #[test]
    fn test_playback_runs_to_end() {
        let (mut driver, rx) = SimulatedDriver::spawn(fast_config()).unwrap();
        driver.load(request("a", "mem://a")).unwrap();
        wait_for(&rx, |e| matches!(e, DriverEvent::MetadataLoaded { .. }));
        driver.play().unwrap();

        let event = wait_for(&rx, |e| matches!(e, DriverEvent::Ended { .. }));
        assert_eq!(event.track_id(), Some(&TrackId::new("a")));
        assert!(!driver.is_playing());
        assert_eq!(driver.position(), 1.0);
    }

    #[test]
    fn test_unreachable_source_reports_error() {
        let config = fast_config().with_unreachable("mem://gone");
        let (mut driver, rx) = SimulatedDriver::spawn(config).unwrap();
        driver.load(request("g", "mem://gone")).unwrap();

        let event = wait_for(&rx, |e| matches!(e, DriverEvent::Error { .. }));
        assert_eq!(event.track_id(), Some(&TrackId::new("g")));
        assert!(driver.play().is_err());
    }

    #[test]
    fn test_seek_is_clamped_and_reported() {
        let config = fast_config().with_track_length("mem://a", 30.0);
        let (mut driver, rx) = SimulatedDriver::spawn(config).unwrap();
        driver.load(request("a", "mem://a")).unwrap();
        wait_for(&rx, |e| matches!(e, DriverEvent::MetadataLoaded { .. }));

        driver.set_position(99.0).unwrap();
        let event = wait_for(&rx, |e| matches!(e, DriverEvent::TimeUpdate { .. }));
        assert_eq!(
            event,
            DriverEvent::TimeUpdate {
                track_id: TrackId::new("a"),
                seconds: 30.0,
            }
        );
    }

    #[test]
    fn test_config_from_json() {
        let config: SimulatedConfig =
            serde_json::from_str(r#"{"tick": 100, "time_scale": 2.0}"#).unwrap();
        assert_eq!(config.tick, Duration::from_millis(100));
        assert_eq!(config.time_scale, 2.0);
        assert_eq!(config.load_latency, Duration::from_millis(120));
    }
}
