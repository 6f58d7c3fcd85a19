//! Player service: routes front-end commands to the catalog and controller.

use std::fmt::Write as _;

use cadence_audio::{AudioDriver, Controller};
use cadence_core::{format_clock, PlaybackState, Result, Track, TrackId};
use tracing::{debug, info};

use super::catalog::Catalog;
use crate::commands::{Command, HELP};

/// Glue between the terminal and the playback controller.
///
/// Remembers the last listing shown so `play <id>` queues the tracks the
/// user was looking at.
pub struct PlayerService<C, D> {
    catalog: C,
    controller: Controller<D>,
    listing: Vec<Track>,
    announced_track: Option<TrackId>,
    announced_error: Option<String>,
}

impl<C: Catalog, D: AudioDriver> PlayerService<C, D> {
    pub const fn new(catalog: C, controller: Controller<D>) -> Self {
        Self {
            catalog,
            controller,
            listing: Vec::new(),
            announced_track: None,
            announced_error: None,
        }
    }

    pub const fn state(&self) -> &PlaybackState {
        self.controller.state()
    }

    /// Run one command and return the text to show.
    pub async fn execute(&mut self, command: Command) -> Result<String> {
        debug!(?command, "executing");
        let reply = match command {
            Command::List { genre } => {
                let tracks = self.catalog.tracks(genre.as_deref()).await?;
                self.show(tracks)
            }
            Command::Search { query } => {
                let tracks = self.catalog.search(&query).await?;
                self.show(tracks)
            }
            Command::Top { limit } => {
                let tracks = self.catalog.top_tracks(limit).await?;
                self.show(tracks)
            }
            Command::Genres => self.catalog.genres().await?.join(", "),
            Command::Play { id } => {
                self.play(&id).await?;
                self.status_line()
            }
            Command::Toggle => {
                self.controller.toggle_playing();
                self.status_line()
            }
            Command::Pause => {
                self.controller.set_playing(false);
                self.status_line()
            }
            Command::Resume => {
                self.controller.set_playing(true);
                self.status_line()
            }
            Command::Next => {
                self.controller.next();
                self.status_line()
            }
            Command::Previous => {
                self.controller.previous();
                self.status_line()
            }
            Command::Seek { seconds } => {
                self.controller.seek(seconds);
                self.status_line()
            }
            Command::Volume { level } => {
                self.controller.set_volume(level);
                self.status_line()
            }
            Command::Mute => {
                self.controller.toggle_muted();
                self.status_line()
            }
            Command::Shuffle => {
                let on = self.controller.toggle_shuffle();
                format!("shuffle {}", on_off(on))
            }
            Command::Repeat => {
                let on = self.controller.toggle_repeat();
                format!("repeat {}", on_off(on))
            }
            Command::Status => self.status_line(),
            Command::Help => HELP.to_string(),
            Command::Quit => String::new(),
        };
        self.remember_current();
        Ok(reply)
    }

    /// Drain driver events and report what changed since the last call.
    pub fn pump(&mut self) -> Vec<String> {
        let handled = self.controller.pump_events();
        if handled == 0 {
            return Vec::new();
        }

        let mut notices = Vec::new();

        let current = self.controller.state().current_track().map(|t| t.id.clone());
        if current != self.announced_track {
            if let Some(track) = self.controller.state().current_track() {
                notices.push(format!("now playing: {}", track.display_name()));
            }
            self.announced_track = current;
        }

        let error = self.controller.last_error().map(ToString::to_string);
        if error.is_some() && error != self.announced_error {
            if let Some(message) = &error {
                notices.push(message.clone());
            }
        }
        self.announced_error = error;

        notices
    }

    /// One-line summary of the playback state.
    pub fn status_line(&self) -> String {
        let state = self.controller.state();
        let Some(track) = state.current_track() else {
            return "nothing queued".to_string();
        };

        let mut line = format!(
            "[{}] {}  {} / {}  vol {}%",
            if state.is_playing() { "playing" } else { "paused" },
            track.display_name(),
            format_clock(whole_seconds(state.position_seconds())),
            format_clock(whole_seconds(state.duration_seconds())),
            cadence_core::Volume::new(state.volume()).as_percentage(),
        );
        for (flag, label) in [
            (state.is_muted(), "muted"),
            (state.is_shuffle(), "shuffle"),
            (state.is_repeat(), "repeat"),
        ] {
            if flag {
                let _ = write!(line, " [{label}]");
            }
        }
        if let Some(error) = self.controller.last_error() {
            let _ = write!(line, "  ! {error}");
        }
        line
    }

    async fn play(&mut self, id: &TrackId) -> Result<()> {
        if self.listing.is_empty() {
            self.listing = self.catalog.tracks(None).await?;
        }

        let track = match self.listing.iter().find(|t| &t.id == id) {
            Some(track) => track.clone(),
            None => self.catalog.track(id).await?,
        };
        info!(track = %track.id, "play requested");
        self.controller.clear_error();
        self.controller.load_and_play(track, self.listing.clone());
        Ok(())
    }

    fn show(&mut self, tracks: Vec<Track>) -> String {
        self.listing = tracks;
        if self.listing.is_empty() {
            return "no tracks".to_string();
        }

        let current = self.controller.state().current_track().map(|t| &t.id);
        let mut out = String::new();
        for track in &self.listing {
            let marker = if Some(&track.id) == current { '*' } else { ' ' };
            let _ = writeln!(
                out,
                "{marker} {:>4}  {}  ({})",
                track.id,
                track.display_name(),
                track.duration_label
            );
        }
        out.truncate(out.trim_end().len());
        out
    }

    fn remember_current(&mut self) {
        self.announced_track = self.controller.state().current_track().map(|t| t.id.clone());
    }
}

const fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn whole_seconds(seconds: f64) -> u64 {
    seconds.max(0.0) as u64
}
