//! Track type representing a single playable item.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DurationLabel;

/// Stable identity of a track. Queue lookups compare by this, never by title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A single track. Supplied by the catalog and never mutated by playback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    /// Catalog identifier.
    pub id: TrackId,
    /// Track title.
    pub title: String,
    /// Artist name.
    pub artist: String,
    /// Album name.
    #[serde(default)]
    pub album: String,
    /// Display length from the catalog.
    #[serde(default, alias = "duration")]
    pub duration_label: DurationLabel,
    /// Opaque handle the audio driver resolves.
    #[serde(alias = "audio")]
    pub source_locator: String,
    /// Cover art location.
    #[serde(default, alias = "image")]
    pub artwork_locator: Option<String>,
    /// Genre used for catalog filtering.
    #[serde(default)]
    pub genre: Option<String>,
    /// Play count used for top listings.
    #[serde(default)]
    pub plays: u64,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        source_locator: impl Into<String>,
    ) -> Self {
        Self {
            id: TrackId::new(id),
            title: title.into(),
            artist: String::new(),
            album: String::new(),
            duration_label: DurationLabel::default(),
            source_locator: source_locator.into(),
            artwork_locator: None,
            genre: None,
            plays: 0,
        }
    }

    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = album.into();
        self
    }

    #[must_use]
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// `Title - Artist`, or just the title when the artist is unknown.
    pub fn display_name(&self) -> String {
        if self.artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.artist)
        }
    }

    /// Case-insensitive match against title, artist and album.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        [&self.title, &self.artist, &self.album]
            .iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}
