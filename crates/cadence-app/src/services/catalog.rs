//! Track catalog backed by a JSON library file.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use cadence_core::{Error, Result, Track, TrackId};
use tracing::{debug, info};

/// Genre name meaning "no filter".
pub const ALL_GENRES: &str = "All";

/// Library bundled with the binary, used when no library file is configured.
const BUNDLED_LIBRARY: &str = include_str!("../../assets/library.json");

/// Source of track records. The playback core never calls this; the
/// front-end resolves tracks here and hands them to the controller.
#[allow(async_fn_in_trait)]
pub trait Catalog {
    /// Every track, optionally restricted to one genre.
    async fn tracks(&self, genre: Option<&str>) -> Result<Vec<Track>>;

    /// Tracks whose title, artist or album contains `query`.
    async fn search(&self, query: &str) -> Result<Vec<Track>>;

    async fn track(&self, id: &TrackId) -> Result<Track>;

    /// `All` followed by each distinct genre in catalog order.
    async fn genres(&self) -> Result<Vec<String>>;

    /// Most played tracks first.
    async fn top_tracks(&self, limit: usize) -> Result<Vec<Track>>;
}

/// In-memory catalog loaded once at startup.
#[derive(Debug, Clone)]
pub struct LibraryCatalog {
    tracks: Vec<Track>,
    /// Artificial response delay, to exercise the UI against a slow backend.
    latency: Duration,
}

impl LibraryCatalog {
    /// Build a catalog from already-parsed tracks. Ids must be unique.
    pub fn new(tracks: Vec<Track>) -> Result<Self> {
        let mut seen = HashSet::new();
        for track in &tracks {
            if !seen.insert(&track.id) {
                return Err(Error::Catalog(format!("duplicate track id {}", track.id)));
            }
        }
        Ok(Self {
            tracks,
            latency: Duration::ZERO,
        })
    }

    /// Parse a JSON array of track records.
    pub fn from_json(json: &str) -> Result<Self> {
        let tracks: Vec<Track> = serde_json::from_str(json)?;
        Self::new(tracks)
    }

    /// The library shipped with the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_LIBRARY)
    }

    /// Load from `path`, or the bundled library when no path is given.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let catalog = match path {
            Some(path) => {
                debug!("Loading library from {}", path.display());
                let json = tokio::fs::read_to_string(path).await?;
                Self::from_json(&json)?
            }
            None => Self::bundled()?,
        };
        info!("Catalog loaded with {} tracks", catalog.tracks.len());
        Ok(catalog)
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// All tracks without delay, for wiring at startup.
    pub fn all(&self) -> &[Track] {
        &self.tracks
    }

    async fn respond(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Catalog for LibraryCatalog {
    async fn tracks(&self, genre: Option<&str>) -> Result<Vec<Track>> {
        self.respond().await;
        let tracks = match genre {
            None => self.tracks.clone(),
            Some(genre) if genre.eq_ignore_ascii_case(ALL_GENRES) => self.tracks.clone(),
            Some(genre) => self
                .tracks
                .iter()
                .filter(|t| t.genre.as_deref().is_some_and(|g| g.eq_ignore_ascii_case(genre)))
                .cloned()
                .collect(),
        };
        Ok(tracks)
    }

    async fn search(&self, query: &str) -> Result<Vec<Track>> {
        self.respond().await;
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidArgument("search query is empty".to_string()));
        }
        Ok(self.tracks.iter().filter(|t| t.matches(query)).cloned().collect())
    }

    async fn track(&self, id: &TrackId) -> Result<Track> {
        self.respond().await;
        self.tracks
            .iter()
            .find(|t| &t.id == id)
            .cloned()
            .ok_or_else(|| Error::TrackNotFound(id.clone()))
    }

    async fn genres(&self) -> Result<Vec<String>> {
        self.respond().await;
        let mut genres = vec![ALL_GENRES.to_string()];
        for genre in self.tracks.iter().filter_map(|t| t.genre.as_ref()) {
            if !genres.contains(genre) {
                genres.push(genre.clone());
            }
        }
        Ok(genres)
    }

    async fn top_tracks(&self, limit: usize) -> Result<Vec<Track>> {
        self.respond().await;
        let mut tracks = self.tracks.clone();
        tracks.sort_by(|a, b| b.plays.cmp(&a.plays));
        tracks.truncate(limit);
        Ok(tracks)
    }
}
