//! Queue management types.

use serde::{Deserialize, Serialize};

use super::Track;
use crate::config::MissingTrackPolicy;

/// The playback queue.
///
/// Tracks are copied in when playback starts; the queue is not a live view of
/// any catalog listing. A non-empty queue always has a valid current index.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Queue {
    /// All tracks in the queue.
    items: Vec<Track>,
    /// Current playback index.
    current_index: Option<usize>,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue for `track` out of the listing it was picked from.
    ///
    /// An empty listing yields `[track]`. When `track` is not part of the
    /// listing, `policy` decides what becomes current.
    pub fn from_candidates(track: Track, candidates: Vec<Track>, policy: MissingTrackPolicy) -> Self {
        if candidates.is_empty() {
            return Self::with_start(vec![track], 0);
        }

        match candidates.iter().position(|t| t.id == track.id) {
            Some(index) => Self::with_start(candidates, index),
            None => match policy {
                MissingTrackPolicy::FirstCandidate => Self::with_start(candidates, 0),
                MissingTrackPolicy::PrependRequested => {
                    let mut items = Vec::with_capacity(candidates.len() + 1);
                    items.push(track);
                    items.extend(candidates);
                    Self::with_start(items, 0)
                }
            },
        }
    }

    /// Replace the contents, clamping `start_index` into range.
    pub fn with_start(items: Vec<Track>, start_index: usize) -> Self {
        let current_index = if items.is_empty() {
            None
        } else {
            Some(start_index.min(items.len() - 1))
        };
        Self {
            items,
            current_index,
        }
    }

    /// Get all tracks in the queue.
    pub fn items(&self) -> &[Track] {
        &self.items
    }

    /// Get the current track.
    pub fn current(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.items.get(i))
    }

    /// Get the current index.
    pub const fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Get the number of tracks in the queue.
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the queue is empty.
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Move to the following track, wrapping to the start past the end.
    pub fn advance(&mut self) -> Option<&Track> {
        let len = self.items.len();
        let current = self.current_index?;
        self.jump_to((current + 1) % len)
    }

    /// Move to the preceding track, wrapping to the end before the start.
    pub fn previous(&mut self) -> Option<&Track> {
        let len = self.items.len();
        let current = self.current_index?;
        let index = if current == 0 { len - 1 } else { current - 1 };
        self.jump_to(index)
    }

    /// Jump to a specific index.
    pub fn jump_to(&mut self, index: usize) -> Option<&Track> {
        if index < self.items.len() {
            self.current_index = Some(index);
            self.items.get(index)
        } else {
            None
        }
    }
}
