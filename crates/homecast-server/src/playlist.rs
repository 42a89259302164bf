//! Playlist/queue model: an ordered list of tracks plus a cursor.
//!
//! Invariant: `0 <= cursor <= tracks.len()`; a cursor equal to the
//! length means "exhausted, no current track".

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;

use crate::models::{PlayOrder, Track};

#[derive(Debug, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    cursor: usize,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single track; duplicates are allowed.
    pub fn enqueue(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Append a batch without touching the cursor.
    pub fn extend(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.tracks.extend(tracks);
    }

    /// Swap the whole playlist atomically and reset the cursor.
    pub fn replace(&mut self, mut tracks: Vec<Track>, order: PlayOrder) {
        if let PlayOrder::Shuffled = order {
            tracks.shuffle(&mut rand::thread_rng());
        }
        self.tracks = tracks;
        self.cursor = 0;
    }

    pub fn current(&self) -> Option<&Track> {
        self.tracks.get(self.cursor)
    }

    /// Move the cursor forward, saturating at the playlist length.
    pub fn advance(&mut self) {
        if self.cursor < self.tracks.len() {
            self.cursor += 1;
        }
    }

    pub fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.tracks.len()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Persist the playlist, one path per line. Paths containing
    /// embedded newlines are not escaped (known format limitation).
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("create playlist file {}", path.display()))?;
        for track in &self.tracks {
            writeln!(file, "{}", track.path.display())
                .with_context(|| format!("write playlist file {}", path.display()))?;
        }
        Ok(())
    }

    /// Load a persisted playlist. A missing file yields an empty
    /// playlist with a warning, not an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "playlist file missing; starting empty");
            return Ok(Self::new());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read playlist file {}", path.display()))?;
        let tracks = raw
            .lines()
            .filter(|line| !line.is_empty())
            .map(Track::new)
            .collect();
        Ok(Self { tracks, cursor: 0 })
    }

    /// Like `load`, but an unreadable file degrades to an empty
    /// playlist with a warning instead of failing startup.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(playlist) => playlist,
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "playlist load failed; starting empty");
                Self::new()
            }
        }
    }
}
