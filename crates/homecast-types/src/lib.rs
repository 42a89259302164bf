use serde::{Deserialize, Serialize};

/// Coarse playback state exposed to the automation host.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Nothing loaded, or playback ended/was stopped.
    #[default]
    Stopped,
    /// Media is actively producing audio.
    Playing,
    /// Media is loaded but paused.
    Paused,
}

/// Descriptive tags for a single media file.
///
/// Every field is optional: extraction may fail or may simply not have
/// run yet. An all-empty value serializes as `{}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

impl TrackMetadata {
    /// `true` when no tag could be resolved.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.artist.is_none() && self.album.is_none() && self.genre.is_none()
    }
}

/// Observed playback snapshot, recomputed by the synchronizer.
///
/// The host polls this; it is never mutated directly by commands.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaStatus {
    pub state: PlaybackState,
    /// Elapsed playback time in milliseconds.
    pub position_ms: u64,
    /// Total media duration in milliseconds (0 when unknown).
    pub duration_ms: u64,
    pub metadata: TrackMetadata,
}

impl MediaStatus {
    /// The snapshot forced while no backend is active.
    pub fn idle() -> Self {
        Self::default()
    }
}
