//! Core data types shared across the orchestration layer.

use std::path::{Path, PathBuf};

use homecast_types::TrackMetadata;

/// A playable item: a file-system path plus lazily resolved tags.
///
/// Immutable once created; metadata is filled in by the resolver when
/// the track actually plays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub path: PathBuf,
    pub metadata: Option<TrackMetadata>,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            metadata: None,
        }
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("<unknown>")
    }
}

impl From<&Path> for Track {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

/// Ordering applied when the playlist is replaced wholesale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayOrder {
    Sequential,
    /// Uniform full-permutation shuffle.
    Shuffled,
}

/// Handle to a cast-capable receiver produced by discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CastDeviceDescriptor {
    /// Friendly name from the `fn` TXT record.
    pub name: String,
    pub host: String,
    pub port: u16,
}
