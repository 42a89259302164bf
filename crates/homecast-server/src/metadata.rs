//! Tag extraction behind a stable contract.
//!
//! Wraps lofty with a per-path cache; extraction failure degrades to
//! empty metadata rather than an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lofty::{Accessor, TaggedFileExt};

use homecast_types::TrackMetadata;

#[derive(Default)]
pub struct MetadataResolver {
    cache: HashMap<PathBuf, TrackMetadata>,
}

impl MetadataResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve tags for a file, consulting the cache first.
    pub fn resolve(&mut self, path: &Path) -> TrackMetadata {
        if let Some(meta) = self.cache.get(path) {
            return meta.clone();
        }
        let meta = probe_tags(path).unwrap_or_else(|err| {
            tracing::warn!(error = %err, path = %path.display(), "metadata extraction failed");
            TrackMetadata::default()
        });
        self.cache.insert(path.to_path_buf(), meta.clone());
        meta
    }

    /// Cached entry for a path, if any (resolution side effects are
    /// observable through this).
    pub fn cached(&self, path: &Path) -> Option<&TrackMetadata> {
        self.cache.get(path)
    }
}

fn probe_tags(path: &Path) -> anyhow::Result<TrackMetadata> {
    let tagged = lofty::read_from_path(path)?;
    let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) else {
        return Ok(TrackMetadata::default());
    };
    Ok(TrackMetadata {
        title: tag.title().map(|s| s.to_string()),
        artist: tag.artist().map(|s| s.to_string()),
        album: tag.album().map(|s| s.to_string()),
        genre: tag.genre().map(|s| s.to_string()),
    })
}

/// Probe the media duration in milliseconds, if the file can be read.
pub fn probe_duration_ms(path: &Path) -> Option<u64> {
    use lofty::AudioFile;
    match lofty::read_from_path(path) {
        Ok(tagged) => Some(tagged.properties().duration().as_millis() as u64),
        Err(err) => {
            tracing::debug!(error = %err, path = %path.display(), "duration probe failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_file_resolves_to_empty_metadata_and_caches() {
        let mut resolver = MetadataResolver::new();
        let path = Path::new("/nonexistent/track.mp3");
        assert!(resolver.cached(path).is_none());

        let meta = resolver.resolve(path);

        assert!(meta.is_empty());
        assert_eq!(resolver.cached(path), Some(&TrackMetadata::default()));
    }

    #[test]
    fn resolve_is_idempotent_per_path() {
        let mut resolver = MetadataResolver::new();
        let path = Path::new("/nonexistent/track.mp3");
        let first = resolver.resolve(path);
        let second = resolver.resolve(path);
        assert_eq!(first, second);
    }
}
