//! Shared playback status store.
//!
//! The single externally visible snapshot; only the synchronizer (or
//! the forced idle reset) writes it.

use std::sync::{Arc, Mutex};

use homecast_types::{MediaStatus, PlaybackState, TrackMetadata};

#[derive(Clone, Default)]
pub struct StatusStore {
    inner: Arc<Mutex<MediaStatus>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, cloned out.
    pub fn snapshot(&self) -> MediaStatus {
        self.inner.lock().unwrap().clone()
    }

    /// Force the idle snapshot: `{stopped, 0, 0, {}}`.
    pub fn reset_idle(&self) {
        *self.inner.lock().unwrap() = MediaStatus::idle();
    }

    /// Apply a backend sample; metadata is left as-is.
    pub fn apply_sample(&self, state: PlaybackState, position_ms: u64, duration_ms: u64) {
        let mut status = self.inner.lock().unwrap();
        status.state = state;
        status.position_ms = position_ms;
        status.duration_ms = duration_ms;
    }

    pub fn set_metadata(&self, metadata: TrackMetadata) {
        self.inner.lock().unwrap().metadata = metadata;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_idle_clears_everything() {
        let store = StatusStore::new();
        store.apply_sample(PlaybackState::Playing, 1_000, 60_000);
        store.set_metadata(TrackMetadata {
            title: Some("x".into()),
            ..Default::default()
        });

        store.reset_idle();

        assert_eq!(store.snapshot(), MediaStatus::idle());
    }

    #[test]
    fn apply_sample_preserves_metadata() {
        let store = StatusStore::new();
        let meta = TrackMetadata {
            artist: Some("y".into()),
            ..Default::default()
        };
        store.set_metadata(meta.clone());
        store.apply_sample(PlaybackState::Paused, 5, 10);

        let snap = store.snapshot();
        assert_eq!(snap.state, PlaybackState::Paused);
        assert_eq!(snap.metadata, meta);
    }
}
