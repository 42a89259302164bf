//! State synchronizer.
//!
//! Samples the active backend into the shared `MediaStatus` snapshot
//! and drives the Loading -> Playing transition. Runs on the control
//! loop tick and immediately after every state-changing call.

use homecast_types::PlaybackState;

use crate::metadata::MetadataResolver;
use crate::orchestrator::{PlaybackSession, SessionState};
use crate::status::StatusStore;

pub struct Synchronizer {
    status: StatusStore,
    resolver: MetadataResolver,
}

impl Synchronizer {
    pub fn new(status: StatusStore, resolver: MetadataResolver) -> Self {
        Self { status, resolver }
    }

    pub fn status(&self) -> &StatusStore {
        &self.status
    }

    #[cfg(test)]
    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    /// Recompute the snapshot from the session's backend.
    ///
    /// Idle and stopped sessions are forced to the zeroed snapshot
    /// instead of sampled. Metadata is resolved only while the raw
    /// state is playing, so tracks that never start are never probed.
    pub fn refresh(&mut self, session: &mut PlaybackSession) {
        match session.state() {
            SessionState::Idle | SessionState::Stopped => {
                self.status.reset_idle();
                return;
            }
            _ => {}
        }

        let raw = session.sample();
        match (session.state(), raw.state) {
            (SessionState::Loading, PlaybackState::Playing) => {
                session.set_state(SessionState::Playing);
            }
            (SessionState::Playing, PlaybackState::Paused) => {
                session.set_state(SessionState::Paused);
            }
            (SessionState::Paused, PlaybackState::Playing) => {
                session.set_state(SessionState::Playing);
            }
            _ => {}
        }

        self.status
            .apply_sample(raw.state, raw.position_ms, raw.duration_ms);
        if raw.state == PlaybackState::Playing {
            if let Some(path) = session.now_playing_path() {
                let metadata = self.resolver.resolve(&path);
                self.status.set_metadata(metadata);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use homecast_types::MediaStatus;

    use crate::backend::{BackendError, PlaybackBackend, RawStatus};
    use crate::models::Track;
    use crate::playlist::Playlist;

    struct ScriptedBackend {
        raw: Arc<Mutex<RawStatus>>,
    }

    impl PlaybackBackend for ScriptedBackend {
        fn start(&mut self, _track: &Track) -> Result<(), BackendError> {
            Ok(())
        }
        fn pause(&mut self) -> Result<(), BackendError> {
            Ok(())
        }
        fn stop(&mut self) -> Result<(), BackendError> {
            Ok(())
        }
        fn set_volume(&mut self, _level: i64) -> Result<(), BackendError> {
            Ok(())
        }
        fn sample(&self) -> RawStatus {
            self.raw.lock().unwrap().clone()
        }
        fn shutdown(&mut self) {}
    }

    fn make_session(raw: Arc<Mutex<RawStatus>>) -> PlaybackSession {
        PlaybackSession::new(Playlist::new(), None, Box::new(ScriptedBackend { raw }))
    }

    #[test]
    fn idle_session_forces_zeroed_snapshot() {
        let raw = Arc::new(Mutex::new(RawStatus {
            state: PlaybackState::Playing,
            position_ms: 42,
            duration_ms: 99,
        }));
        let mut session = make_session(raw);
        let mut sync = Synchronizer::new(StatusStore::new(), MetadataResolver::new());

        sync.refresh(&mut session);

        assert_eq!(sync.status().snapshot(), MediaStatus::idle());
    }

    #[test]
    fn loading_becomes_playing_when_backend_reports_it() {
        let raw = Arc::new(Mutex::new(RawStatus::default()));
        let mut session = make_session(raw.clone());
        session.set_state(SessionState::Loading);
        let mut sync = Synchronizer::new(StatusStore::new(), MetadataResolver::new());

        sync.refresh(&mut session);
        assert_eq!(session.state(), SessionState::Loading);

        raw.lock().unwrap().state = PlaybackState::Playing;
        sync.refresh(&mut session);
        assert_eq!(session.state(), SessionState::Playing);
    }

    #[test]
    fn metadata_resolved_only_while_playing() {
        let path = PathBuf::from("/nonexistent/track.mp3");
        let raw = Arc::new(Mutex::new(RawStatus {
            state: PlaybackState::Paused,
            position_ms: 0,
            duration_ms: 0,
        }));
        let mut session = make_session(raw.clone());
        session.set_state(SessionState::Paused);
        session.set_now_playing(Some(Track::new(path.clone())));
        let mut sync = Synchronizer::new(StatusStore::new(), MetadataResolver::new());

        sync.refresh(&mut session);
        assert!(sync.resolver().cached(&path).is_none());

        raw.lock().unwrap().state = PlaybackState::Playing;
        sync.refresh(&mut session);
        assert!(sync.resolver().cached(&path).is_some());
    }
}
