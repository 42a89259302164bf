//! Playback orchestrator.
//!
//! Single writer for the playlist, the bound backend, and the session
//! lifecycle. Every host command and player event lands here.

use std::path::{Path, PathBuf};

use homecast_types::MediaStatus;

use crate::backend::{PlaybackBackend, RawStatus};
use crate::events::PlayerEvent;
use crate::library;
use crate::models::{CastDeviceDescriptor, PlayOrder, Track};
use crate::playlist::Playlist;
use crate::sync::Synchronizer;

/// Lifecycle of the current playback session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Playing,
    Paused,
    Stopped,
}

/// Everything the synchronizer needs to sample: the bound backend,
/// the playlist, and the track most recently handed to the backend.
pub struct PlaybackSession {
    playlist: Playlist,
    device: Option<CastDeviceDescriptor>,
    backend: Box<dyn PlaybackBackend>,
    state: SessionState,
    now_playing: Option<Track>,
}

impl PlaybackSession {
    pub fn new(
        playlist: Playlist,
        device: Option<CastDeviceDescriptor>,
        backend: Box<dyn PlaybackBackend>,
    ) -> Self {
        Self {
            playlist,
            device,
            backend,
            state: SessionState::Idle,
            now_playing: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub fn sample(&self) -> RawStatus {
        self.backend.sample()
    }

    pub fn now_playing_path(&self) -> Option<PathBuf> {
        self.now_playing.as_ref().map(|t| t.path.clone())
    }

    #[cfg(test)]
    pub fn set_now_playing(&mut self, track: Option<Track>) {
        self.now_playing = track;
    }
}

pub struct Orchestrator {
    session: PlaybackSession,
    sync: Synchronizer,
    media_dir: Option<PathBuf>,
    playlist_path: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        session: PlaybackSession,
        sync: Synchronizer,
        media_dir: Option<PathBuf>,
        playlist_path: Option<PathBuf>,
    ) -> Self {
        Self {
            session,
            sync,
            media_dir,
            playlist_path,
        }
    }

    /// Relative command paths resolve against the configured media
    /// root; absolute paths pass through untouched.
    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.media_dir {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn snapshot(&self) -> MediaStatus {
        self.sync.status().snapshot()
    }

    pub fn playlist(&self) -> &Playlist {
        &self.session.playlist
    }

    /// Re-sample the backend into the shared snapshot.
    pub fn refresh(&mut self) {
        self.sync.refresh(&mut self.session);
    }

    pub fn handle_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::MediaEndReached => {
                tracing::debug!("media end reached");
                self.play_current();
            }
            PlayerEvent::MediaStateChanged => self.refresh(),
        }
    }

    /// Start the track under the cursor and advance the cursor.
    ///
    /// The cursor moves when playback is dispatched, not when the
    /// track finishes, so the end-of-media handler only has to call
    /// this again. An exhausted playlist logs and leaves the session
    /// untouched.
    pub fn play_current(&mut self) {
        let Some(track) = self.session.playlist.current().cloned() else {
            tracing::warn!("playlist exhausted, nothing to play");
            if self.session.state != SessionState::Idle {
                self.session.state = SessionState::Stopped;
                self.session.now_playing = None;
                self.refresh();
            }
            return;
        };
        match self.session.backend.start(&track) {
            Ok(()) => {
                tracing::info!(track = %track.file_name(), "starting playback");
                self.session.now_playing = Some(track);
                self.session.state = SessionState::Loading;
                self.session.playlist.advance();
                self.refresh();
            }
            Err(err) => {
                tracing::error!(error = %err, track = %track.file_name(), "failed to start playback");
            }
        }
    }

    /// Toggle pause on the active session; no-op while idle.
    pub fn pause(&mut self) {
        match self.session.state {
            SessionState::Idle | SessionState::Stopped => {
                tracing::debug!("pause ignored, no active session");
            }
            _ => {
                if let Err(err) = self.session.backend.pause() {
                    tracing::error!(error = %err, "pause failed");
                }
                self.refresh();
            }
        }
    }

    /// Stop playback and force the idle snapshot.
    pub fn stop(&mut self) {
        if self.session.state == SessionState::Idle {
            self.sync.status().reset_idle();
            return;
        }
        if let Err(err) = self.session.backend.stop() {
            tracing::error!(error = %err, "stop failed");
        }
        self.session.state = SessionState::Stopped;
        self.session.now_playing = None;
        self.sync.status().reset_idle();
    }

    /// Volume on a 0-100 scale; each backend owns its own conversion.
    pub fn set_volume(&mut self, level: i64) {
        if let Err(err) = self.session.backend.set_volume(level) {
            tracing::error!(error = %err, level, "set volume failed");
        }
    }

    pub fn add_to_playlist(&mut self, path: &Path) {
        let path = self.resolve(path);
        tracing::info!(path = %path.display(), "enqueueing track");
        self.session.playlist.enqueue(Track::new(path));
        self.persist_playlist();
    }

    /// Replace the playlist with a shuffled listing of `folder` and,
    /// when a cast device is bound, start playing immediately.
    pub fn play_random_from_folder(&mut self, folder: &Path) {
        let folder = &self.resolve(folder);
        let files = match library::list_folder(folder) {
            Ok(files) => files,
            Err(err) => {
                tracing::warn!(error = %err, folder = %folder.display(), "folder listing failed");
                return;
            }
        };
        if files.is_empty() {
            tracing::warn!(folder = %folder.display(), "no media files in folder");
            return;
        }
        let count = files.len();
        let tracks = files.into_iter().map(Track::new).collect();
        self.session.playlist.replace(tracks, PlayOrder::Shuffled);
        self.persist_playlist();
        tracing::info!(count, folder = %folder.display(), "playlist replaced with shuffled folder");
        if self.session.device.is_some() {
            self.play_current();
        }
    }

    /// Append all tracks under `folder` whose file name contains
    /// `query`, rewind the cursor, and start playing.
    pub fn play_search_results(&mut self, folder: &Path, query: &str) {
        let folder = &self.resolve(folder);
        let matches = match library::search(folder, query) {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!(error = %err, folder = %folder.display(), "search failed");
                return;
            }
        };
        if matches.is_empty() {
            tracing::warn!(query, folder = %folder.display(), "no matching media");
            return;
        }
        let count = matches.len();
        self.session
            .playlist
            .extend(matches.into_iter().map(Track::new));
        self.session.playlist.reset_cursor();
        self.persist_playlist();
        tracing::info!(count, query, "queued search results");
        self.play_current();
    }

    pub fn shutdown(&mut self) {
        self.session.backend.shutdown();
    }

    fn persist_playlist(&self) {
        if let Some(path) = &self.playlist_path {
            if let Err(err) = self.session.playlist.save(path) {
                tracing::warn!(error = %err, path = %path.display(), "playlist save failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::time::{SystemTime, UNIX_EPOCH};

    use homecast_types::PlaybackState;

    use crate::backend::BackendError;
    use crate::metadata::MetadataResolver;
    use crate::status::StatusStore;

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Start(PathBuf),
        Pause,
        Stop,
        SetVolume(i64),
    }

    #[derive(Clone, Default)]
    struct MockBackend {
        calls: Arc<Mutex<Vec<Call>>>,
        raw: Arc<Mutex<RawStatus>>,
    }

    impl MockBackend {
        fn set_raw(&self, state: PlaybackState, position_ms: u64, duration_ms: u64) {
            *self.raw.lock().unwrap() = RawStatus {
                state,
                position_ms,
                duration_ms,
            };
        }

        fn calls(&self) -> Vec<Call> {
            std::mem::take(&mut self.calls.lock().unwrap())
        }
    }

    impl PlaybackBackend for MockBackend {
        fn start(&mut self, track: &Track) -> Result<(), BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Start(track.path.clone()));
            self.set_raw(PlaybackState::Playing, 0, 1_000);
            Ok(())
        }
        fn pause(&mut self) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(Call::Pause);
            Ok(())
        }
        fn stop(&mut self) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(Call::Stop);
            self.set_raw(PlaybackState::Stopped, 0, 0);
            Ok(())
        }
        fn set_volume(&mut self, level: i64) -> Result<(), BackendError> {
            self.calls.lock().unwrap().push(Call::SetVolume(level));
            Ok(())
        }
        fn sample(&self) -> RawStatus {
            self.raw.lock().unwrap().clone()
        }
        fn shutdown(&mut self) {}
    }

    fn make_orchestrator(
        tracks: Vec<Track>,
        device: Option<CastDeviceDescriptor>,
    ) -> (Orchestrator, MockBackend) {
        let backend = MockBackend::default();
        let mut playlist = Playlist::new();
        playlist.extend(tracks);
        let session = PlaybackSession::new(playlist, device, Box::new(backend.clone()));
        let sync = Synchronizer::new(StatusStore::new(), MetadataResolver::new());
        (Orchestrator::new(session, sync, None, None), backend)
    }

    fn test_device() -> CastDeviceDescriptor {
        CastDeviceDescriptor {
            name: "Den".into(),
            host: "192.168.1.10".into(),
            port: 8009,
        }
    }

    fn temp_media_dir(files: &[&str]) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .subsec_nanos();
        let dir = std::env::temp_dir().join(format!("homecast-orch-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        for name in files {
            fs::write(dir.join(name), b"x").unwrap();
        }
        dir
    }

    #[test]
    fn plays_through_playlist_then_goes_idle() {
        let (mut orch, backend) = make_orchestrator(
            vec![Track::new("/m/a.mp3"), Track::new("/m/b.mp3")],
            None,
        );

        orch.play_current();
        assert_eq!(orch.playlist().cursor(), 1);
        assert_eq!(backend.calls(), vec![Call::Start(PathBuf::from("/m/a.mp3"))]);
        assert_eq!(orch.snapshot().state, PlaybackState::Playing);

        backend.set_raw(PlaybackState::Stopped, 0, 0);
        orch.handle_event(PlayerEvent::MediaEndReached);
        assert_eq!(orch.playlist().cursor(), 2);
        assert_eq!(backend.calls(), vec![Call::Start(PathBuf::from("/m/b.mp3"))]);

        backend.set_raw(PlaybackState::Stopped, 0, 0);
        orch.handle_event(PlayerEvent::MediaEndReached);
        assert!(backend.calls().is_empty());
        assert_eq!(orch.snapshot(), MediaStatus::idle());
    }

    #[test]
    fn controls_are_noops_while_idle() {
        let (mut orch, backend) = make_orchestrator(vec![], None);

        orch.pause();
        orch.stop();

        assert_eq!(orch.snapshot(), MediaStatus::idle());
        assert_eq!(backend.calls(), vec![]);
    }

    #[test]
    fn stop_forces_idle_snapshot() {
        let (mut orch, backend) = make_orchestrator(vec![Track::new("/m/a.mp3")], None);
        orch.play_current();
        assert_eq!(orch.snapshot().state, PlaybackState::Playing);

        orch.stop();

        assert_eq!(orch.snapshot(), MediaStatus::idle());
        assert!(backend.calls().contains(&Call::Stop));
        // Cursor stays where dispatch left it.
        assert_eq!(orch.playlist().cursor(), 1);
    }

    #[test]
    fn volume_passes_through_unclamped() {
        let (mut orch, backend) = make_orchestrator(vec![], None);

        orch.set_volume(150);

        assert_eq!(backend.calls(), vec![Call::SetVolume(150)]);
    }

    #[test]
    fn random_folder_autostarts_only_with_device() {
        let dir = temp_media_dir(&["a.mp3", "b.mp3", "c.mp3"]);

        let (mut orch, backend) = make_orchestrator(vec![], None);
        orch.play_random_from_folder(&dir);
        assert_eq!(orch.playlist().len(), 3);
        assert_eq!(orch.playlist().cursor(), 0);
        assert!(backend.calls().is_empty());

        let (mut orch, backend) = make_orchestrator(vec![], Some(test_device()));
        orch.play_random_from_folder(&dir);
        assert_eq!(orch.playlist().len(), 3);
        assert_eq!(orch.playlist().cursor(), 1);
        assert_eq!(backend.calls().len(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn search_appends_rewinds_and_starts() {
        let dir = temp_media_dir(&["jazz1.mp3", "rock.mp3"]);
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("sub/jazz2.mp3"), b"x").unwrap();

        let (mut orch, backend) = make_orchestrator(vec![Track::new("/m/old.mp3")], None);
        orch.play_current();
        backend.calls();

        orch.play_search_results(&dir, "jazz");

        assert_eq!(orch.playlist().len(), 3);
        assert_eq!(orch.playlist().cursor(), 1);
        let calls = backend.calls();
        assert_eq!(calls, vec![Call::Start(PathBuf::from("/m/old.mp3"))]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn relative_paths_resolve_against_media_dir() {
        let root = temp_media_dir(&[]);
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/a.mp3"), b"x").unwrap();

        let backend = MockBackend::default();
        let session =
            PlaybackSession::new(Playlist::new(), Some(test_device()), Box::new(backend.clone()));
        let sync = Synchronizer::new(StatusStore::new(), MetadataResolver::new());
        let mut orch = Orchestrator::new(session, sync, Some(root.clone()), None);

        orch.play_random_from_folder(Path::new("sub"));
        assert_eq!(
            backend.calls(),
            vec![Call::Start(root.join("sub").join("a.mp3"))]
        );

        orch.add_to_playlist(Path::new("x.mp3"));
        assert_eq!(
            orch.playlist().tracks().last().unwrap().path,
            root.join("x.mp3")
        );

        // Absolute paths skip the media root.
        orch.add_to_playlist(Path::new("/elsewhere/y.mp3"));
        assert_eq!(
            orch.playlist().tracks().last().unwrap().path,
            PathBuf::from("/elsewhere/y.mp3")
        );

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn empty_search_leaves_playlist_untouched() {
        let dir = temp_media_dir(&["rock.mp3"]);

        let (mut orch, backend) = make_orchestrator(vec![], None);
        orch.play_search_results(&dir, "jazz");

        assert!(orch.playlist().is_empty());
        assert!(backend.calls().is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }
}
