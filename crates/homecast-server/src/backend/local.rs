//! Local playback worker.
//!
//! A dedicated thread owns the rodio output stream and sink (the
//! stream handle cannot leave its thread); commands arrive over a
//! crossbeam channel and a shared sample is refreshed by the worker's
//! own poll loop.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};

use homecast_types::PlaybackState;

use crate::backend::{BackendError, PlaybackBackend, RawStatus};
use crate::events::{EventSender, PlayerEvent};
use crate::metadata::probe_duration_ms;
use crate::models::Track;

const WORKER_POLL: Duration = Duration::from_millis(250);

#[derive(Debug)]
enum LocalCommand {
    Play(PathBuf),
    Pause,
    Stop,
    SetVolume(i64),
    Quit,
}

pub struct LocalBackend {
    cmd_tx: Sender<LocalCommand>,
    shared: Arc<Mutex<RawStatus>>,
}

impl LocalBackend {
    /// Spawn the worker thread and return its handle.
    pub fn spawn(events: EventSender) -> Self {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(Mutex::new(RawStatus::default()));
        let worker_shared = shared.clone();
        std::thread::spawn(move || worker_main(cmd_rx, worker_shared, events));
        Self { cmd_tx, shared }
    }

    fn send(&self, cmd: LocalCommand) -> Result<(), BackendError> {
        self.cmd_tx.send(cmd).map_err(|_| BackendError::Unreachable)
    }
}

impl PlaybackBackend for LocalBackend {
    fn start(&mut self, track: &Track) -> Result<(), BackendError> {
        self.send(LocalCommand::Play(track.path.clone()))
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.send(LocalCommand::Pause)
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.send(LocalCommand::Stop)
    }

    fn set_volume(&mut self, level: i64) -> Result<(), BackendError> {
        // Passed through unclamped on the local path; rodio treats the
        // value as a linear gain once divided down.
        self.send(LocalCommand::SetVolume(level))
    }

    fn sample(&self) -> RawStatus {
        self.shared.lock().unwrap().clone()
    }

    fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(LocalCommand::Quit);
    }
}

impl Drop for LocalBackend {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(LocalCommand::Quit);
    }
}

fn worker_main(
    cmd_rx: Receiver<LocalCommand>,
    shared: Arc<Mutex<RawStatus>>,
    events: EventSender,
) {
    let mut stream: Option<OutputStream> = match OutputStreamBuilder::open_default_stream() {
        Ok(stream) => Some(stream),
        Err(err) => {
            tracing::warn!(error = %err, "no local audio output device");
            None
        }
    };
    if let Some(stream) = stream.as_mut() {
        stream.log_on_drop(false);
    }

    let mut sink: Option<Sink> = None;
    let mut duration_ms: u64 = 0;
    let mut volume: f32 = 1.0;

    loop {
        match cmd_rx.recv_timeout(WORKER_POLL) {
            Ok(LocalCommand::Quit) => {
                if let Some(sink) = sink.take() {
                    sink.stop();
                }
                break;
            }
            Ok(LocalCommand::Play(path)) => {
                if let Some(old) = sink.take() {
                    old.stop();
                }
                duration_ms = probe_duration_ms(&path).unwrap_or(0);
                match start_sink(stream.as_ref(), &path, volume) {
                    Ok(new_sink) => {
                        sink = Some(new_sink);
                        set_shared(&shared, PlaybackState::Playing, 0, duration_ms);
                        let _ = events.send(PlayerEvent::MediaStateChanged);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, path = %path.display(), "local playback failed");
                        set_shared(&shared, PlaybackState::Stopped, 0, 0);
                        // Let the playlist move on instead of stalling.
                        let _ = events.send(PlayerEvent::MediaEndReached);
                    }
                }
            }
            Ok(LocalCommand::Pause) => {
                if let Some(sink) = sink.as_ref() {
                    if sink.is_paused() {
                        sink.play();
                    } else {
                        sink.pause();
                    }
                    refresh_shared(&shared, sink, duration_ms);
                    let _ = events.send(PlayerEvent::MediaStateChanged);
                }
            }
            Ok(LocalCommand::Stop) => {
                if let Some(sink) = sink.take() {
                    sink.stop();
                    set_shared(&shared, PlaybackState::Stopped, 0, 0);
                    let _ = events.send(PlayerEvent::MediaStateChanged);
                }
            }
            Ok(LocalCommand::SetVolume(level)) => {
                volume = level as f32 / 100.0;
                if let Some(sink) = sink.as_ref() {
                    sink.set_volume(volume);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                let finished = sink.as_ref().map(|s| s.empty()).unwrap_or(false);
                if finished {
                    sink = None;
                    set_shared(&shared, PlaybackState::Stopped, 0, 0);
                    let _ = events.send(PlayerEvent::MediaEndReached);
                } else if let Some(sink) = sink.as_ref() {
                    refresh_shared(&shared, sink, duration_ms);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn start_sink(stream: Option<&OutputStream>, path: &Path, volume: f32) -> anyhow::Result<Sink> {
    let stream = stream.ok_or_else(|| anyhow::anyhow!("no output device"))?;
    let file = File::open(path)?;
    let source = Decoder::new(BufReader::new(file))?;
    let sink = Sink::connect_new(stream.mixer());
    sink.set_volume(volume);
    sink.append(source);
    sink.play();
    Ok(sink)
}

fn refresh_shared(shared: &Arc<Mutex<RawStatus>>, sink: &Sink, duration_ms: u64) {
    let state = if sink.is_paused() {
        PlaybackState::Paused
    } else {
        PlaybackState::Playing
    };
    set_shared(shared, state, sink.get_pos().as_millis() as u64, duration_ms);
}

fn set_shared(shared: &Arc<Mutex<RawStatus>>, state: PlaybackState, position_ms: u64, duration_ms: u64) {
    *shared.lock().unwrap() = RawStatus {
        state,
        position_ms,
        duration_ms,
    };
}
