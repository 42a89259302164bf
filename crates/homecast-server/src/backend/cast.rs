//! Cast receiver backend (Google Cast, Default Media Receiver).
//!
//! A worker thread owns the connection to the bound device. `start` is
//! fire-and-forget: the load message is queued and the worker's status
//! poll observes what the receiver actually does, at most one interval
//! late.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rust_cast::CastDevice;
use rust_cast::channels::media::{IdleReason, Media, PlayerState, StreamType};
use rust_cast::channels::receiver::CastDeviceApp;

use homecast_types::PlaybackState;

use crate::backend::{BackendError, PlaybackBackend, RawStatus};
use crate::events::{EventSender, PlayerEvent};
use crate::models::{CastDeviceDescriptor, Track};

const DEFAULT_RECEIVER_ID: &str = "receiver-0";

#[derive(Debug)]
enum CastCommand {
    Load { url: String, content_type: String },
    Pause,
    Stop,
    SetVolume(f32),
    Quit,
}

pub struct CastBackend {
    cmd_tx: Sender<CastCommand>,
    shared: Arc<Mutex<RawStatus>>,
    media_base_url: Option<String>,
}

impl CastBackend {
    /// Spawn the worker thread bound to a discovered device.
    pub fn spawn(
        device: CastDeviceDescriptor,
        media_base_url: Option<String>,
        poll_interval: Duration,
        events: EventSender,
    ) -> Self {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let shared = Arc::new(Mutex::new(RawStatus::default()));
        let worker_shared = shared.clone();
        std::thread::spawn(move || worker_main(device, cmd_rx, worker_shared, events, poll_interval));
        Self {
            cmd_tx,
            shared,
            media_base_url,
        }
    }

    fn send(&self, cmd: CastCommand) -> Result<(), BackendError> {
        self.cmd_tx.send(cmd).map_err(|_| BackendError::Unreachable)
    }

    /// Backend with the worker end of the channel exposed instead of
    /// a live connection.
    #[cfg(test)]
    fn detached(media_base_url: Option<String>) -> (Self, Receiver<CastCommand>) {
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let backend = Self {
            cmd_tx,
            shared: Arc::new(Mutex::new(RawStatus::default())),
            media_base_url,
        };
        (backend, cmd_rx)
    }
}

impl PlaybackBackend for CastBackend {
    fn start(&mut self, track: &Track) -> Result<(), BackendError> {
        self.send(CastCommand::Load {
            url: stream_url(&track.path, self.media_base_url.as_deref()),
            content_type: content_type_for(&track.path).to_string(),
        })
    }

    fn pause(&mut self) -> Result<(), BackendError> {
        self.send(CastCommand::Pause)
    }

    fn stop(&mut self) -> Result<(), BackendError> {
        self.send(CastCommand::Stop)
    }

    fn set_volume(&mut self, level: i64) -> Result<(), BackendError> {
        self.send(CastCommand::SetVolume(cast_volume(level)))
    }

    fn sample(&self) -> RawStatus {
        self.shared.lock().unwrap().clone()
    }

    fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(CastCommand::Quit);
    }
}

impl Drop for CastBackend {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(CastCommand::Quit);
    }
}

/// Receiver volume scale is 0.0-1.0; orchestrator input is 0-100 and
/// is clamped before conversion.
pub fn cast_volume(level: i64) -> f32 {
    level.clamp(0, 100) as f32 / 100.0
}

/// Content id sent to the receiver: a stream URL when a public base is
/// configured, otherwise the raw path string.
pub fn stream_url(path: &Path, media_base_url: Option<&str>) -> String {
    match media_base_url {
        Some(base) => {
            let path_str = path.to_string_lossy();
            let encoded = urlencoding::encode(&path_str);
            format!("{}/stream?path={encoded}", base.trim_end_matches('/'))
        }
        None => path.to_string_lossy().to_string(),
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "flac" => "audio/flac",
        "mp3" => "audio/mpeg",
        "aac" => "audio/aac",
        "m4a" => "audio/mp4",
        "ogg" | "opus" => "audio/ogg",
        "wav" => "audio/wav",
        _ => "audio/mpeg",
    }
}

struct CastSession {
    device: CastDevice<'static>,
    transport_id: String,
    session_id: String,
    media_session_id: Option<i32>,
}

fn worker_main(
    descriptor: CastDeviceDescriptor,
    cmd_rx: Receiver<CastCommand>,
    shared: Arc<Mutex<RawStatus>>,
    events: EventSender,
    poll_interval: Duration,
) {
    let mut session: Option<CastSession> = None;
    let mut was_active = false;

    loop {
        match cmd_rx.recv_timeout(poll_interval) {
            Ok(CastCommand::Quit) => break,
            Ok(CastCommand::Load { url, content_type }) => {
                match ensure_session(&descriptor, &mut session)
                    .and_then(|sess| load_media(sess, &url, &content_type))
                {
                    Ok(()) => {
                        tracing::info!(device = %descriptor.name, url = %url, "cast: media loaded");
                        let _ = events.send(PlayerEvent::MediaStateChanged);
                    }
                    Err(err) => {
                        tracing::error!(error = %err, device = %descriptor.name, "cast: load failed");
                        session = None;
                    }
                }
            }
            Ok(CastCommand::Pause) => {
                let paused = shared.lock().unwrap().state == PlaybackState::Paused;
                if let Err(err) = toggle_pause(&mut session, paused) {
                    tracing::error!(error = %err, device = %descriptor.name, "cast: pause failed");
                    session = None;
                }
            }
            Ok(CastCommand::Stop) => {
                if let Err(err) = stop_media(&mut session) {
                    tracing::error!(error = %err, device = %descriptor.name, "cast: stop failed");
                    session = None;
                }
                *shared.lock().unwrap() = RawStatus::default();
                was_active = false;
                let _ = events.send(PlayerEvent::MediaStateChanged);
            }
            Ok(CastCommand::SetVolume(level)) => {
                if let Some(sess) = session.as_mut() {
                    if let Err(err) = sess.device.receiver.set_volume(level) {
                        tracing::error!(error = %err, device = %descriptor.name, "cast: volume failed");
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if let Some(sess) = session.as_mut() {
                    match poll_status(sess) {
                        Ok(Some(raw)) => {
                            let ended = was_active && raw.state == PlaybackState::Stopped;
                            was_active = raw.state != PlaybackState::Stopped;
                            *shared.lock().unwrap() = raw;
                            if ended {
                                let _ = events.send(PlayerEvent::MediaEndReached);
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            tracing::error!(error = %err, device = %descriptor.name, "cast: status poll failed");
                            session = None;
                        }
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn ensure_session<'a>(
    descriptor: &CastDeviceDescriptor,
    session: &'a mut Option<CastSession>,
) -> Result<&'a mut CastSession> {
    if session.is_none() {
        let device = CastDevice::connect_without_host_verification(
            descriptor.host.clone(),
            descriptor.port,
        )
        .context("connect to cast device")?;
        device
            .connection
            .connect(DEFAULT_RECEIVER_ID)
            .context("connect to receiver")?;
        let app = device
            .receiver
            .launch_app(&CastDeviceApp::DefaultMediaReceiver)
            .context("launch media receiver")?;
        device
            .connection
            .connect(app.transport_id.as_str())
            .context("connect to media app")?;
        *session = Some(CastSession {
            device,
            transport_id: app.transport_id,
            session_id: app.session_id,
            media_session_id: None,
        });
    }
    session
        .as_mut()
        .ok_or_else(|| anyhow::anyhow!("cast session unavailable"))
}

fn load_media(sess: &mut CastSession, url: &str, content_type: &str) -> Result<()> {
    sess.device
        .media
        .load(
            &sess.transport_id,
            &sess.session_id,
            &Media {
                content_id: url.to_string(),
                content_type: content_type.to_string(),
                stream_type: StreamType::Buffered,
                duration: None,
                metadata: None,
            },
        )
        .context("load media")?;
    sess.media_session_id = None;
    Ok(())
}

fn toggle_pause(session: &mut Option<CastSession>, currently_paused: bool) -> Result<()> {
    let Some(sess) = session.as_mut() else {
        return Ok(());
    };
    let Some(media_session_id) = media_session_id(sess)? else {
        return Ok(());
    };
    if currently_paused {
        sess.device
            .media
            .play(&sess.transport_id, media_session_id)
            .context("resume media")?;
    } else {
        sess.device
            .media
            .pause(&sess.transport_id, media_session_id)
            .context("pause media")?;
    }
    Ok(())
}

fn stop_media(session: &mut Option<CastSession>) -> Result<()> {
    let Some(sess) = session.as_mut() else {
        return Ok(());
    };
    let Some(media_session_id) = media_session_id(sess)? else {
        return Ok(());
    };
    sess.device
        .media
        .stop(&sess.transport_id, media_session_id)
        .context("stop media")?;
    sess.media_session_id = None;
    Ok(())
}

fn media_session_id(sess: &mut CastSession) -> Result<Option<i32>> {
    if sess.media_session_id.is_none() {
        let status = sess
            .device
            .media
            .get_status(&sess.transport_id, None)
            .context("media status")?;
        sess.media_session_id = status.entries.first().map(|e| e.media_session_id);
    }
    Ok(sess.media_session_id)
}

fn poll_status(sess: &mut CastSession) -> Result<Option<RawStatus>> {
    let status = sess
        .device
        .media
        .get_status(&sess.transport_id, None)
        .context("media status")?;
    let Some(entry) = status.entries.first() else {
        return Ok(None);
    };
    sess.media_session_id = Some(entry.media_session_id);
    let state = match entry.player_state {
        PlayerState::Playing | PlayerState::Buffering => PlaybackState::Playing,
        PlayerState::Paused => PlaybackState::Paused,
        PlayerState::Idle => PlaybackState::Stopped,
    };
    if matches!(entry.idle_reason, Some(IdleReason::Finished)) {
        sess.media_session_id = None;
    }
    let position_ms = entry
        .current_time
        .map(|secs| (secs * 1_000.0) as u64)
        .unwrap_or(0);
    let duration_ms = entry
        .media
        .as_ref()
        .and_then(|m| m.duration)
        .map(|secs| (secs * 1_000.0) as u64)
        .unwrap_or(0);
    Ok(Some(RawStatus {
        state,
        position_ms,
        duration_ms,
    }))
}
