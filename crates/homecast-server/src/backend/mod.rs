//! Playback backend abstraction.
//!
//! One contract, two implementations: an in-process local player and a
//! networked cast receiver. The branch between them happens once, at
//! session-bind time.

pub mod cast;
pub mod local;

use homecast_types::PlaybackState;

use crate::models::Track;

/// Errors a backend can surface to the orchestrator.
#[derive(Debug, PartialEq, Eq)]
pub enum BackendError {
    /// The worker channel or the remote receiver is gone.
    Unreachable,
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Unreachable => write!(f, "playback backend unreachable"),
        }
    }
}

impl std::error::Error for BackendError {}

/// Raw state sampled from the live backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawStatus {
    pub state: PlaybackState,
    pub position_ms: u64,
    pub duration_ms: u64,
}

/// Contract shared by the local and cast variants.
///
/// `pause`, `stop`, and `set_volume` are no-ops (not errors) when
/// nothing is currently loaded. `start` on the cast variant is
/// fire-and-forget; the synchronizer observes the actual state later.
pub trait PlaybackBackend: Send {
    fn start(&mut self, track: &Track) -> Result<(), BackendError>;
    fn pause(&mut self) -> Result<(), BackendError>;
    fn stop(&mut self) -> Result<(), BackendError>;
    /// Volume on the orchestrator boundary is a 0-100 integer scale;
    /// each variant owns its own unit conversion.
    fn set_volume(&mut self, level: i64) -> Result<(), BackendError>;
    fn sample(&self) -> RawStatus;
    /// Release worker resources; further calls become no-ops.
    fn shutdown(&mut self);
}
