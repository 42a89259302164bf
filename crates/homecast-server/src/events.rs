//! Backend-originated playback events.
//!
//! Backends publish onto a crossbeam channel; the control loop is the
//! single consumer.

use crossbeam_channel::{Receiver, Sender};

/// Events emitted by whichever backend is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The current track finished on its own.
    MediaEndReached,
    /// The backend's raw state changed; resample immediately.
    MediaStateChanged,
}

pub type EventSender = Sender<PlayerEvent>;
pub type EventReceiver = Receiver<PlayerEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    crossbeam_channel::unbounded()
}
