//! Control loop.
//!
//! Single-threaded owner of the orchestrator: multiplexes host
//! commands, backend events, the synchronizer tick, and shutdown over
//! one `select!`, and writes the status snapshot to stdout whenever it
//! changes.

use std::time::Duration;

use crossbeam_channel::{Receiver, select, tick};

use homecast_types::MediaStatus;

use crate::commands::{self, Command};
use crate::events::EventReceiver;
use crate::orchestrator::Orchestrator;

pub fn run(
    mut orchestrator: Orchestrator,
    host_commands: Receiver<String>,
    events: EventReceiver,
    shutdown: Receiver<()>,
    poll_interval: Duration,
) {
    let ticker = tick(poll_interval);
    let mut last = orchestrator.snapshot();
    emit(&last);

    loop {
        select! {
            recv(host_commands) -> msg => match msg {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        if let Some(cmd) = Command::parse(line) {
                            commands::dispatch(&mut orchestrator, cmd);
                        }
                    }
                }
                Err(_) => {
                    tracing::info!("command stream closed; shutting down");
                    break;
                }
            },
            recv(events) -> msg => match msg {
                Ok(event) => orchestrator.handle_event(event),
                Err(_) => {
                    tracing::warn!("event channel closed; shutting down");
                    break;
                }
            },
            recv(ticker) -> _ => orchestrator.refresh(),
            recv(shutdown) -> _ => {
                tracing::info!("shutdown requested");
                break;
            }
        }

        let snapshot = orchestrator.snapshot();
        if snapshot != last {
            emit(&snapshot);
            last = snapshot;
        }
    }

    orchestrator.shutdown();
}

fn emit(status: &MediaStatus) {
    match serde_json::to_string(status) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::warn!(error = %err, "status serialization failed"),
    }
}
