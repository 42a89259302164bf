mod backend;
mod commands;
mod config;
mod control;
mod discovery;
mod events;
mod library;
mod metadata;
mod models;
mod orchestrator;
mod playlist;
mod status;
mod sync;

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crossbeam_channel::Sender;
use tracing_subscriber::EnvFilter;

use crate::backend::PlaybackBackend;
use crate::backend::cast::CastBackend;
use crate::backend::local::LocalBackend;
use crate::config::ServerConfig;
use crate::metadata::MetadataResolver;
use crate::orchestrator::{Orchestrator, PlaybackSession};
use crate::playlist::Playlist;
use crate::status::StatusStore;
use crate::sync::Synchronizer;

#[derive(Parser, Debug)]
#[command(name = "homecast-server")]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Media library root; overrides the config file. Relative
    /// folder and file paths in commands resolve against it.
    #[arg(long)]
    media_dir: Option<PathBuf>,

    /// Cast receiver friendly name; overrides the config file.
    /// Without one, playback stays on the local audio output.
    #[arg(long)]
    device: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,homecast_server=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::load_or_default(args.config.as_deref())?;
    let poll_interval = config.poll_interval();

    let (event_tx, event_rx) = events::channel();

    let device_name = args.device.or_else(|| config.cast_device.clone());
    let device = device_name
        .as_deref()
        .and_then(|name| discovery::find_device(name, config.discovery_timeout()));
    let backend: Box<dyn PlaybackBackend> = match &device {
        Some(descriptor) => {
            tracing::info!(device = %descriptor.name, "binding cast backend");
            Box::new(CastBackend::spawn(
                descriptor.clone(),
                config.media_base_url.clone(),
                poll_interval,
                event_tx.clone(),
            ))
        }
        None => {
            tracing::info!("binding local backend");
            Box::new(LocalBackend::spawn(event_tx.clone()))
        }
    };

    let playlist = match &config.playlist_path {
        Some(path) => Playlist::load_or_empty(path),
        None => Playlist::new(),
    };
    tracing::info!(tracks = playlist.len(), "playlist ready");

    let media_dir = args.media_dir.or_else(|| config.media_dir.clone());
    let session = PlaybackSession::new(playlist, device, backend);
    let sync = Synchronizer::new(StatusStore::new(), MetadataResolver::new());
    let orchestrator = Orchestrator::new(session, sync, media_dir, config.playlist_path.clone());

    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
    spawn_stdin_reader(cmd_tx);

    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    let _ = ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    });

    control::run(orchestrator, cmd_rx, event_rx, shutdown_rx, poll_interval);
    tracing::info!("homecast-server stopped");
    Ok(())
}

/// Read newline-delimited JSON commands from stdin; EOF closes the
/// channel, which the control loop treats as shutdown.
fn spawn_stdin_reader(cmd_tx: Sender<String>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if cmd_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "stdin read failed");
                    break;
                }
            }
        }
    });
}
