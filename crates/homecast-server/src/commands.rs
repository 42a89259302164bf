//! Host command parsing and dispatch.
//!
//! Commands arrive as JSON objects tagged by a `command` field.
//! Unknown commands and payloads with missing or mistyped fields are
//! logged and skipped; a bad message never tears down the loop.

use std::path::PathBuf;

use serde::Deserialize;

use crate::orchestrator::Orchestrator;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    PlayMedia,
    PauseMedia,
    StopMedia,
    SetVolume { volume_level: i64 },
    AddToPlaylist { file_path: PathBuf },
    PlayRandomFolder { folder_path: PathBuf },
    PlaySearch { folder_path: PathBuf, query: String },
}

impl Command {
    /// Parse one host message. `None` means the message was dropped
    /// (and logged), not that the stream should end.
    pub fn parse(line: &str) -> Option<Command> {
        match serde_json::from_str::<Command>(line) {
            Ok(cmd) => Some(cmd),
            Err(err) => {
                tracing::warn!(error = %err, line, "skipping unparseable command");
                None
            }
        }
    }
}

pub fn dispatch(orchestrator: &mut Orchestrator, command: Command) {
    tracing::debug!(?command, "dispatching command");
    match command {
        Command::PlayMedia => orchestrator.play_current(),
        Command::PauseMedia => orchestrator.pause(),
        Command::StopMedia => orchestrator.stop(),
        Command::SetVolume { volume_level } => orchestrator.set_volume(volume_level),
        Command::AddToPlaylist { file_path } => orchestrator.add_to_playlist(&file_path),
        Command::PlayRandomFolder { folder_path } => {
            orchestrator.play_random_from_folder(&folder_path)
        }
        Command::PlaySearch { folder_path, query } => {
            orchestrator.play_search_results(&folder_path, &query)
        }
    }
}
