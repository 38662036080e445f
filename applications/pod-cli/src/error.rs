//! CLI error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Library error: {0}")]
    Library(String),

    #[error("{0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Playback(#[from] pod_playback::PlaybackError),
}

pub type Result<T> = std::result::Result<T, CliError>;
