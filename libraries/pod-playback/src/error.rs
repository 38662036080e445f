//! Error types for playback management

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No episode is currently loaded
    #[error("No episode loaded")]
    NoEpisodeLoaded,

    /// The live audio source refused to load or play
    #[error("Media error: {0}")]
    Media(String),

    /// A repository round-trip failed
    #[error("Repository error: {0}")]
    Repository(#[from] pod_core::PodError),

    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
