//! Core types for playback management

use pod_core::types::{Episode, QueueEntry};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{PlaybackError, Result};

/// Volume range accepted by the session
pub const VOLUME_RANGE: (f64, f64) = (0.0, 1.0);

/// Playback rate range accepted by the session
pub const PLAYBACK_RATE_RANGE: (f64, f64) = (0.5, 3.0);

/// Share of the duration after which an episode counts as finished
pub const COMPLETION_THRESHOLD: f64 = 0.95;

/// Lifecycle phase of the playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    /// No episode loaded
    #[default]
    Idle,

    /// Source assigned, not yet playable
    Loading,

    /// Playable, not playing
    Paused,

    /// Currently playing
    Playing,

    /// Reached the end of the episode
    Ended,

    /// Load or playback failed
    Error,
}

/// Observable state of the playback session
///
/// Published in full on every change, so consumers never need to diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Episode bound to the live source
    pub current_episode: Option<Episode>,

    /// State machine phase
    pub phase: PlaybackPhase,

    /// Whether audio is playing
    pub is_playing: bool,

    /// Position in seconds
    pub position: f64,

    /// Duration in seconds (`0` while unknown)
    pub duration: f64,

    /// Volume in `[0, 1]`
    pub volume: f64,

    /// Playback rate in `[0.5, 3.0]`
    pub playback_rate: f64,

    /// Waiting for the source to become playable
    pub is_loading: bool,

    /// Last load/playback failure
    pub error: Option<String>,

    /// Mute flag, independent of `volume`
    pub is_muted: bool,
}

impl SessionSnapshot {
    /// Idle session with the given output settings
    pub fn idle(volume: f64, playback_rate: f64) -> Self {
        Self {
            current_episode: None,
            phase: PlaybackPhase::Idle,
            is_playing: false,
            position: 0.0,
            duration: 0.0,
            volume,
            playback_rate,
            is_loading: false,
            error: None,
            is_muted: false,
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::idle(1.0, 1.0)
    }
}

/// Observable state of the queue store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Entries in ascending position order
    pub entries: Vec<QueueEntry>,

    /// Index of the entry whose episode is playing
    pub current_index: Option<usize>,

    /// Last failed queue operation
    pub error: Option<String>,
}

/// Configuration for the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Quiet period before a debounced progress write (default: 10000)
    pub debounce_ms: u64,

    /// Interval of unconditional writes while playing (default: 5000)
    pub periodic_save_ms: u64,

    /// Default skip-forward step in seconds (default: 30)
    pub skip_forward_secs: f64,

    /// Default skip-backward step in seconds (default: 15)
    pub skip_backward_secs: f64,

    /// Initial volume (default: 1.0)
    pub volume: f64,

    /// Initial playback rate (default: 1.0)
    pub playback_rate: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 10_000,
            periodic_save_ms: 5_000,
            skip_forward_secs: 30.0,
            skip_backward_secs: 15.0,
            volume: 1.0,
            playback_rate: 1.0,
        }
    }
}

impl PlaybackConfig {
    /// Debounce window as a `Duration`
    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Periodic save interval as a `Duration`
    pub fn periodic_interval(&self) -> Duration {
        Duration::from_millis(self.periodic_save_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(PlaybackError::InvalidConfig(
                "debounce_ms must be greater than zero".to_string(),
            ));
        }

        if self.periodic_save_ms == 0 {
            return Err(PlaybackError::InvalidConfig(
                "periodic_save_ms must be greater than zero".to_string(),
            ));
        }

        if !(VOLUME_RANGE.0..=VOLUME_RANGE.1).contains(&self.volume) {
            return Err(PlaybackError::InvalidConfig(format!(
                "volume {} outside [0, 1]",
                self.volume
            )));
        }

        if !(PLAYBACK_RATE_RANGE.0..=PLAYBACK_RATE_RANGE.1).contains(&self.playback_rate) {
            return Err(PlaybackError::InvalidConfig(format!(
                "playback_rate {} outside [0.5, 3.0]",
                self.playback_rate
            )));
        }

        if self.skip_forward_secs < 0.0 || self.skip_backward_secs < 0.0 {
            return Err(PlaybackError::InvalidConfig(
                "skip steps must not be negative".to_string(),
            ));
        }

        Ok(())
    }
}
