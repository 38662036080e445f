//! Playback events
//!
//! Inbound events come from the live audio source and are fed to the session
//! by the host. Outbound events report persistence results so that episode
//! lists can reflect progress without re-fetching.

use chrono::{DateTime, Utc};
use pod_core::types::{EpisodeId, EpisodeStatus};
use serde::{Deserialize, Serialize};

/// Events emitted by the live audio source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaEvent {
    /// Source has buffered enough to start
    CanPlay,

    /// Playback started (including starts not requested through the session)
    Play,

    /// Playback paused (including OS media keys)
    Pause,

    /// Reached the end of the source
    Ended,

    /// Position advanced
    TimeUpdate {
        /// Current position in seconds
        position: f64,
    },

    /// Duration became known or changed
    DurationChange {
        /// Duration in seconds
        duration: f64,
    },

    /// Decode or network failure
    Error {
        /// Human readable reason
        message: String,
    },
}

/// Transition the session reports back to its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// The current episode finished and must be advanced past
    Ended,
}

/// Why a progress flush happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushReason {
    /// Quiet period after the last position update elapsed
    Debounced,
    /// Fixed interval while playing
    Periodic,
    /// Checkpoint: episode switch, pause, error, reset or shutdown
    Immediate,
}

/// Events emitted by the persistence coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PersistenceEvent {
    /// A progress flush reached the episode repository
    ProgressSaved {
        /// Episode written
        episode_id: EpisodeId,
        /// Whole-second position written
        position_sec: u64,
        /// Derived status, absent when the duration was unknown
        status: Option<EpisodeStatus>,
        /// Time of the write
        played_at: DateTime<Utc>,
        /// What triggered the flush
        reason: FlushReason,
    },

    /// An explicit status change was written
    StatusChanged {
        /// Episode written
        episode_id: EpisodeId,
        /// New status
        status: EpisodeStatus,
    },
}
