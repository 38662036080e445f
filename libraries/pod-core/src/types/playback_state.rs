//! Persisted playback progress types

use super::{
    episode::{Episode, EpisodeStatus},
    ids::EpisodeId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last playback position, upserted on every flush
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedPlaybackState {
    /// Episode that was loaded (if any)
    pub current_episode_id: Option<EpisodeId>,

    /// Position within that episode in seconds
    pub current_position: u64,

    /// Time of the last write
    pub updated_at: DateTime<Utc>,
}

/// Persisted state plus the episode it points at, loaded once at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredPlayback {
    /// Persisted position record
    pub state: PersistedPlaybackState,
    /// Resolved episode, `None` when nothing was playing or it no longer exists
    pub episode: Option<Episode>,
}

/// Progress write for a single episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Episode being updated
    pub id: EpisodeId,

    /// Position in whole seconds
    pub last_position_sec: u64,

    /// Time of the flush
    pub last_played_at: DateTime<Utc>,

    /// Derived status, absent when the duration is not yet known
    pub status: Option<EpisodeStatus>,
}
