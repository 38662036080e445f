//! Repository contracts consumed by the playback core
//!
//! These abstract the persistence layer (local database or remote API). The
//! playback engine calls into them and never touches storage directly.

use crate::error::Result;
use crate::types::{
    EpisodeId, ProgressUpdate, QueueEntry, QueuePlacement, QueueReorderItem, StoredPlayback,
};
use async_trait::async_trait;

/// Episode progress and status writes
#[async_trait]
pub trait EpisodeRepository: Send + Sync {
    /// Mark an episode as listened to the end
    async fn mark_as_played(&self, id: &EpisodeId) -> Result<()>;

    /// Reset an episode to never played
    async fn mark_as_new(&self, id: &EpisodeId) -> Result<()>;

    /// Hide an episode
    async fn mark_as_archived(&self, id: &EpisodeId) -> Result<()>;

    /// Write position, last-played time and (optionally) a derived status
    async fn update_progress(&self, update: ProgressUpdate) -> Result<()>;
}

/// Ordered play queue storage
///
/// Every mutating call returns the complete, authoritative queue in ascending
/// position order. Callers adopt it wholesale.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Load the whole queue
    async fn get_all(&self) -> Result<Vec<QueueEntry>>;

    /// Insert an episode
    ///
    /// `anchor_index` is only meaningful for [`QueuePlacement::PlayNext`]: the
    /// new slot goes directly after that index, `-1` meaning before the head.
    async fn add(
        &self,
        episode_id: &EpisodeId,
        placement: QueuePlacement,
        anchor_index: Option<i64>,
    ) -> Result<Vec<QueueEntry>>;

    /// Remove the slot holding this episode
    async fn remove(&self, episode_id: &EpisodeId) -> Result<Vec<QueueEntry>>;

    /// Apply new sort keys to existing slots
    async fn reorder(&self, items: Vec<QueueReorderItem>) -> Result<Vec<QueueEntry>>;

    /// Remove every slot
    async fn clear(&self) -> Result<Vec<QueueEntry>>;
}

/// Last-played position record
#[async_trait]
pub trait PlaybackStateRepository: Send + Sync {
    /// Load the persisted state and the episode it references
    async fn get(&self) -> Result<StoredPlayback>;

    /// Upsert the persisted state
    async fn save(&self, episode_id: &EpisodeId, position_sec: u64, duration_sec: f64)
        -> Result<()>;
}
