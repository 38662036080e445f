//! Queue store
//!
//! Local mirror of the repository-backed play queue. Every mutation is a
//! round-trip: the store sends the request, then adopts the authoritative list
//! the repository returns. Until the response arrives the previous list stays
//! visible.

use crate::{
    error::{PlaybackError, Result},
    types::QueueSnapshot,
};
use chrono::{DateTime, Utc};
use pod_core::traits::QueueRepository;
use pod_core::types::{
    EpisodeId, EpisodeStatus, QueueEntry, QueuePlacement, QueueReorderItem, QUEUE_POSITION_GAP,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Result of removing an episode from the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The episode was not queued
    NotQueued,
    /// The slot was removed
    Removed {
        /// Whether the removed slot was the current one
        was_current: bool,
    },
}

/// Compute the renumbered positions for moving `from` to `to`
///
/// Returns `None` for no-op moves (equal or out of range indices). Items are
/// returned in the original list order; each carries its new rank position.
pub fn reorder_positions(
    entries: &[QueueEntry],
    from: usize,
    to: usize,
) -> Option<Vec<QueueReorderItem>> {
    let len = entries.len();
    if from == to || from >= len || to >= len {
        return None;
    }

    let mut order: Vec<usize> = (0..len).collect();
    let moved = order.remove(from);
    order.insert(to, moved);

    let mut ranks = vec![0usize; len];
    for (rank, &original) in order.iter().enumerate() {
        ranks[original] = rank;
    }

    Some(
        entries
            .iter()
            .zip(ranks)
            .map(|(entry, rank)| {
                QueueReorderItem::new(entry.id.clone(), (rank as i64 + 1) * QUEUE_POSITION_GAP)
            })
            .collect(),
    )
}

/// Ordered play queue with a derived current index
pub struct QueueStore {
    repository: Arc<dyn QueueRepository>,
    entries: Vec<QueueEntry>,
    current_index: Option<usize>,
    /// Episode the session reports as playing; `current_index` is derived from it
    playing: Option<EpisodeId>,
    error: Option<String>,
    state: watch::Sender<QueueSnapshot>,
}

impl QueueStore {
    /// Create an empty store
    pub fn new(repository: Arc<dyn QueueRepository>) -> Self {
        let (state, _) = watch::channel(QueueSnapshot::default());
        Self {
            repository,
            entries: Vec::new(),
            current_index: None,
            playing: None,
            error: None,
            state,
        }
    }

    /// Entries in ascending position order
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Get entry at index
    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the playing episode's slot
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Last failure message
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Index of an episode's slot
    pub fn index_of(&self, episode_id: &EpisodeId) -> Option<usize> {
        self.entries.iter().position(|e| e.episode_id == *episode_id)
    }

    /// Check if an episode is queued
    pub fn contains(&self, episode_id: &EpisodeId) -> bool {
        self.index_of(episode_id).is_some()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> QueueSnapshot {
        self.state.borrow().clone()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.state.subscribe()
    }

    /// Reload the queue from the repository
    pub async fn refresh(&mut self) -> Result<()> {
        let entries = self.repository.get_all().await;
        self.settle(entries, "load queue")
    }

    /// Insert right after the current slot (at the head if nothing is current)
    ///
    /// Already queued episodes are left where they are.
    pub async fn add_play_next(&mut self, episode_id: &EpisodeId) -> Result<()> {
        if self.contains(episode_id) {
            tracing::debug!(episode = %episode_id, "Already queued, ignoring play-next");
            return Ok(());
        }

        let anchor = self.current_index.map_or(-1, |i| i as i64);
        let entries = self
            .repository
            .add(episode_id, QueuePlacement::PlayNext, Some(anchor))
            .await;
        self.settle(entries, "add to queue")
    }

    /// Append after the last slot
    ///
    /// Already queued episodes are left where they are.
    pub async fn add_to_queue_end(&mut self, episode_id: &EpisodeId) -> Result<()> {
        if self.contains(episode_id) {
            tracing::debug!(episode = %episode_id, "Already queued, ignoring append");
            return Ok(());
        }

        let entries = self
            .repository
            .add(episode_id, QueuePlacement::End, None)
            .await;
        self.settle(entries, "add to queue")
    }

    /// Move (or insert) an episode to the absolute head
    ///
    /// If the episode is queued its slot is removed first. Should the insert
    /// then fail, the old slot is already gone and the error is surfaced.
    pub async fn move_to_queue_start(&mut self, episode_id: &EpisodeId) -> Result<()> {
        if self.contains(episode_id) {
            let entries = self.repository.remove(episode_id).await;
            self.settle(entries, "move to queue start")?;
        }

        let entries = self
            .repository
            .add(episode_id, QueuePlacement::PlayNext, Some(-1))
            .await;
        self.settle(entries, "move to queue start")
    }

    /// Remove an episode's slot
    ///
    /// Not queued is a no-op, not an error.
    pub async fn remove_from_queue(&mut self, episode_id: &EpisodeId) -> Result<RemoveOutcome> {
        let Some(index) = self.index_of(episode_id) else {
            tracing::debug!(episode = %episode_id, "Not queued, nothing to remove");
            return Ok(RemoveOutcome::NotQueued);
        };
        let was_current = self.current_index == Some(index);

        let entries = self.repository.remove(episode_id).await;
        self.settle(entries, "remove from queue")?;
        Ok(RemoveOutcome::Removed { was_current })
    }

    /// Remove every slot
    pub async fn clear_queue(&mut self) -> Result<()> {
        let entries = self.repository.clear().await;
        self.settle(entries, "clear queue")
    }

    /// Move the slot at `from` to `to`, renumbering the whole list
    ///
    /// Equal or out of range indices are a no-op with no repository call.
    pub async fn reorder_queue(&mut self, from: usize, to: usize) -> Result<()> {
        let Some(items) = reorder_positions(&self.entries, from, to) else {
            tracing::debug!(from, to, len = self.entries.len(), "Ignoring no-op reorder");
            return Ok(());
        };

        let entries = self.repository.reorder(items).await;
        self.settle(entries, "reorder queue")
    }

    /// Record which episode the session is playing and re-derive the index
    pub fn set_playing(&mut self, episode_id: Option<EpisodeId>) {
        self.playing = episode_id;
        self.recompute_index();
        self.publish();
    }

    /// Point the current index at a slot (used when advancing)
    pub fn set_current_index(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            if i >= self.entries.len() {
                return Err(PlaybackError::IndexOutOfBounds(i));
            }
        }
        self.current_index = index;
        self.publish();
        Ok(())
    }

    /// Patch the queued copy of an episode after a progress write
    ///
    /// Keeps resume offsets current without re-fetching the queue. A `None`
    /// status leaves the stored status alone. Returns whether an entry matched.
    pub fn apply_progress(
        &mut self,
        episode_id: &EpisodeId,
        position_sec: u64,
        status: Option<EpisodeStatus>,
        played_at: DateTime<Utc>,
    ) -> bool {
        let Some(index) = self.index_of(episode_id) else {
            return false;
        };

        let episode = &mut self.entries[index].episode;
        episode.last_position_sec = position_sec;
        episode.last_played_at = Some(played_at);
        if let Some(status) = status {
            episode.status = status;
        }
        self.publish();
        true
    }

    /// Patch the queued copy of an episode after an explicit status change
    pub fn apply_status(&mut self, episode_id: &EpisodeId, status: EpisodeStatus) -> bool {
        let Some(index) = self.index_of(episode_id) else {
            return false;
        };

        let episode = &mut self.entries[index].episode;
        episode.status = status;
        if status == EpisodeStatus::New {
            episode.last_position_sec = 0;
        }
        self.publish();
        true
    }

    /// Clear the recorded error
    pub fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.publish();
        }
    }

    /// Replace local state with the repository's authoritative list
    fn adopt(&mut self, entries: Vec<QueueEntry>) {
        self.entries = entries;
        self.recompute_index();
    }

    fn settle(
        &mut self,
        response: pod_core::Result<Vec<QueueEntry>>,
        action: &str,
    ) -> Result<()> {
        match response {
            Ok(entries) => {
                self.adopt(entries);
                self.error = None;
                self.publish();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to {}", action);
                self.error = Some(format!("Failed to {action}: {e}"));
                self.publish();
                Err(e.into())
            }
        }
    }

    fn recompute_index(&mut self) {
        self.current_index = self
            .playing
            .as_ref()
            .and_then(|id| self.entries.iter().position(|e| e.episode_id == *id));
    }

    fn publish(&self) {
        self.state.send_replace(QueueSnapshot {
            entries: self.entries.clone(),
            current_index: self.current_index,
            error: self.error.clone(),
        });
    }
}

impl std::fmt::Debug for QueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueStore")
            .field("entries", &self.entries.len())
            .field("current_index", &self.current_index)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
