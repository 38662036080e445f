//! Session to queue synchronisation
//!
//! The queue's current index is a cache derived from the episode the session
//! is playing. The synchronizer is the only path by which session changes
//! reach the queue.

use crate::queue::QueueStore;
use pod_core::types::{Episode, EpisodeId};

/// Keeps the queue's current index aligned with the session
#[derive(Debug, Default)]
pub struct Synchronizer {
    last_episode_id: Option<EpisodeId>,
}

impl Synchronizer {
    /// Create a synchronizer that has not observed any episode yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Episode id seen on the last transition
    pub fn last_episode_id(&self) -> Option<&EpisodeId> {
        self.last_episode_id.as_ref()
    }

    /// Feed the session's current episode
    ///
    /// Returns `true` when the id changed and the queue index was re-derived.
    /// Repeated notifications for the same episode are ignored.
    pub fn on_episode_changed(&mut self, queue: &mut QueueStore, episode: Option<&Episode>) -> bool {
        let id = episode.map(|e| e.id.clone());
        if id == self.last_episode_id {
            return false;
        }

        tracing::debug!(
            from = ?self.last_episode_id,
            to = ?id,
            "Now playing changed"
        );
        self.last_episode_id = id.clone();
        queue.set_playing(id);
        true
    }
}
