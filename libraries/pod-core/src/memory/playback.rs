use super::{lock, MemoryEpisodeRepository};
use crate::error::{PodError, Result};
use crate::traits::PlaybackStateRepository;
use crate::types::{EpisodeId, PersistedPlaybackState, StoredPlayback};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// One `save` call received by [`MemoryPlaybackStateRepository`]
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPosition {
    /// Episode saved
    pub episode_id: EpisodeId,
    /// Whole-second position
    pub position_sec: u64,
    /// Duration reported alongside
    pub duration_sec: f64,
}

/// Single-record playback state store
#[derive(Debug)]
pub struct MemoryPlaybackStateRepository {
    episodes: Arc<MemoryEpisodeRepository>,
    state: Mutex<PersistedPlaybackState>,
    saves: Mutex<Vec<SavedPosition>>,
    offline: AtomicBool,
}

impl MemoryPlaybackStateRepository {
    /// Create an empty store that resolves episodes through `episodes`
    pub fn new(episodes: Arc<MemoryEpisodeRepository>) -> Self {
        Self {
            episodes,
            state: Mutex::new(PersistedPlaybackState::default()),
            saves: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Overwrite the persisted record without journaling it
    pub fn seed(&self, episode_id: EpisodeId, position_sec: u64) {
        *lock(&self.state) = PersistedPlaybackState {
            current_episode_id: Some(episode_id),
            current_position: position_sec,
            updated_at: Utc::now(),
        };
    }

    /// Current persisted record
    pub fn state(&self) -> PersistedPlaybackState {
        lock(&self.state).clone()
    }

    /// Every save received so far
    pub fn saves(&self) -> Vec<SavedPosition> {
        lock(&self.saves).clone()
    }

    /// Number of saves received so far
    pub fn save_count(&self) -> usize {
        lock(&self.saves).len()
    }

    /// Make every call fail as if the backend were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PodError::unavailable("playback state store offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackStateRepository for MemoryPlaybackStateRepository {
    async fn get(&self) -> Result<StoredPlayback> {
        self.ensure_online()?;
        let state = self.state();
        let episode = state
            .current_episode_id
            .as_ref()
            .and_then(|id| self.episodes.get(id));
        Ok(StoredPlayback { state, episode })
    }

    async fn save(
        &self,
        episode_id: &EpisodeId,
        position_sec: u64,
        duration_sec: f64,
    ) -> Result<()> {
        self.ensure_online()?;
        *lock(&self.state) = PersistedPlaybackState {
            current_episode_id: Some(episode_id.clone()),
            current_position: position_sec,
            updated_at: Utc::now(),
        };
        lock(&self.saves).push(SavedPosition {
            episode_id: episode_id.clone(),
            position_sec,
            duration_sec,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Episode;

    #[tokio::test]
    async fn get_resolves_the_saved_episode() {
        let episodes = Arc::new(MemoryEpisodeRepository::with_episodes([Episode::new(
            "a",
            "A",
            "https://example.com/a.mp3",
        )]));
        let repo = MemoryPlaybackStateRepository::new(episodes);

        repo.save(&EpisodeId::new("a"), 42, 600.0).await.unwrap();

        let stored = repo.get().await.unwrap();
        assert_eq!(stored.state.current_position, 42);
        assert_eq!(stored.episode.map(|e| e.title), Some("A".to_string()));
        assert_eq!(repo.save_count(), 1);
    }

    #[tokio::test]
    async fn empty_store_has_no_episode() {
        let repo = MemoryPlaybackStateRepository::new(Arc::new(MemoryEpisodeRepository::new()));
        let stored = repo.get().await.unwrap();
        assert!(stored.state.current_episode_id.is_none());
        assert!(stored.episode.is_none());
    }
}
