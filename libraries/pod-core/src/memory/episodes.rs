use super::lock;
use crate::error::{PodError, Result};
use crate::traits::EpisodeRepository;
use crate::types::{Episode, EpisodeId, EpisodeStatus, ProgressUpdate};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A write received by [`MemoryEpisodeRepository`]
#[derive(Debug, Clone, PartialEq)]
pub enum EpisodeWrite {
    /// `update_progress` call
    Progress(ProgressUpdate),
    /// `mark_as_*` call
    Status {
        /// Target episode
        id: EpisodeId,
        /// Status written
        status: EpisodeStatus,
    },
}

/// Episode store kept in insertion order
#[derive(Debug, Default)]
pub struct MemoryEpisodeRepository {
    episodes: Mutex<Vec<Episode>>,
    writes: Mutex<Vec<EpisodeWrite>>,
    offline: AtomicBool,
}

impl MemoryEpisodeRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding these episodes
    pub fn with_episodes(episodes: impl IntoIterator<Item = Episode>) -> Self {
        let repo = Self::new();
        for episode in episodes {
            repo.insert(episode);
        }
        repo
    }

    /// Insert or replace an episode
    pub fn insert(&self, episode: Episode) {
        let mut episodes = lock(&self.episodes);
        match episodes.iter_mut().find(|e| e.id == episode.id) {
            Some(existing) => *existing = episode,
            None => episodes.push(episode),
        }
    }

    /// Look up an episode
    pub fn get(&self, id: &EpisodeId) -> Option<Episode> {
        lock(&self.episodes).iter().find(|e| &e.id == id).cloned()
    }

    /// All episodes in insertion order
    pub fn all(&self) -> Vec<Episode> {
        lock(&self.episodes).clone()
    }

    /// Every write received so far
    pub fn writes(&self) -> Vec<EpisodeWrite> {
        lock(&self.writes).clone()
    }

    /// Only the progress writes received so far
    pub fn progress_updates(&self) -> Vec<ProgressUpdate> {
        lock(&self.writes)
            .iter()
            .filter_map(|w| match w {
                EpisodeWrite::Progress(update) => Some(update.clone()),
                EpisodeWrite::Status { .. } => None,
            })
            .collect()
    }

    /// Make every call fail as if the backend were unreachable
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PodError::unavailable("episode store offline"));
        }
        Ok(())
    }

    fn update<F>(&self, id: &EpisodeId, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Episode),
    {
        let mut episodes = lock(&self.episodes);
        let episode = episodes
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| PodError::not_found("Episode", id.as_str()))?;
        apply(episode);
        Ok(())
    }

    fn mark(&self, id: &EpisodeId, status: EpisodeStatus) -> Result<()> {
        self.ensure_online()?;
        self.update(id, |episode| {
            episode.status = status;
            if status == EpisodeStatus::New {
                episode.last_position_sec = 0;
            }
        })?;
        lock(&self.writes).push(EpisodeWrite::Status {
            id: id.clone(),
            status,
        });
        Ok(())
    }
}

#[async_trait]
impl EpisodeRepository for MemoryEpisodeRepository {
    async fn mark_as_played(&self, id: &EpisodeId) -> Result<()> {
        self.mark(id, EpisodeStatus::Played)
    }

    async fn mark_as_new(&self, id: &EpisodeId) -> Result<()> {
        self.mark(id, EpisodeStatus::New)
    }

    async fn mark_as_archived(&self, id: &EpisodeId) -> Result<()> {
        self.mark(id, EpisodeStatus::Archived)
    }

    async fn update_progress(&self, update: ProgressUpdate) -> Result<()> {
        self.ensure_online()?;
        self.update(&update.id, |episode| {
            episode.last_position_sec = update.last_position_sec;
            episode.last_played_at = Some(update.last_played_at);
            if let Some(status) = update.status {
                episode.status = status;
            }
        })?;
        lock(&self.writes).push(EpisodeWrite::Progress(update));
        Ok(())
    }
}
