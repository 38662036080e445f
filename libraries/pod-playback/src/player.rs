//! Player - application context
//!
//! Owns the playback session, the queue store and the synchronizer, and is the
//! single mutation entry point for the UI layer. Every operation that can
//! change the session's episode re-derives the queue index before returning.

use crate::{
    error::Result,
    events::{MediaEvent, PersistenceEvent, SessionSignal},
    queue::{QueueStore, RemoveOutcome},
    session::PlaybackSession,
    source::MediaElement,
    sync::Synchronizer,
    types::{PlaybackConfig, QueueSnapshot, SessionSnapshot},
};
use pod_core::traits::{EpisodeRepository, PlaybackStateRepository, QueueRepository};
use pod_core::types::{Episode, EpisodeId};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::watch;

/// Repository handles the player is wired to
#[derive(Clone)]
pub struct Repositories {
    /// Episode progress and status writes
    pub episodes: Arc<dyn EpisodeRepository>,
    /// Play queue storage
    pub queue: Arc<dyn QueueRepository>,
    /// Last-played position record
    pub playback: Arc<dyn PlaybackStateRepository>,
}

/// Playback queue and session engine
pub struct Player {
    session: PlaybackSession,
    queue: QueueStore,
    sync: Synchronizer,
    playback_state: Arc<dyn PlaybackStateRepository>,
    /// Writes not yet reflected in the queued episode copies
    progress: broadcast::Receiver<PersistenceEvent>,
}

impl Player {
    /// Create a player around a live audio source
    pub fn new(media: Box<dyn MediaElement>, repos: Repositories, config: PlaybackConfig) -> Self {
        let session = PlaybackSession::new(
            media,
            Arc::clone(&repos.episodes),
            Arc::clone(&repos.playback),
            config,
        );
        let progress = session.persistence().subscribe();

        Self {
            session,
            queue: QueueStore::new(repos.queue),
            sync: Synchronizer::new(),
            playback_state: repos.playback,
            progress,
        }
    }

    /// Playback session
    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Queue store
    pub fn queue(&self) -> &QueueStore {
        &self.queue
    }

    /// Current session state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Current queue state
    pub fn queue_snapshot(&self) -> QueueSnapshot {
        self.queue.snapshot()
    }

    /// Observe session changes
    pub fn subscribe_session(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    /// Observe queue changes
    pub fn subscribe_queue(&self) -> watch::Receiver<QueueSnapshot> {
        self.queue.subscribe()
    }

    /// Observe progress and status writes
    pub fn subscribe_persistence(&self) -> broadcast::Receiver<PersistenceEvent> {
        self.session.persistence().subscribe()
    }

    /// Load the queue and restore the last session (never auto-plays)
    ///
    /// A failed queue load is returned after the session has been restored.
    pub async fn initialize(&mut self) -> Result<()> {
        let loaded = self.queue.refresh().await;

        match self.playback_state.get().await {
            Ok(stored) => {
                if let Some(episode) = stored.episode {
                    let position = stored.state.current_position as f64;
                    tracing::info!(episode = %episode.id, position, "Restoring last session");
                    if let Err(e) = self.session.restore(episode, position) {
                        tracing::warn!(error = %e, "Failed to restore last session");
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "Failed to load playback state"),
        }

        self.sync_index();
        loaded
    }

    // ===== Session controls =====

    /// Load and play an episode, queued or not
    pub async fn play_episode(&mut self, episode: Episode) -> Result<()> {
        let loaded = self.session.load_episode(episode).await;
        self.sync_index();
        loaded?;
        self.session.play().await
    }

    /// Resume playback of the loaded episode
    pub async fn play(&mut self) -> Result<()> {
        self.session.play().await
    }

    /// Pause playback
    pub async fn pause(&mut self) {
        self.session.pause().await;
        self.absorb_progress().await;
    }

    /// Toggle between play and pause
    pub async fn toggle_play(&mut self) -> Result<()> {
        if self.session.is_playing() {
            self.pause().await;
            Ok(())
        } else {
            self.session.play().await
        }
    }

    /// Seek to a position in seconds
    pub fn seek(&mut self, position: f64) {
        self.session.seek(position);
    }

    /// Seek to a fraction of the duration (`0.0..=1.0`)
    ///
    /// Ignored while the duration is unknown.
    pub fn seek_to_percent(&mut self, fraction: f64) {
        let duration = self.session.snapshot().duration;
        if duration > 0.0 && !fraction.is_nan() {
            self.session.seek(fraction.clamp(0.0, 1.0) * duration);
        }
    }

    /// Skip ahead
    pub fn skip_forward(&mut self, seconds: Option<f64>) {
        self.session.skip_forward(seconds);
    }

    /// Skip back
    pub fn skip_backward(&mut self, seconds: Option<f64>) {
        self.session.skip_backward(seconds);
    }

    /// Set volume (0.0 to 1.0)
    pub fn set_volume(&mut self, volume: f64) {
        self.session.set_volume(volume);
    }

    /// Set playback rate (0.5 to 3.0)
    pub fn set_playback_rate(&mut self, rate: f64) {
        self.session.set_playback_rate(rate);
    }

    /// Toggle mute
    pub fn toggle_mute(&mut self) {
        self.session.toggle_mute();
    }

    // ===== Queue operations =====

    /// Insert after the current slot
    pub async fn add_play_next(&mut self, episode_id: &EpisodeId) -> Result<()> {
        self.queue.add_play_next(episode_id).await
    }

    /// Append to the queue
    pub async fn add_to_queue_end(&mut self, episode_id: &EpisodeId) -> Result<()> {
        self.queue.add_to_queue_end(episode_id).await
    }

    /// Move an episode to the head of the queue
    pub async fn move_to_queue_start(&mut self, episode_id: &EpisodeId) -> Result<()> {
        self.queue.move_to_queue_start(episode_id).await
    }

    /// Move a slot from one index to another
    pub async fn reorder_queue(&mut self, from: usize, to: usize) -> Result<()> {
        self.queue.reorder_queue(from, to).await
    }

    /// Remove an episode from the queue
    ///
    /// Removing the current slot loads (without playing) the new head, or
    /// resets the session when the queue is now empty.
    pub async fn remove_from_queue(&mut self, episode_id: &EpisodeId) -> Result<()> {
        let outcome = self.queue.remove_from_queue(episode_id).await?;

        if matches!(outcome, RemoveOutcome::Removed { was_current: true }) {
            self.checkpoint().await;
            match self.queue.get(0).map(|entry| entry.episode.clone()) {
                Some(head) => {
                    let loaded = self.session.load_episode(head).await;
                    self.sync_index();
                    loaded?;
                }
                None => {
                    self.session.reset().await;
                    self.sync_index();
                }
            }
        }
        Ok(())
    }

    /// Empty the queue and stop playback
    pub async fn clear_queue(&mut self) -> Result<()> {
        self.queue.clear_queue().await?;
        self.session.reset().await;
        self.sync_index();
        Ok(())
    }

    /// Advance to the next slot
    ///
    /// Past the tail the session is paused with its episode kept.
    pub async fn play_next(&mut self) -> Result<()> {
        let next = self.queue.current_index().map_or(0, |i| i + 1);
        if next >= self.queue.len() {
            tracing::info!("Reached end of queue");
            self.pause().await;
            return Ok(());
        }
        self.play_queue_index(next).await
    }

    /// Go back one slot (re-plays the head at index 0)
    pub async fn play_previous(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }
        let previous = self
            .queue
            .current_index()
            .map_or(0, |i| i.saturating_sub(1));
        self.play_queue_index(previous).await
    }

    /// Load and play the slot at `index` (no-op when out of range)
    ///
    /// The outgoing episode is flushed first so the queued copy being loaded
    /// carries its latest progress.
    pub async fn play_queue_index(&mut self, index: usize) -> Result<()> {
        if index >= self.queue.len() {
            tracing::debug!(index, len = self.queue.len(), "Ignoring out of range queue index");
            return Ok(());
        }

        self.checkpoint().await;
        let Some(episode) = self.queue.get(index).map(|entry| entry.episode.clone()) else {
            tracing::debug!(index, "Slot gone after queue refresh");
            return Ok(());
        };

        self.queue.set_current_index(Some(index))?;
        let loaded = self.session.load_episode(episode).await;
        self.sync_index();
        loaded?;
        self.session.play().await
    }

    // ===== Media events =====

    /// Feed an event from the live audio source
    ///
    /// On end of episode the final position is flushed before advancing.
    pub async fn handle_media_event(&mut self, event: MediaEvent) -> Result<()> {
        let signal = self.session.handle_media_event(event).await;
        if signal == Some(SessionSignal::Ended) {
            self.checkpoint().await;
            self.play_next().await?;
        } else {
            self.absorb_progress().await;
        }
        Ok(())
    }

    // ===== Status =====

    /// Mark an episode as played
    pub async fn mark_played(&mut self, episode_id: &EpisodeId) -> Result<()> {
        self.session
            .persistence()
            .mark_played(episode_id)
            .await?;
        self.absorb_progress().await;
        Ok(())
    }

    /// Reset an episode to new
    pub async fn mark_new(&mut self, episode_id: &EpisodeId) -> Result<()> {
        self.session
            .persistence()
            .mark_new(episode_id)
            .await?;
        self.absorb_progress().await;
        Ok(())
    }

    /// Archive an episode
    pub async fn mark_archived(&mut self, episode_id: &EpisodeId) -> Result<()> {
        self.session
            .persistence()
            .mark_archived(episode_id)
            .await?;
        self.absorb_progress().await;
        Ok(())
    }

    /// Clear errors recorded on the session and the queue
    pub fn clear_error(&mut self) {
        self.session.clear_error();
        self.queue.clear_error();
    }

    /// Final flush and timer teardown
    pub async fn shutdown(&mut self) {
        tracing::info!("Shutting down player");
        self.session.shutdown().await;
        self.absorb_progress().await;
    }

    /// Immediate flush, reflected in the queue before anything is loaded
    async fn checkpoint(&mut self) {
        self.session.persistence().flush_now().await;
        self.absorb_progress().await;
    }

    /// Apply pending progress and status writes to the queued episodes
    ///
    /// Falls back to a queue refresh when writes were dropped.
    async fn absorb_progress(&mut self) {
        let mut lagged = false;
        loop {
            match self.progress.try_recv() {
                Ok(PersistenceEvent::ProgressSaved {
                    episode_id,
                    position_sec,
                    status,
                    played_at,
                    ..
                }) => {
                    self.queue
                        .apply_progress(&episode_id, position_sec, status, played_at);
                }
                Ok(PersistenceEvent::StatusChanged { episode_id, status }) => {
                    self.queue.apply_status(&episode_id, status);
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Missed progress writes");
                    lagged = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        if lagged {
            if let Err(e) = self.queue.refresh().await {
                tracing::warn!(error = %e, "Failed to refresh queue after missed progress writes");
            }
        }
    }

    fn sync_index(&mut self) {
        let episode = self.session.current_episode();
        self.sync.on_episode_changed(&mut self.queue, episode.as_ref());
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("session", &self.session)
            .field("queue", &self.queue)
            .field("sync", &self.sync)
            .finish_non_exhaustive()
    }
}
