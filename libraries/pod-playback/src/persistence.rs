//! Progress persistence
//!
//! Writes the session's position back to storage through three strategies
//! that share a single flush path:
//! - Debounced: a single-shot timer reset by every position update
//! - Periodic: a fixed interval while playing
//! - Immediate: awaited checkpoints (episode switch, pause, error, reset)
//!
//! Flushes are serialised by one async lock, so a late timer can never write
//! concurrently with (or after) the checkpoint that superseded it.

use crate::events::{FlushReason, PersistenceEvent};
use crate::types::{SessionSnapshot, COMPLETION_THRESHOLD};
use chrono::Utc;
use pod_core::traits::{EpisodeRepository, PlaybackStateRepository};
use pod_core::types::{EpisodeId, EpisodeStatus, ProgressUpdate};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Capacity of the persistence event channel
const EVENT_CAPACITY: usize = 64;

/// Shortest timer period accepted (tokio intervals reject zero)
const MIN_TIMER_PERIOD: Duration = Duration::from_millis(1);

/// Whole seconds written for a position, never negative
pub fn whole_seconds(position: f64) -> u64 {
    if !position.is_finite() || position <= 0.0 {
        return 0;
    }
    position.floor() as u64
}

/// Derive an episode's lifecycle status from its progress
///
/// Returns `None` when the duration is unknown, since a status must never be
/// derived from an undefined denominator.
pub fn derive_status(position_sec: u64, duration: f64) -> Option<EpisodeStatus> {
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }

    if position_sec == 0 {
        return Some(EpisodeStatus::New);
    }

    if position_sec as f64 / duration >= COMPLETION_THRESHOLD {
        Some(EpisodeStatus::Played)
    } else {
        Some(EpisodeStatus::InProgress)
    }
}

#[derive(Default)]
struct Timers {
    debounce: Option<CancellationToken>,
    periodic: Option<CancellationToken>,
}

impl Timers {
    fn cancel_all(&mut self) {
        if let Some(token) = self.debounce.take() {
            token.cancel();
        }
        if let Some(token) = self.periodic.take() {
            token.cancel();
        }
    }
}

/// Identity of a progress write, used to skip repeated checkpoints
#[derive(Debug, Clone, PartialEq)]
struct WrittenProgress {
    episode_id: EpisodeId,
    position_sec: u64,
    status: Option<EpisodeStatus>,
}

struct Inner {
    episodes: Arc<dyn EpisodeRepository>,
    playback: Arc<dyn PlaybackStateRepository>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    debounce: Duration,
    periodic: Duration,
    timers: Mutex<Timers>,
    /// Serialises flushes; holds the last successfully written record
    last_written: tokio::sync::Mutex<Option<WrittenProgress>>,
    events: broadcast::Sender<PersistenceEvent>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.timers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel_all();
    }
}

impl Inner {
    fn timers(&self) -> MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the current position; returns whether a write reached storage
    async fn flush(&self, reason: FlushReason, timer: Option<&CancellationToken>) -> bool {
        let mut last_written = self.last_written.lock().await;

        // A checkpoint cancelled this timer while it waited for the lock
        if timer.is_some_and(CancellationToken::is_cancelled) {
            tracing::debug!(?reason, "Skipping superseded flush");
            return false;
        }

        let (episode_id, position, duration) = {
            let snapshot = self.state.borrow();
            let Some(episode) = snapshot.current_episode.as_ref() else {
                return false;
            };
            (episode.id.clone(), snapshot.position, snapshot.duration)
        };
        let position_sec = whole_seconds(position);
        let status = derive_status(position_sec, duration);
        let written = WrittenProgress {
            episode_id: episode_id.clone(),
            position_sec,
            status,
        };

        // A duration learned since the last write changes the derived status
        if reason == FlushReason::Immediate && last_written.as_ref() == Some(&written) {
            tracing::debug!(episode = %episode_id, position_sec, "Progress unchanged, skipping");
            return false;
        }

        if let Err(e) = self.playback.save(&episode_id, position_sec, duration).await {
            tracing::warn!(episode = %episode_id, error = %e, "Failed to save playback state");
        }

        let played_at = Utc::now();
        let update = ProgressUpdate {
            id: episode_id.clone(),
            last_position_sec: position_sec,
            last_played_at: played_at,
            status,
        };

        if let Err(e) = self.episodes.update_progress(update).await {
            tracing::warn!(episode = %episode_id, error = %e, "Failed to update episode progress");
            return false;
        }

        *last_written = Some(written);

        self.state.send_if_modified(|snapshot| match snapshot.current_episode.as_mut() {
            Some(episode) if episode.id == episode_id => {
                episode.last_position_sec = position_sec;
                if let Some(status) = status {
                    episode.status = status;
                }
                episode.last_played_at = Some(played_at);
                true
            }
            _ => false,
        });

        tracing::debug!(episode = %episode_id, position_sec, ?status, ?reason, "Progress saved");

        // No subscribers is fine
        let _ = self.events.send(PersistenceEvent::ProgressSaved {
            episode_id,
            position_sec,
            status,
            played_at,
            reason,
        });

        true
    }
}

/// Owns the debounce and periodic timers and the single flush path
///
/// Cloning yields another handle to the same coordinator. Timers are spawned
/// on the ambient tokio runtime and hold only a weak reference, so dropping
/// the last handle cancels them.
#[derive(Clone)]
pub struct PersistenceCoordinator {
    inner: Arc<Inner>,
}

impl PersistenceCoordinator {
    /// Create a coordinator observing `state`
    pub fn new(
        episodes: Arc<dyn EpisodeRepository>,
        playback: Arc<dyn PlaybackStateRepository>,
        state: Arc<watch::Sender<SessionSnapshot>>,
        debounce: Duration,
        periodic: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                episodes,
                playback,
                state,
                debounce,
                periodic: periodic.max(MIN_TIMER_PERIOD),
                timers: Mutex::new(Timers::default()),
                last_written: tokio::sync::Mutex::new(None),
                events,
            }),
        }
    }

    /// Subscribe to persistence events
    pub fn subscribe(&self) -> broadcast::Receiver<PersistenceEvent> {
        self.inner.events.subscribe()
    }

    /// Restart the debounce window
    ///
    /// Any pending debounced write is cancelled; exactly one write happens
    /// once no further update arrives for the configured window.
    pub fn schedule_debounced(&self) {
        let token = CancellationToken::new();
        if let Some(previous) = self.inner.timers().debounce.replace(token.clone()) {
            previous.cancel();
        }

        let inner = Arc::downgrade(&self.inner);
        let delay = self.inner.debounce;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            if let Some(inner) = inner.upgrade() {
                inner.flush(FlushReason::Debounced, Some(&token)).await;
            }
            // Marks the window as consumed
            token.cancel();
        });
    }

    /// Cancel a pending debounced write
    pub fn cancel_debounced(&self) {
        if let Some(token) = self.inner.timers().debounce.take() {
            token.cancel();
        }
    }

    /// Whether a debounced write is waiting to fire
    pub fn has_pending_debounce(&self) -> bool {
        self.inner
            .timers()
            .debounce
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Start the periodic writer (no-op if already running)
    pub fn arm_periodic(&self) {
        let token = {
            let mut timers = self.inner.timers();
            if timers
                .periodic
                .as_ref()
                .is_some_and(|token| !token.is_cancelled())
            {
                return;
            }
            let token = CancellationToken::new();
            timers.periodic = Some(token.clone());
            token
        };

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let period = self.inner.periodic;
        tracing::debug!(?period, "Periodic save armed");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(inner) = inner.upgrade() else { break };
                        inner.flush(FlushReason::Periodic, Some(&token)).await;
                    }
                }
            }
        });
    }

    /// Stop the periodic writer
    pub fn disarm_periodic(&self) {
        if let Some(token) = self.inner.timers().periodic.take() {
            token.cancel();
            tracing::debug!("Periodic save disarmed");
        }
    }

    /// Whether the periodic writer is running
    pub fn is_periodic_armed(&self) -> bool {
        self.inner
            .timers()
            .periodic
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Checkpoint write, awaited by the caller
    ///
    /// Cancels any pending debounced write first. Skipped when the position
    /// and derived status equal the last successful write for the same
    /// episode.
    pub async fn flush_now(&self) -> bool {
        self.cancel_debounced();
        self.inner.flush(FlushReason::Immediate, None).await
    }

    /// Cancel both timers (single teardown path)
    pub fn cancel_timers(&self) {
        self.inner.timers().cancel_all();
    }

    /// Final checkpoint and timer teardown
    pub async fn shutdown(&self) {
        self.cancel_timers();
        self.inner.flush(FlushReason::Immediate, None).await;
    }

    /// Explicitly mark an episode as played
    pub async fn mark_played(&self, id: &EpisodeId) -> pod_core::Result<()> {
        self.inner.episodes.mark_as_played(id).await?;
        self.record_status(id, EpisodeStatus::Played).await;
        Ok(())
    }

    /// Explicitly reset an episode to new
    pub async fn mark_new(&self, id: &EpisodeId) -> pod_core::Result<()> {
        self.inner.episodes.mark_as_new(id).await?;
        self.record_status(id, EpisodeStatus::New).await;
        Ok(())
    }

    /// Explicitly archive an episode
    pub async fn mark_archived(&self, id: &EpisodeId) -> pod_core::Result<()> {
        self.inner.episodes.mark_as_archived(id).await?;
        self.record_status(id, EpisodeStatus::Archived).await;
        Ok(())
    }

    async fn record_status(&self, id: &EpisodeId, status: EpisodeStatus) {
        // Storage changed underneath the dedupe record
        *self.inner.last_written.lock().await = None;

        self.inner
            .state
            .send_if_modified(|snapshot| match snapshot.current_episode.as_mut() {
                Some(episode) if episode.id == *id => {
                    episode.status = status;
                    if status == EpisodeStatus::New {
                        episode.last_position_sec = 0;
                    }
                    true
                }
                _ => false,
            });

        tracing::info!(episode = %id, %status, "Episode status changed");

        let _ = self.inner.events.send(PersistenceEvent::StatusChanged {
            episode_id: id.clone(),
            status,
        });
    }
}

impl std::fmt::Debug for PersistenceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceCoordinator")
            .field("debounce", &self.inner.debounce)
            .field("periodic", &self.inner.periodic)
            .finish_non_exhaustive()
    }
}
