//! Playback session - state machine around the live audio source
//!
//! ```text
//! Idle -> Loading -> Paused <-> Playing -> Ended
//!            \          \          \
//!             `----------`----------`--> Error
//! ```
//!
//! Every change is published as a full [`SessionSnapshot`] through a `watch`
//! channel.

use crate::{
    error::{PlaybackError, Result},
    events::{MediaEvent, SessionSignal},
    persistence::PersistenceCoordinator,
    source::MediaElement,
    types::{PlaybackConfig, PlaybackPhase, SessionSnapshot, PLAYBACK_RATE_RANGE, VOLUME_RANGE},
};
use pod_core::traits::{EpisodeRepository, PlaybackStateRepository};
use pod_core::types::Episode;
use std::sync::Arc;
use tokio::sync::watch;

/// Owns the live audio source and the observable session state
pub struct PlaybackSession {
    media: Box<dyn MediaElement>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    persistence: PersistenceCoordinator,
    config: PlaybackConfig,
}

impl PlaybackSession {
    /// Create an idle session
    pub fn new(
        media: Box<dyn MediaElement>,
        episodes: Arc<dyn EpisodeRepository>,
        playback: Arc<dyn PlaybackStateRepository>,
        config: PlaybackConfig,
    ) -> Self {
        let volume = clamp_volume(config.volume).unwrap_or(1.0);
        let rate = clamp_rate(config.playback_rate).unwrap_or(1.0);

        let (state, _) = watch::channel(SessionSnapshot::idle(volume, rate));
        let state = Arc::new(state);
        let persistence = PersistenceCoordinator::new(
            episodes,
            playback,
            Arc::clone(&state),
            config.debounce_interval(),
            config.periodic_interval(),
        );

        let mut session = Self {
            media,
            state,
            persistence,
            config,
        };
        session.media.set_volume(volume);
        session.media.set_playback_rate(rate);
        session
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Persistence coordinator observing this session
    pub fn persistence(&self) -> &PersistenceCoordinator {
        &self.persistence
    }

    /// Active configuration
    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Episode bound to the live source
    pub fn current_episode(&self) -> Option<Episode> {
        self.state.borrow().current_episode.clone()
    }

    /// Check if playing
    pub fn is_playing(&self) -> bool {
        self.state.borrow().is_playing
    }

    /// Bind the source to an episode
    ///
    /// The outgoing episode's position is flushed first. Played and archived
    /// episodes start from the beginning. The session stays `Loading` until the
    /// source reports `CanPlay`.
    pub async fn load_episode(&mut self, episode: Episode) -> Result<()> {
        self.persistence.flush_now().await;
        self.persistence.disarm_periodic();

        let start = episode.resume_position();
        self.bind(episode, start)
    }

    /// Seed the session from persisted state without flushing or playing
    pub fn restore(&mut self, episode: Episode, position: f64) -> Result<()> {
        let start = if position.is_finite() { position.max(0.0) } else { 0.0 };
        self.bind(episode, start)
    }

    fn bind(&mut self, episode: Episode, start: f64) -> Result<()> {
        tracing::info!(episode = %episode.id, start, "Loading episode");

        let duration = episode.duration_sec.filter(|d| d.is_finite() && *d > 0.0);
        let loaded = self.media.load(&episode.audio_url, start);

        self.state.send_modify(|s| {
            s.current_episode = Some(episode);
            s.position = start;
            s.duration = duration.unwrap_or(0.0);
            s.is_playing = false;
            match &loaded {
                Ok(()) => {
                    s.phase = PlaybackPhase::Loading;
                    s.is_loading = true;
                    s.error = None;
                }
                Err(e) => {
                    s.phase = PlaybackPhase::Error;
                    s.is_loading = false;
                    s.error = Some(e.to_string());
                }
            }
        });

        if let Err(e) = &loaded {
            tracing::error!(error = %e, "Failed to load episode");
        }
        loaded
    }

    /// Start playback
    ///
    /// Failure is recoverable: it is recorded on the snapshot and `play` may
    /// simply be called again.
    pub async fn play(&mut self) -> Result<()> {
        if self.state.borrow().current_episode.is_none() {
            return Err(PlaybackError::NoEpisodeLoaded);
        }

        match self.media.play().await {
            Ok(()) => {
                self.state.send_modify(|s| {
                    s.is_playing = true;
                    s.phase = PlaybackPhase::Playing;
                    s.error = None;
                });
                self.persistence.arm_periodic();
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Playback failed to start");
                self.state.send_modify(|s| {
                    s.is_playing = false;
                    s.is_loading = false;
                    s.phase = PlaybackPhase::Error;
                    s.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    /// Pause playback (durability checkpoint)
    pub async fn pause(&mut self) {
        self.media.pause();
        self.state.send_modify(|s| {
            s.is_playing = false;
            if s.current_episode.is_some() && s.phase != PlaybackPhase::Error {
                s.phase = PlaybackPhase::Paused;
            }
        });
        self.persistence.disarm_periodic();
        self.persistence.flush_now().await;
    }

    /// Jump to a position in seconds
    ///
    /// Clamped to `[0, duration]`; only the lower bound applies while the
    /// duration is unknown.
    pub fn seek(&mut self, position: f64) {
        if position.is_nan() {
            return;
        }

        let target = {
            let s = self.state.borrow();
            if s.current_episode.is_none() {
                return;
            }
            clamp_position(position, s.duration)
        };

        self.media.set_current_time(target);
        self.state.send_modify(|s| s.position = target);
        self.persistence.schedule_debounced();
    }

    /// Skip ahead (defaults to the configured step)
    pub fn skip_forward(&mut self, seconds: Option<f64>) {
        let step = seconds.unwrap_or(self.config.skip_forward_secs);
        let position = self.state.borrow().position;
        self.seek(position + step);
    }

    /// Skip back (defaults to the configured step)
    pub fn skip_backward(&mut self, seconds: Option<f64>) {
        let step = seconds.unwrap_or(self.config.skip_backward_secs);
        let position = self.state.borrow().position;
        self.seek(position - step);
    }

    /// Set volume, clamped to `[0, 1]`
    pub fn set_volume(&mut self, volume: f64) {
        let Some(volume) = clamp_volume(volume) else {
            return;
        };
        self.media.set_volume(volume);
        self.state.send_modify(|s| s.volume = volume);
    }

    /// Set playback rate, clamped to `[0.5, 3.0]`
    pub fn set_playback_rate(&mut self, rate: f64) {
        let Some(rate) = clamp_rate(rate) else {
            return;
        };
        self.media.set_playback_rate(rate);
        self.state.send_modify(|s| s.playback_rate = rate);
    }

    /// Flip mute without touching the volume
    pub fn toggle_mute(&mut self) {
        let muted = !self.state.borrow().is_muted;
        self.media.set_muted(muted);
        self.state.send_modify(|s| s.is_muted = muted);
    }

    /// Clear the recorded error
    pub fn clear_error(&mut self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Flush, stop and return to `Idle`
    ///
    /// Output settings (volume, rate, mute) survive the reset.
    pub async fn reset(&mut self) {
        self.persistence.flush_now().await;
        self.persistence.cancel_timers();
        self.media.unload();

        self.state.send_modify(|s| {
            *s = SessionSnapshot {
                is_muted: s.is_muted,
                ..SessionSnapshot::idle(s.volume, s.playback_rate)
            };
        });
        tracing::info!("Session reset");
    }

    /// Final checkpoint and timer teardown
    pub async fn shutdown(&mut self) {
        self.media.pause();
        self.state.send_modify(|s| s.is_playing = false);
        self.persistence.shutdown().await;
    }

    /// Apply an event reported by the live source
    ///
    /// Returns [`SessionSignal::Ended`] when the episode finished; the owner is
    /// responsible for advancing.
    pub async fn handle_media_event(&mut self, event: MediaEvent) -> Option<SessionSignal> {
        match event {
            MediaEvent::CanPlay => {
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    if s.phase == PlaybackPhase::Loading {
                        s.phase = PlaybackPhase::Paused;
                    }
                });
            }
            MediaEvent::Play => {
                self.state.send_modify(|s| {
                    s.is_playing = true;
                    s.is_loading = false;
                    s.phase = PlaybackPhase::Playing;
                });
                self.persistence.arm_periodic();
            }
            MediaEvent::Pause => {
                self.state.send_modify(|s| {
                    s.is_playing = false;
                    if s.phase == PlaybackPhase::Playing {
                        s.phase = PlaybackPhase::Paused;
                    }
                });
                self.persistence.disarm_periodic();
                self.persistence.schedule_debounced();
            }
            MediaEvent::TimeUpdate { position } => {
                if !position.is_finite() {
                    return None;
                }
                self.state.send_modify(|s| s.position = position.max(0.0));
                self.persistence.schedule_debounced();
            }
            MediaEvent::DurationChange { duration } => {
                if duration.is_finite() && duration > 0.0 {
                    self.state.send_modify(|s| s.duration = duration);
                }
            }
            MediaEvent::Ended => {
                self.state.send_modify(|s| {
                    if s.duration > 0.0 {
                        s.position = s.duration;
                    }
                    s.is_playing = false;
                    s.phase = PlaybackPhase::Ended;
                });
                self.persistence.disarm_periodic();
                return Some(SessionSignal::Ended);
            }
            MediaEvent::Error { message } => {
                tracing::error!(error = %message, "Media error");
                self.state.send_modify(|s| {
                    s.is_playing = false;
                    s.is_loading = false;
                    s.phase = PlaybackPhase::Error;
                    s.error = Some(message);
                });
                self.persistence.disarm_periodic();
                self.persistence.flush_now().await;
            }
        }
        None
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("state", &*self.state.borrow())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn clamp_volume(volume: f64) -> Option<f64> {
    (!volume.is_nan()).then(|| volume.clamp(VOLUME_RANGE.0, VOLUME_RANGE.1))
}

fn clamp_rate(rate: f64) -> Option<f64> {
    (!rate.is_nan()).then(|| rate.clamp(PLAYBACK_RATE_RANGE.0, PLAYBACK_RATE_RANGE.1))
}

fn clamp_position(position: f64, duration: f64) -> f64 {
    let position = position.max(0.0);
    if duration > 0.0 {
        position.min(duration)
    } else {
        position
    }
}
