//! Simulated live audio source
//!
//! Stands in for a real audio element: it keeps a clock that the shell
//! advances explicitly and queues the events a browser audio element would
//! emit. The shell drains those events and feeds them back to the player.

use async_trait::async_trait;
use pod_playback::{MediaElement, MediaEvent, PlaybackError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct ClockState {
    url: Option<String>,
    position: f64,
    duration: f64,
    playing: bool,
    rate: f64,
    muted: bool,
    volume: f64,
    /// Next `play` is rejected (autoplay policy simulation)
    reject_play: bool,
    pending: VecDeque<MediaEvent>,
}

/// Shell-side handle to the simulated source
#[derive(Debug, Clone, Default)]
pub struct MediaClock {
    state: Arc<Mutex<ClockState>>,
}

impl MediaClock {
    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Let `seconds` of wall time pass
    ///
    /// Position advances by `seconds * rate` while playing. Reaching the
    /// duration emits `Ended`.
    pub fn advance(&self, seconds: f64) {
        let mut state = self.lock();
        if !state.playing || seconds <= 0.0 {
            return;
        }

        let mut position = state.position + seconds * state.rate;
        let ended = state.duration > 0.0 && position >= state.duration;
        if ended {
            position = state.duration;
        }

        state.position = position;
        state.pending.push_back(MediaEvent::TimeUpdate { position });
        if ended {
            state.playing = false;
            state.pending.push_back(MediaEvent::Ended);
        }
    }

    /// Report a decode/network failure
    pub fn fail(&self, message: impl Into<String>) {
        let mut state = self.lock();
        state.playing = false;
        state.pending.push_back(MediaEvent::Error {
            message: message.into(),
        });
    }

    /// Reject the next `play` request
    pub fn reject_next_play(&self) {
        self.lock().reject_play = true;
    }

    /// Take the events emitted since the last drain
    pub fn drain_events(&self) -> Vec<MediaEvent> {
        self.lock().pending.drain(..).collect()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    pub fn position(&self) -> f64 {
        self.lock().position
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    pub fn volume(&self) -> f64 {
        self.lock().volume
    }
}

/// [`MediaElement`] backed by a [`MediaClock`]
#[derive(Debug)]
pub struct SimulatedMedia {
    clock: MediaClock,
    durations: HashMap<String, f64>,
}

impl SimulatedMedia {
    /// Create a source that knows the duration of each URL
    pub fn new(durations: HashMap<String, f64>) -> (Self, MediaClock) {
        let clock = MediaClock::default();
        {
            let mut state = clock.lock();
            state.rate = 1.0;
            state.volume = 1.0;
        }
        (
            Self {
                clock: clock.clone(),
                durations,
            },
            clock,
        )
    }
}

#[async_trait]
impl MediaElement for SimulatedMedia {
    fn load(&mut self, url: &str, start_position: f64) -> Result<()> {
        if url.is_empty() {
            return Err(PlaybackError::Media("empty source URL".to_string()));
        }

        let duration = self.durations.get(url).copied();
        let mut state = self.clock.lock();
        state.url = Some(url.to_string());
        state.playing = false;
        state.pending.clear();
        state.duration = duration.unwrap_or(0.0);
        state.position = match duration {
            Some(d) => start_position.min(d),
            None => start_position,
        };

        if let Some(duration) = duration {
            state.pending.push_back(MediaEvent::DurationChange { duration });
        }
        state.pending.push_back(MediaEvent::CanPlay);
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        let mut state = self.clock.lock();
        if state.url.is_none() {
            return Err(PlaybackError::Media("no source".to_string()));
        }
        if std::mem::take(&mut state.reject_play) {
            return Err(PlaybackError::Media(
                "play() request was rejected".to_string(),
            ));
        }
        if !state.playing {
            state.playing = true;
            state.pending.push_back(MediaEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        let mut state = self.clock.lock();
        if state.playing {
            state.playing = false;
            state.pending.push_back(MediaEvent::Pause);
        }
    }

    fn set_current_time(&mut self, position: f64) {
        let mut state = self.clock.lock();
        state.position = position;
        let position = state.position;
        state.pending.push_back(MediaEvent::TimeUpdate { position });
    }

    fn set_volume(&mut self, volume: f64) {
        self.clock.lock().volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.clock.lock().muted = muted;
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.clock.lock().rate = rate;
    }

    fn unload(&mut self) {
        let mut state = self.clock.lock();
        *state = ClockState {
            rate: state.rate,
            volume: state.volume,
            muted: state.muted,
            ..ClockState::default()
        };
    }
}
