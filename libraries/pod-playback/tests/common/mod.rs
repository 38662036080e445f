//! Shared fixtures for pod-playback integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use pod_core::memory::{MemoryEpisodeRepository, MemoryPlaybackStateRepository, MemoryQueueRepository};
use pod_core::types::{Episode, EpisodeId};
use pod_playback::{
    MediaElement, PlaybackConfig, PlaybackError, PlaybackSession, Player, Repositories, Result,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Duration given to every fixture episode
pub const EPISODE_DURATION: f64 = 600.0;

/// A call received by [`FakeMedia`]
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    Load { url: String, start: f64 },
    Play,
    Pause,
    SetCurrentTime(f64),
    SetVolume(f64),
    SetMuted(bool),
    SetPlaybackRate(f64),
    Unload,
}

/// Test-side handle to a [`FakeMedia`]
#[derive(Debug, Clone, Default)]
pub struct MediaProbe {
    calls: Arc<Mutex<Vec<MediaCall>>>,
    fail_play: Arc<AtomicBool>,
    fail_load: Arc<AtomicBool>,
}

impl MediaProbe {
    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn loads(&self) -> Vec<(String, f64)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MediaCall::Load { url, start } => Some((url, start)),
                _ => None,
            })
            .collect()
    }

    pub fn play_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == MediaCall::Play)
            .count()
    }

    pub fn fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    pub fn fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    fn record(&self, call: MediaCall) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Media element that records calls and never produces audio
pub struct FakeMedia {
    probe: MediaProbe,
}

impl FakeMedia {
    pub fn new() -> (Self, MediaProbe) {
        let probe = MediaProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

#[async_trait]
impl MediaElement for FakeMedia {
    fn load(&mut self, url: &str, start_position: f64) -> Result<()> {
        self.probe.record(MediaCall::Load {
            url: url.to_string(),
            start: start_position,
        });
        if self.probe.fail_load.load(Ordering::SeqCst) {
            return Err(PlaybackError::Media("unsupported format".to_string()));
        }
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        self.probe.record(MediaCall::Play);
        if self.probe.fail_play.load(Ordering::SeqCst) {
            return Err(PlaybackError::Media("autoplay blocked".to_string()));
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.probe.record(MediaCall::Pause);
    }

    fn set_current_time(&mut self, position: f64) {
        self.probe.record(MediaCall::SetCurrentTime(position));
    }

    fn set_volume(&mut self, volume: f64) {
        self.probe.record(MediaCall::SetVolume(volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.probe.record(MediaCall::SetMuted(muted));
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.probe.record(MediaCall::SetPlaybackRate(rate));
    }

    fn unload(&mut self) {
        self.probe.record(MediaCall::Unload);
    }
}

/// Episode `ep-{n}` with a known duration
pub fn episode(n: usize) -> Episode {
    Episode::new(
        format!("ep-{n}"),
        format!("Episode {n}"),
        format!("https://cdn.example.com/{n}.mp3"),
    )
    .with_duration(EPISODE_DURATION)
}

pub fn id(n: usize) -> EpisodeId {
    EpisodeId::new(format!("ep-{n}"))
}

/// Episode ids in queue order
pub fn queued_ids(player: &Player) -> Vec<String> {
    player
        .queue()
        .entries()
        .iter()
        .map(|e| e.episode_id.to_string())
        .collect()
}

/// Repositories plus the media probe behind a player or session
pub struct Fixture {
    pub episodes: Arc<MemoryEpisodeRepository>,
    pub queue: Arc<MemoryQueueRepository>,
    pub playback: Arc<MemoryPlaybackStateRepository>,
    pub media: MediaProbe,
}

impl Fixture {
    /// Five episodes in the library, the first `queued` of them in the queue
    pub fn new(queued: usize) -> Self {
        let episodes = Arc::new(MemoryEpisodeRepository::with_episodes(
            (1..=5).map(episode),
        ));
        let queue = Arc::new(MemoryQueueRepository::new(Arc::clone(&episodes)));
        let ids: Vec<EpisodeId> = (1..=queued).map(id).collect();
        queue.seed(&ids);
        let playback = Arc::new(MemoryPlaybackStateRepository::new(Arc::clone(&episodes)));

        Self {
            episodes,
            queue,
            playback,
            media: MediaProbe::default(),
        }
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            episodes: self.episodes.clone(),
            queue: self.queue.clone(),
            playback: self.playback.clone(),
        }
    }

    /// Build an initialized player
    pub async fn player(&mut self, config: PlaybackConfig) -> Player {
        let (media, probe) = FakeMedia::new();
        self.media = probe;
        let mut player = Player::new(Box::new(media), self.repositories(), config);
        player.initialize().await.unwrap();
        self.queue.clear_calls();
        player
    }

    /// Build a bare session
    pub fn session(&mut self, config: PlaybackConfig) -> PlaybackSession {
        let (media, probe) = FakeMedia::new();
        self.media = probe;
        PlaybackSession::new(
            Box::new(media),
            self.episodes.clone(),
            self.playback.clone(),
            config,
        )
    }
}
