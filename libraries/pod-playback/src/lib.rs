//! Pod Playback - Queue and Session Engine
//!
//! Owns "what is playing now", "what plays next" and "where the listener left
//! off", and keeps the three consistent across a live audio source, a
//! reorderable queue and durable storage.
//!
//! This crate provides:
//! - Playback session state machine around a single live audio source
//! - Repository-backed play queue with a derived current index
//! - Progress persistence (debounced, periodic and immediate flushes)
//! - Episode status derivation from percent complete
//! - Synchronisation of the queue index with the session
//!
//! # Architecture
//!
//! `pod-playback` is platform-agnostic:
//! - The audio output is a trait ([`MediaElement`]) the host implements
//! - Storage is reached only through the `pod-core` repository traits
//! - State is observed through `tokio::sync::watch` receivers
//!
//! [`Player`] is the application context: it owns the session, the queue and
//! the synchronizer, and is the only mutation entry point.
//!
//! # Example
//!
//! ```rust,no_run
//! use pod_core::memory::{MemoryEpisodeRepository, MemoryPlaybackStateRepository, MemoryQueueRepository};
//! use pod_playback::{MediaElement, PlaybackConfig, Player, Repositories, Result};
//! use std::sync::Arc;
//!
//! struct Silent;
//!
//! #[async_trait::async_trait]
//! impl MediaElement for Silent {
//!     fn load(&mut self, _url: &str, _start: f64) -> Result<()> { Ok(()) }
//!     async fn play(&mut self) -> Result<()> { Ok(()) }
//!     fn pause(&mut self) {}
//!     fn set_current_time(&mut self, _position: f64) {}
//!     fn set_volume(&mut self, _volume: f64) {}
//!     fn set_muted(&mut self, _muted: bool) {}
//!     fn set_playback_rate(&mut self, _rate: f64) {}
//!     fn unload(&mut self) {}
//! }
//!
//! # async fn run() -> Result<()> {
//! let episodes = Arc::new(MemoryEpisodeRepository::new());
//! let repos = Repositories {
//!     queue: Arc::new(MemoryQueueRepository::new(Arc::clone(&episodes))),
//!     playback: Arc::new(MemoryPlaybackStateRepository::new(Arc::clone(&episodes))),
//!     episodes,
//! };
//!
//! let mut player = Player::new(Box::new(Silent), repos, PlaybackConfig::default());
//! player.initialize().await?;
//! player.play_next().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod persistence;
pub mod player;
pub mod queue;
pub mod session;
pub mod source;
pub mod sync;
pub mod types;

pub use error::{PlaybackError, Result};
pub use events::{FlushReason, MediaEvent, PersistenceEvent, SessionSignal};
pub use persistence::{derive_status, whole_seconds, PersistenceCoordinator};
pub use player::{Player, Repositories};
pub use queue::{reorder_positions, QueueStore, RemoveOutcome};
pub use session::PlaybackSession;
pub use source::MediaElement;
pub use sync::Synchronizer;
pub use types::{
    PlaybackConfig, PlaybackPhase, QueueSnapshot, SessionSnapshot, COMPLETION_THRESHOLD,
    PLAYBACK_RATE_RANGE, VOLUME_RANGE,
};
