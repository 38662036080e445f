//! Pod Core
//!
//! Platform-agnostic domain types, repository contracts and error handling
//! shared by every crate of the pod podcast client.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Episode`, `QueueEntry`, `PersistedPlaybackState`
//! - **Repository Traits**: `EpisodeRepository`, `QueueRepository`, `PlaybackStateRepository`
//! - **Error Handling**: Unified `PodError` and `Result` types
//! - **In-memory repositories**: reference implementations used by the CLI and tests
//!
//! The playback engine never talks to a database directly; it only calls the
//! repository traits, which the persistence layer implements.
//!
//! # Example
//!
//! ```rust
//! use pod_core::types::{Episode, EpisodeId, EpisodeStatus};
//!
//! let episode = Episode::new("ep-1", "Pilot", "https://cdn.example.com/pilot.mp3")
//!     .with_duration(1800.0);
//!
//! assert_eq!(episode.id, EpisodeId::new("ep-1"));
//! assert_eq!(episode.status, EpisodeStatus::New);
//! assert_eq!(episode.resume_position(), 0.0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{PodError, Result};
pub use traits::{EpisodeRepository, PlaybackStateRepository, QueueRepository};

pub use types::{
    Episode, EpisodeId, EpisodeStatus, PersistedPlaybackState, ProgressUpdate, QueueEntry,
    QueueEntryId, QueuePlacement, QueueReorderItem, StoredPlayback, QUEUE_POSITION_GAP,
};
