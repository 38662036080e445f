//! Domain types for the playback core

mod episode;
mod ids;
mod playback_state;
mod queue;

pub use episode::{Episode, EpisodeStatus};
pub use ids::{EpisodeId, QueueEntryId};
pub use playback_state::{PersistedPlaybackState, ProgressUpdate, StoredPlayback};
pub use queue::{QueueEntry, QueuePlacement, QueueReorderItem, QUEUE_POSITION_GAP};
