//! In-memory repository implementations
//!
//! Back the repository traits with in-process collections. Used by the CLI
//! shell and by tests; they keep a journal of the writes they receive and can
//! be told to fail, which makes transient I/O failures reproducible.

mod episodes;
mod playback;
mod queue;

pub use episodes::{EpisodeWrite, MemoryEpisodeRepository};
pub use playback::{MemoryPlaybackStateRepository, SavedPosition};
pub use queue::{MemoryQueueRepository, QueueCall, QueueOperation};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
