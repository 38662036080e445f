//! Pod CLI - shell around the playback engine
//!
//! Wires a [`Player`] to the in-memory repositories and a simulated media
//! element, so queue and session behaviour can be driven interactively or
//! from a script.

pub mod config;
pub mod error;
pub mod library;
pub mod media;
pub mod shell;

use crate::config::CliConfig;
use crate::error::Result;
use crate::library::Library;
use crate::media::SimulatedMedia;
use crate::shell::Shell;
use pod_core::memory::{MemoryEpisodeRepository, MemoryPlaybackStateRepository, MemoryQueueRepository};
use pod_core::types::EpisodeId;
use pod_playback::{Player, Repositories};
use std::io::Write;
use std::sync::Arc;

/// Build an initialized shell writing to `out`
pub async fn build_shell<W: Write>(config: &CliConfig, library: Library, out: W) -> Result<Shell<W>> {
    let episodes = Arc::new(MemoryEpisodeRepository::with_episodes(
        library.episodes().iter().cloned(),
    ));

    let queue = Arc::new(MemoryQueueRepository::new(Arc::clone(&episodes)));
    let initial: Vec<EpisodeId> = config
        .library
        .initial_queue
        .iter()
        .map(EpisodeId::new)
        .filter(|id| {
            let known = library.get(id).is_some();
            if !known {
                tracing::warn!(episode = %id, "Skipping unknown episode in initial queue");
            }
            known
        })
        .collect();
    queue.seed(&initial);

    let playback = Arc::new(MemoryPlaybackStateRepository::new(Arc::clone(&episodes)));

    let (media, clock) = SimulatedMedia::new(library.durations());
    let repos = Repositories {
        episodes: episodes.clone(),
        queue,
        playback,
    };

    let mut player = Player::new(Box::new(media), repos, config.playback.clone());
    player.initialize().await?;

    tracing::info!(
        episodes = library.episodes().len(),
        queued = player.queue().len(),
        "Player ready"
    );

    Ok(Shell::new(player, clock, episodes, out))
}
