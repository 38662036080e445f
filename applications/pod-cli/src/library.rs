//! Episode library for the shell
//!
//! Loaded from a JSON array of episodes, or the built-in sample feed.

use crate::error::{CliError, Result};
use pod_core::types::{Episode, EpisodeId};
use std::collections::{HashMap, HashSet};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Library {
    episodes: Vec<Episode>,
}

impl Library {
    /// Load from `path`, or fall back to the sample library
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::sample()),
        }
    }

    /// Read a JSON array of episodes
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let episodes: Vec<Episode> = serde_json::from_str(&raw)?;
        tracing::info!(count = episodes.len(), path = ?path, "Loaded episode library");
        Self::from_episodes(episodes)
    }

    /// Build a library, rejecting duplicate ids
    pub fn from_episodes(episodes: Vec<Episode>) -> Result<Self> {
        let mut seen = HashSet::new();
        if let Some(duplicate) = episodes.iter().find(|e| !seen.insert(e.id.clone())) {
            return Err(CliError::Library(format!(
                "duplicate episode id {}",
                duplicate.id
            )));
        }
        Ok(Self { episodes })
    }

    /// A small built-in feed
    pub fn sample() -> Self {
        let feed = [
            ("rust-001", "Ownership without tears", 1_845.0),
            ("rust-002", "Borrowing in practice", 2_210.0),
            ("rust-003", "Async from the ground up", 3_012.0),
            ("rust-004", "Error handling patterns", 1_530.0),
            ("rust-005", "Testing with time", 2_475.0),
        ];

        Self {
            episodes: feed
                .iter()
                .map(|(id, title, duration)| {
                    Episode::new(
                        *id,
                        *title,
                        format!("https://cdn.example.com/podcast/{id}.mp3"),
                    )
                    .with_duration(*duration)
                })
                .collect(),
        }
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn get(&self, id: &EpisodeId) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.id == *id)
    }

    /// Known durations keyed by audio URL, used by the simulated media element
    pub fn durations(&self) -> HashMap<String, f64> {
        self.episodes
            .iter()
            .filter_map(|e| e.duration_sec.map(|d| (e.audio_url.clone(), d)))
            .collect()
    }
}
