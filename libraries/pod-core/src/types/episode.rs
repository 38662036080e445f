//! Episode entity as seen by the playback core

use super::ids::EpisodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    /// Never started
    #[default]
    New,
    /// Started but not finished
    InProgress,
    /// Listened to the end
    Played,
    /// Hidden by the listener
    Archived,
}

impl EpisodeStatus {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Played => "played",
            Self::Archived => "archived",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "in_progress" => Some(Self::InProgress),
            "played" => Some(Self::Played),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Whether loading an episode in this status starts it from the beginning
    #[must_use]
    pub fn restarts_playback(&self) -> bool {
        matches!(self, Self::Played | Self::Archived)
    }
}

impl std::fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A podcast episode
///
/// Owned by the episode repository. The playback core only reads it and
/// writes back position and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Stable identity
    pub id: EpisodeId,

    /// Display title
    pub title: String,

    /// Audio enclosure URL
    pub audio_url: String,

    /// Total duration in seconds (unknown until the feed or the media reports it)
    #[serde(default)]
    pub duration_sec: Option<f64>,

    /// Last known playback position in whole seconds
    #[serde(default)]
    pub last_position_sec: u64,

    /// Lifecycle status
    #[serde(default)]
    pub status: EpisodeStatus,

    /// When the episode was last listened to
    #[serde(default)]
    pub last_played_at: Option<DateTime<Utc>>,
}

impl Episode {
    /// Create a new, never played episode
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        audio_url: impl Into<String>,
    ) -> Self {
        Self {
            id: EpisodeId::new(id),
            title: title.into(),
            audio_url: audio_url.into(),
            duration_sec: None,
            last_position_sec: 0,
            status: EpisodeStatus::New,
            last_played_at: None,
        }
    }

    /// Set the known duration
    #[must_use]
    pub fn with_duration(mut self, duration_sec: f64) -> Self {
        self.duration_sec = Some(duration_sec);
        self
    }

    /// Set the last known position and status
    #[must_use]
    pub fn with_progress(mut self, last_position_sec: u64, status: EpisodeStatus) -> Self {
        self.last_position_sec = last_position_sec;
        self.status = status;
        self
    }

    /// Offset playback should start from when this episode is loaded
    ///
    /// Finished and archived episodes replay from the beginning.
    pub fn resume_position(&self) -> f64 {
        if self.status.restarts_playback() {
            0.0
        } else {
            self.last_position_sec as f64
        }
    }
}
