//! Play queue types

use super::{episode::Episode, ids::EpisodeId, ids::QueueEntryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Spacing between consecutive queue positions after a full renumbering
pub const QUEUE_POSITION_GAP: i64 = 1000;

/// One slot in the ordered play queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Slot identity
    pub id: QueueEntryId,

    /// Episode this slot plays
    pub episode_id: EpisodeId,

    /// Sparse sort key, only ever compared
    pub position: i64,

    /// When the slot was created
    pub added_at: Option<DateTime<Utc>>,

    /// Episode snapshot joined by the repository
    pub episode: Episode,
}

/// Where an `add` request places the episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueuePlacement {
    /// Absolute head of the queue
    Start,
    /// After the last entry
    End,
    /// Directly after the anchor index (`-1` = before the head)
    PlayNext,
}

impl QueuePlacement {
    /// Wire name of the placement
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::PlayNext => "play-next",
        }
    }
}

impl std::fmt::Display for QueuePlacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// New position for one slot in a reorder request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueReorderItem {
    /// Slot being moved
    pub id: QueueEntryId,
    /// Its new sort key
    pub position: i64,
}

impl QueueReorderItem {
    /// Create a reorder item
    pub fn new(id: QueueEntryId, position: i64) -> Self {
        Self { id, position }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_uses_kebab_case_wire_names() {
        assert_eq!(
            serde_json::to_string(&QueuePlacement::PlayNext).unwrap(),
            "\"play-next\""
        );
        assert_eq!(QueuePlacement::Start.to_string(), "start");
    }
}
