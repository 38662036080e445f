use super::{lock, MemoryEpisodeRepository};
use crate::error::{PodError, Result};
use crate::traits::QueueRepository;
use crate::types::{
    EpisodeId, QueueEntry, QueueEntryId, QueuePlacement, QueueReorderItem, QUEUE_POSITION_GAP,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Kind of queue repository call, used for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueOperation {
    /// `get_all`
    GetAll,
    /// `add`
    Add,
    /// `remove`
    Remove,
    /// `reorder`
    Reorder,
    /// `clear`
    Clear,
}

/// A call received by [`MemoryQueueRepository`], with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueCall {
    /// `get_all`
    GetAll,
    /// `add`
    Add {
        /// Episode added
        episode_id: EpisodeId,
        /// Requested placement
        placement: QueuePlacement,
        /// Anchor sent with the request
        anchor_index: Option<i64>,
    },
    /// `remove`
    Remove {
        /// Episode removed
        episode_id: EpisodeId,
    },
    /// `reorder`
    Reorder {
        /// Submitted positions
        items: Vec<QueueReorderItem>,
    },
    /// `clear`
    Clear,
}

impl QueueCall {
    /// Kind of this call
    pub fn operation(&self) -> QueueOperation {
        match self {
            Self::GetAll => QueueOperation::GetAll,
            Self::Add { .. } => QueueOperation::Add,
            Self::Remove { .. } => QueueOperation::Remove,
            Self::Reorder { .. } => QueueOperation::Reorder,
            Self::Clear => QueueOperation::Clear,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    id: QueueEntryId,
    episode_id: EpisodeId,
    position: i64,
    added_at: DateTime<Utc>,
}

/// Queue store with sparse integer positions
///
/// Episodes are resolved through the episode repository at read time, the
/// way a database join would.
#[derive(Debug)]
pub struct MemoryQueueRepository {
    episodes: Arc<MemoryEpisodeRepository>,
    slots: Mutex<Vec<Slot>>,
    calls: Mutex<Vec<QueueCall>>,
    failing: Mutex<HashSet<QueueOperation>>,
}

impl MemoryQueueRepository {
    /// Create an empty queue that resolves episodes through `episodes`
    pub fn new(episodes: Arc<MemoryEpisodeRepository>) -> Self {
        Self {
            episodes,
            slots: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Replace the queue with these episodes at `GAP, 2*GAP, ...`
    ///
    /// Not journaled.
    pub fn seed<'a>(&self, episode_ids: impl IntoIterator<Item = &'a EpisodeId>) {
        let now = Utc::now();
        *lock(&self.slots) = episode_ids
            .into_iter()
            .zip(1..)
            .map(|(episode_id, rank)| Slot {
                id: QueueEntryId::generate(),
                episode_id: episode_id.clone(),
                position: rank * QUEUE_POSITION_GAP,
                added_at: now,
            })
            .collect();
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<QueueCall> {
        lock(&self.calls).clone()
    }

    /// Forget the journaled calls
    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Fail every subsequent call of this kind
    pub fn fail_on(&self, operation: QueueOperation) {
        lock(&self.failing).insert(operation);
    }

    /// Stop failing calls
    pub fn clear_failures(&self) {
        lock(&self.failing).clear();
    }

    /// Record the call, then fail it if its kind was marked failing
    fn begin(&self, call: QueueCall) -> Result<()> {
        let operation = call.operation();
        lock(&self.calls).push(call);
        if lock(&self.failing).contains(&operation) {
            return Err(PodError::unavailable(format!(
                "queue {:?} request failed",
                operation
            )));
        }
        Ok(())
    }

    fn snapshot(&self, slots: &[Slot]) -> Vec<QueueEntry> {
        slots
            .iter()
            .filter_map(|slot| match self.episodes.get(&slot.episode_id) {
                Some(episode) => Some(QueueEntry {
                    id: slot.id.clone(),
                    episode_id: slot.episode_id.clone(),
                    position: slot.position,
                    added_at: Some(slot.added_at),
                    episode,
                }),
                None => {
                    warn!("Queue slot {} references missing episode {}", slot.id, slot.episode_id);
                    None
                }
            })
            .collect()
    }
}

/// Rewrite every position as `(rank + 1) * GAP`
fn renumber(slots: &mut [Slot]) {
    for (slot, rank) in slots.iter_mut().zip(1..) {
        slot.position = rank * QUEUE_POSITION_GAP;
    }
}

/// Index and position for a slot inserted directly after `anchor`
fn position_after(slots: &mut [Slot], anchor: i64) -> (usize, i64) {
    let anchor = anchor.clamp(-1, slots.len() as i64 - 1);
    let index = (anchor + 1) as usize;

    if index == slots.len() {
        let prev = slots.last().map_or(0, |s| s.position);
        return (index, prev + QUEUE_POSITION_GAP);
    }

    let (mut prev, mut next) = neighbours(slots, index);
    if next - prev < 2 {
        renumber(slots);
        (prev, next) = neighbours(slots, index);
    }
    (index, prev + (next - prev) / 2)
}

/// Positions on either side of `index`, with `0` standing in before the head
fn neighbours(slots: &[Slot], index: usize) -> (i64, i64) {
    let prev = if index == 0 { 0 } else { slots[index - 1].position };
    (prev, slots[index].position)
}

#[async_trait]
impl QueueRepository for MemoryQueueRepository {
    async fn get_all(&self) -> Result<Vec<QueueEntry>> {
        self.begin(QueueCall::GetAll)?;
        let slots = lock(&self.slots);
        Ok(self.snapshot(&slots))
    }

    async fn add(
        &self,
        episode_id: &EpisodeId,
        placement: QueuePlacement,
        anchor_index: Option<i64>,
    ) -> Result<Vec<QueueEntry>> {
        self.begin(QueueCall::Add {
            episode_id: episode_id.clone(),
            placement,
            anchor_index,
        })?;

        if self.episodes.get(episode_id).is_none() {
            return Err(PodError::not_found("Episode", episode_id.as_str()));
        }

        let mut slots = lock(&self.slots);
        if slots.iter().any(|s| &s.episode_id == episode_id) {
            return Err(PodError::rejected(format!(
                "episode {} is already queued",
                episode_id
            )));
        }

        let (index, position) = match placement {
            QueuePlacement::End => {
                let prev = slots.last().map_or(0, |s| s.position);
                (slots.len(), prev + QUEUE_POSITION_GAP)
            }
            QueuePlacement::Start => position_after(&mut slots, -1),
            QueuePlacement::PlayNext => position_after(&mut slots, anchor_index.unwrap_or(-1)),
        };

        slots.insert(
            index,
            Slot {
                id: QueueEntryId::generate(),
                episode_id: episode_id.clone(),
                position,
                added_at: Utc::now(),
            },
        );

        Ok(self.snapshot(&slots))
    }

    async fn remove(&self, episode_id: &EpisodeId) -> Result<Vec<QueueEntry>> {
        self.begin(QueueCall::Remove {
            episode_id: episode_id.clone(),
        })?;

        let mut slots = lock(&self.slots);
        let index = slots
            .iter()
            .position(|s| &s.episode_id == episode_id)
            .ok_or_else(|| PodError::not_found("Queue entry", episode_id.as_str()))?;
        slots.remove(index);

        Ok(self.snapshot(&slots))
    }

    async fn reorder(&self, items: Vec<QueueReorderItem>) -> Result<Vec<QueueEntry>> {
        self.begin(QueueCall::Reorder {
            items: items.clone(),
        })?;

        let mut slots = lock(&self.slots);
        let positions: HashMap<&QueueEntryId, i64> =
            items.iter().map(|item| (&item.id, item.position)).collect();

        if let Some(unknown) = positions
            .keys()
            .find(|id| !slots.iter().any(|s| &&s.id == *id))
        {
            return Err(PodError::not_found("Queue entry", unknown.as_str()));
        }

        let mut reordered = slots.clone();
        for slot in &mut reordered {
            if let Some(position) = positions.get(&slot.id) {
                slot.position = *position;
            }
        }
        reordered.sort_by_key(|s| s.position);

        if reordered.windows(2).any(|w| w[0].position == w[1].position) {
            return Err(PodError::rejected("duplicate queue positions"));
        }

        *slots = reordered;
        Ok(self.snapshot(&slots))
    }

    async fn clear(&self) -> Result<Vec<QueueEntry>> {
        self.begin(QueueCall::Clear)?;
        lock(&self.slots).clear();
        Ok(Vec::new())
    }
}
