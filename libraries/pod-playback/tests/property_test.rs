//! Property-based tests for queue ordering, status derivation and index
//! coherence

use pod_core::memory::{MemoryEpisodeRepository, MemoryQueueRepository};
use pod_core::types::{
    Episode, EpisodeId, EpisodeStatus, QueueEntry, QueueEntryId, QUEUE_POSITION_GAP,
};
use pod_playback::{derive_status, reorder_positions, QueueStore};
use proptest::prelude::*;
use std::sync::Arc;

fn entries_with_positions(positions: &[i64]) -> Vec<QueueEntry> {
    positions
        .iter()
        .enumerate()
        .map(|(i, &position)| {
            let episode = Episode::new(format!("ep-{i}"), "t", "https://cdn/x.mp3");
            QueueEntry {
                id: QueueEntryId::new(format!("slot-{i}")),
                episode_id: episode.id.clone(),
                position,
                added_at: None,
                episode,
            }
        })
        .collect()
}

/// Strictly increasing sparse positions
fn sparse_positions() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(1i64..5000, 1..20).prop_map(|steps| {
        steps
            .into_iter()
            .scan(0i64, |acc, step| {
                *acc += step;
                Some(*acc)
            })
            .collect()
    })
}

#[derive(Debug, Clone)]
enum QueueOp {
    AddNext(usize),
    AddEnd(usize),
    MoveToStart(usize),
    Remove(usize),
    Reorder(usize, usize),
    Play(Option<usize>),
}

fn queue_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        (0usize..8).prop_map(QueueOp::AddNext),
        (0usize..8).prop_map(QueueOp::AddEnd),
        (0usize..8).prop_map(QueueOp::MoveToStart),
        (0usize..8).prop_map(QueueOp::Remove),
        (0usize..10, 0usize..10).prop_map(|(a, b)| QueueOp::Reorder(a, b)),
        prop::option::of(0usize..8).prop_map(QueueOp::Play),
    ]
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn reorder_produces_strictly_increasing_gap_multiples(
        positions in sparse_positions(),
        from_seed in any::<usize>(),
        to_seed in any::<usize>(),
    ) {
        let entries = entries_with_positions(&positions);
        let len = entries.len();
        let (from, to) = (from_seed % len, to_seed % len);
        prop_assume!(from != to);

        let items = reorder_positions(&entries, from, to).unwrap();
        prop_assert_eq!(items.len(), len);

        // Apply the submitted positions the way a repository would
        let mut applied: Vec<(i64, String)> = items
            .iter()
            .map(|item| (item.position, item.id.to_string()))
            .collect();
        applied.sort();

        let mut expected: Vec<String> = entries.iter().map(|e| e.id.to_string()).collect();
        let moved = expected.remove(from);
        expected.insert(to, moved);

        let final_order: Vec<String> = applied.iter().map(|(_, id)| id.clone()).collect();
        prop_assert_eq!(final_order, expected);

        for (rank, (position, _)) in applied.iter().enumerate() {
            prop_assert_eq!(*position, (rank as i64 + 1) * QUEUE_POSITION_GAP);
        }
    }

    #[test]
    fn degenerate_reorders_are_no_ops(
        positions in sparse_positions(),
        index in 0usize..40,
    ) {
        let entries = entries_with_positions(&positions);
        prop_assert!(reorder_positions(&entries, index, index).is_none());
        prop_assert!(reorder_positions(&entries, entries.len() + index, 0).is_none());
        prop_assert!(reorder_positions(&entries, 0, entries.len() + index).is_none());
    }

    #[test]
    fn status_follows_percent_complete(
        position_sec in 0u64..20_000,
        duration in 1.0f64..20_000.0,
    ) {
        let status = derive_status(position_sec, duration);
        let expected = if position_sec == 0 {
            EpisodeStatus::New
        } else if position_sec as f64 / duration >= 0.95 {
            EpisodeStatus::Played
        } else {
            EpisodeStatus::InProgress
        };
        prop_assert_eq!(status, Some(expected));
    }

    #[test]
    fn status_needs_a_known_duration(
        position_sec in 0u64..20_000,
        duration in -20_000.0f64..=0.0,
    ) {
        prop_assert_eq!(derive_status(position_sec, duration), None);
    }

    #[test]
    fn current_index_matches_playing_episode(
        seeded in 0usize..6,
        ops in prop::collection::vec(queue_op(), 1..25),
    ) {
        block_on(async {
            let episodes = Arc::new(MemoryEpisodeRepository::with_episodes(
                (0..8).map(|i| Episode::new(format!("ep-{i}"), "t", "https://cdn/x.mp3")),
            ));
            let repo = Arc::new(MemoryQueueRepository::new(Arc::clone(&episodes)));
            let ids: Vec<EpisodeId> = (0..seeded).map(|i| EpisodeId::new(format!("ep-{i}"))).collect();
            repo.seed(&ids);

            let mut queue = QueueStore::new(repo);
            queue.refresh().await.unwrap();
            let mut playing: Option<EpisodeId> = None;

            for op in ops {
                let ep = |n: usize| EpisodeId::new(format!("ep-{n}"));
                match op {
                    QueueOp::AddNext(n) => queue.add_play_next(&ep(n)).await.unwrap(),
                    QueueOp::AddEnd(n) => queue.add_to_queue_end(&ep(n)).await.unwrap(),
                    QueueOp::MoveToStart(n) => queue.move_to_queue_start(&ep(n)).await.unwrap(),
                    QueueOp::Remove(n) => {
                        queue.remove_from_queue(&ep(n)).await.unwrap();
                    }
                    QueueOp::Reorder(a, b) => queue.reorder_queue(a, b).await.unwrap(),
                    QueueOp::Play(n) => {
                        playing = n.map(ep);
                        queue.set_playing(playing.clone());
                    }
                }

                let expected = playing
                    .as_ref()
                    .and_then(|id| queue.entries().iter().position(|e| e.episode_id == *id));
                assert_eq!(queue.current_index(), expected);

                let positions: Vec<i64> = queue.entries().iter().map(|e| e.position).collect();
                assert!(positions.windows(2).all(|w| w[0] < w[1]));
                assert!(positions.iter().all(|p| *p > 0));
            }
        });
    }
}
