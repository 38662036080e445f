//! Progress persistence tests
//!
//! Debounced, periodic and immediate writes on a paused tokio clock, plus
//! status derivation as seen by the episode repository.

mod common;

use common::{episode, id, Fixture};
use pod_core::types::EpisodeStatus;
use pod_playback::{FlushReason, MediaEvent, PersistenceEvent, PlaybackConfig};
use std::time::Duration;

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

// ===== Debounced writer =====

#[tokio::test(start_paused = true)]
async fn debounce_collapses_updates_into_one_write() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session.load_episode(episode(1)).await.unwrap();

    for position in 1..=5 {
        session
            .handle_media_event(MediaEvent::TimeUpdate {
                position: position as f64 * 10.0 + 0.7,
            })
            .await;
        advance(1).await;
    }
    assert_eq!(fixture.playback.save_count(), 0);

    advance(11).await;

    let saves = fixture.playback.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].position_sec, 50);
    assert!(!session.persistence().has_pending_debounce());
}

#[tokio::test(start_paused = true)]
async fn debounce_waits_for_a_quiet_period() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session.load_episode(episode(1)).await.unwrap();

    // Updates every 9s keep pushing the write out
    for position in [10.0, 20.0, 30.0] {
        session
            .handle_media_event(MediaEvent::TimeUpdate { position })
            .await;
        advance(9).await;
    }
    assert_eq!(fixture.playback.save_count(), 0);

    advance(2).await;
    assert_eq!(fixture.playback.save_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn immediate_flush_cancels_pending_debounce() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session.load_episode(episode(1)).await.unwrap();

    session
        .handle_media_event(MediaEvent::TimeUpdate { position: 42.0 })
        .await;
    session.pause().await;
    assert_eq!(fixture.playback.save_count(), 1);

    advance(30).await;

    let saves = fixture.playback.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].position_sec, 42);
}

// ===== Periodic writer =====

#[tokio::test(start_paused = true)]
async fn periodic_writes_while_playing() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session.load_episode(episode(1)).await.unwrap();
    session.play().await.unwrap();

    advance(23).await;

    // floor(23 / 5) with no position updates at all
    assert_eq!(fixture.playback.save_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn periodic_stops_on_pause() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session.load_episode(episode(1)).await.unwrap();
    session.play().await.unwrap();

    advance(12).await;
    session.pause().await;
    let after_pause = fixture.playback.save_count();

    advance(60).await;

    assert_eq!(fixture.playback.save_count(), after_pause);
    assert!(!session.persistence().is_periodic_armed());
}

#[tokio::test(start_paused = true)]
async fn periodic_stops_on_reset() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session.load_episode(episode(1)).await.unwrap();
    session.play().await.unwrap();

    session.reset().await;
    let after_reset = fixture.playback.save_count();
    advance(60).await;

    assert_eq!(fixture.playback.save_count(), after_reset);
}

#[tokio::test(start_paused = true)]
async fn custom_intervals_are_honoured() {
    let mut fixture = Fixture::new(0);
    let config = PlaybackConfig {
        periodic_save_ms: 2_000,
        ..PlaybackConfig::default()
    };
    let mut session = fixture.session(config);
    session.load_episode(episode(1)).await.unwrap();
    session.play().await.unwrap();

    advance(9).await;

    assert_eq!(fixture.playback.save_count(), 4);
}

// ===== Immediate flushes =====

#[tokio::test(start_paused = true)]
async fn loading_flushes_the_outgoing_episode() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session.load_episode(episode(1)).await.unwrap();
    session
        .handle_media_event(MediaEvent::TimeUpdate { position: 30.4 })
        .await;

    session.load_episode(episode(2)).await.unwrap();

    let saves = fixture.playback.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].episode_id, id(1));
    assert_eq!(saves[0].position_sec, 30);

    let stored = fixture.episodes.get(&id(1)).unwrap();
    assert_eq!(stored.last_position_sec, 30);
    assert_eq!(stored.status, EpisodeStatus::InProgress);

    advance(30).await;
    assert_eq!(fixture.playback.save_count(), 1);
}

#[tokio::test]
async fn identical_immediate_flushes_are_skipped() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session.load_episode(episode(1)).await.unwrap();
    session.seek(90.0);

    session.pause().await;
    session.pause().await;

    assert_eq!(fixture.playback.save_count(), 1);
    assert_eq!(fixture.episodes.progress_updates().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn pause_writes_again_once_the_duration_is_known() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    let mut ep = episode(1);
    ep.duration_sec = None;
    session.load_episode(ep).await.unwrap();
    session.play().await.unwrap();
    session
        .handle_media_event(MediaEvent::TimeUpdate { position: 300.0 })
        .await;

    // One periodic write while the duration is still unknown
    tokio::time::sleep(Duration::from_millis(5_100)).await;
    let updates = fixture.episodes.progress_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].status, None);

    session
        .handle_media_event(MediaEvent::DurationChange { duration: 600.0 })
        .await;
    session.pause().await;

    let updates = fixture.episodes.progress_updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].last_position_sec, 300);
    assert_eq!(updates[1].status, Some(EpisodeStatus::InProgress));
    assert_eq!(
        fixture.episodes.get(&id(1)).unwrap().status,
        EpisodeStatus::InProgress
    );
}

// ===== Status derivation =====

#[tokio::test]
async fn near_the_end_marks_played() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session.load_episode(episode(1)).await.unwrap();

    session
        .handle_media_event(MediaEvent::TimeUpdate { position: 570.0 })
        .await;
    session.pause().await;

    let update = fixture.episodes.progress_updates().pop().unwrap();
    assert_eq!(update.status, Some(EpisodeStatus::Played));
    assert_eq!(update.last_position_sec, 570);

    // The local snapshot reflects the write without a re-fetch
    let current = session.current_episode().unwrap();
    assert_eq!(current.status, EpisodeStatus::Played);
    assert_eq!(current.last_position_sec, 570);
    assert!(current.last_played_at.is_some());
}

#[tokio::test]
async fn position_zero_marks_new() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session
        .load_episode(episode(1).with_progress(0, EpisodeStatus::InProgress))
        .await
        .unwrap();

    session.pause().await;

    let update = fixture.episodes.progress_updates().pop().unwrap();
    assert_eq!(update.status, Some(EpisodeStatus::New));
}

#[tokio::test]
async fn unknown_duration_writes_no_status() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    let mut ep = episode(1);
    ep.duration_sec = None;
    session.load_episode(ep).await.unwrap();
    session
        .handle_media_event(MediaEvent::TimeUpdate { position: 45.0 })
        .await;

    session.pause().await;

    let update = fixture.episodes.progress_updates().pop().unwrap();
    assert_eq!(update.last_position_sec, 45);
    assert_eq!(update.status, None);
    assert_eq!(
        fixture.episodes.get(&id(1)).unwrap().status,
        EpisodeStatus::New
    );
}

// ===== Failures and events =====

#[tokio::test]
async fn storage_failures_are_swallowed() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session.load_episode(episode(1)).await.unwrap();
    session.seek(120.0);
    fixture.episodes.set_offline(true);
    fixture.playback.set_offline(true);

    session.pause().await;

    assert_eq!(fixture.playback.save_count(), 0);
    assert_eq!(session.current_episode().unwrap().last_position_sec, 0);

    // Not recorded as written, so the next checkpoint retries
    fixture.episodes.set_offline(false);
    fixture.playback.set_offline(false);
    session.pause().await;
    assert_eq!(fixture.playback.save_count(), 1);
}

#[tokio::test]
async fn saved_progress_is_broadcast() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    let mut events = session.persistence().subscribe();
    session.load_episode(episode(1)).await.unwrap();
    session.seek(300.0);

    session.pause().await;

    match events.try_recv().unwrap() {
        PersistenceEvent::ProgressSaved {
            episode_id,
            position_sec,
            status,
            reason,
            ..
        } => {
            assert_eq!(episode_id, id(1));
            assert_eq!(position_sec, 300);
            assert_eq!(status, Some(EpisodeStatus::InProgress));
            assert_eq!(reason, FlushReason::Immediate);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn explicit_marks_update_the_snapshot() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    let mut events = session.persistence().subscribe();
    session
        .load_episode(episode(1).with_progress(200, EpisodeStatus::InProgress))
        .await
        .unwrap();

    session.persistence().mark_new(&id(1)).await.unwrap();

    let current = session.current_episode().unwrap();
    assert_eq!(current.status, EpisodeStatus::New);
    assert_eq!(current.last_position_sec, 0);
    assert_eq!(
        events.try_recv().unwrap(),
        PersistenceEvent::StatusChanged {
            episode_id: id(1),
            status: EpisodeStatus::New,
        }
    );

    session.persistence().mark_archived(&id(2)).await.unwrap();
    assert_eq!(
        fixture.episodes.get(&id(2)).unwrap().status,
        EpisodeStatus::Archived
    );
    // Other episodes leave the session untouched
    assert_eq!(
        session.current_episode().unwrap().status,
        EpisodeStatus::New
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_flushes_and_stops_timers() {
    let mut fixture = Fixture::new(0);
    let mut session = fixture.session(PlaybackConfig::default());
    session.load_episode(episode(1)).await.unwrap();
    session.play().await.unwrap();
    session
        .handle_media_event(MediaEvent::TimeUpdate { position: 64.0 })
        .await;

    session.shutdown().await;
    assert_eq!(fixture.playback.save_count(), 1);
    assert!(!session.persistence().is_periodic_armed());
    assert!(!session.persistence().has_pending_debounce());

    advance(60).await;
    assert_eq!(fixture.playback.save_count(), 1);
}
