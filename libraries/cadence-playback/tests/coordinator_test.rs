//! Integration tests for the playback coordinator
//!
//! Drives a coordinator against the virtual engine with tokio's clock paused,
//! so playback positions and auto-advance are deterministic.

use cadence_core::{AudioSource, Track};
use cadence_playback::{
    CoordinatorConfig, MediaEngine, PlaybackCoordinator, PlaybackError, PlayerState,
    RepeatMode, TransportPhase, VirtualConnector, VirtualEngine, VirtualEngineConfig,
};
use std::sync::Arc;
use std::time::Duration;

// ===== Test Helpers =====

struct Harness {
    engine: Arc<VirtualEngine>,
    connector: Arc<VirtualConnector>,
    coordinator: PlaybackCoordinator,
}

fn start() -> Harness {
    start_with(VirtualConnector::new)
}

fn start_with(build: impl FnOnce(Arc<VirtualEngine>) -> VirtualConnector) -> Harness {
    let engine = VirtualEngine::spawn(VirtualEngineConfig::default());
    let connector = Arc::new(build(Arc::clone(&engine)));
    let coordinator = PlaybackCoordinator::new(connector.clone(), CoordinatorConfig::default());
    Harness {
        engine,
        connector,
        coordinator,
    }
}

fn track(n: usize) -> Track {
    Track::new(
        format!("Song{}", n),
        format!("Artist{}", n),
        AudioSource::remote(format!("http://x/{}.mp3", n)),
    )
}

fn tracks(count: usize) -> Vec<Track> {
    (1..=count).map(track).collect()
}

fn unresolvable(n: usize) -> Track {
    Track::new(
        format!("Broken{}", n),
        "Nobody",
        AudioSource::remote(format!("ftp://x/{}.mp3", n)),
    )
}

async fn settle(
    coordinator: &PlaybackCoordinator,
    predicate: impl FnMut(&PlayerState) -> bool,
) -> PlayerState {
    tokio::time::timeout(Duration::from_secs(5), coordinator.wait_for(predicate))
        .await
        .expect("coordinator never reached the expected state")
}

async fn playing(coordinator: &PlaybackCoordinator, expected: &Track) -> PlayerState {
    settle(coordinator, |s| s.is_playing() && s.is_current(expected)).await
}

// ===== Loading =====

#[tokio::test(start_paused = true)]
async fn load_next_previous_scenario() {
    let h = start();
    let playlist = tracks(2);

    h.coordinator.load_playlist(playlist.clone(), 0);
    let state = playing(&h.coordinator, &playlist[0]).await;
    assert_eq!(state.current_index, Some(0));
    assert_eq!(state.transport.phase, TransportPhase::Playing);

    h.coordinator.next();
    let state = playing(&h.coordinator, &playlist[1]).await;
    assert_eq!(state.current_index, Some(1));

    h.coordinator.previous();
    let state = playing(&h.coordinator, &playlist[0]).await;
    assert_eq!(state.current_index, Some(0));
}

#[tokio::test(start_paused = true)]
async fn start_index_is_clamped() {
    let h = start();
    let playlist = tracks(3);

    h.coordinator.load_playlist(playlist.clone(), 99);
    let state = playing(&h.coordinator, &playlist[2]).await;
    assert_eq!(state.current_index, Some(2));
    assert_eq!(h.engine.current_item_index().await, Some(2));
}

#[tokio::test(start_paused = true)]
async fn empty_playlist_changes_nothing() {
    let h = start();
    let playlist = tracks(2);
    h.coordinator.load_playlist(playlist.clone(), 1);
    playing(&h.coordinator, &playlist[1]).await;

    h.coordinator.load_playlist(Vec::<Track>::new(), 0);
    let state = settle(&h.coordinator, |s| s.last_error.is_some()).await;

    assert_eq!(state.last_error, Some(PlaybackError::EmptyPlaylist));
    assert_eq!(state.current_track.as_ref(), Some(&playlist[1]));
    assert!(state.is_playing());
    assert_eq!(h.engine.load_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn empty_playlist_on_fresh_coordinator_stays_idle() {
    let h = start();

    h.coordinator.load_playlist(Vec::<Track>::new(), 0);
    let state = settle(&h.coordinator, |s| s.last_error.is_some()).await;

    assert_eq!(state.last_error, Some(PlaybackError::EmptyPlaylist));
    assert_eq!(state.transport.phase, TransportPhase::Idle);
    assert_eq!(state.current_track, None);
    assert!(!h.engine.is_playing().await);
    assert_eq!(h.engine.load_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn single_unresolvable_track_fails() {
    let h = start();

    h.coordinator.load_playlist(vec![unresolvable(1)], 0);
    let state = settle(&h.coordinator, |s| s.last_error.is_some()).await;

    assert!(matches!(
        state.last_error,
        Some(PlaybackError::UnresolvedSource { ref title, .. }) if title == "Broken1"
    ));
    assert_eq!(h.engine.load_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn all_unresolvable_tracks_fail_as_a_whole() {
    let h = start();

    h.coordinator
        .load_playlist(vec![unresolvable(1), unresolvable(2)], 0);
    let state = settle(&h.coordinator, |s| s.last_error.is_some()).await;

    assert_eq!(
        state.last_error,
        Some(PlaybackError::NoPlayableTracks {
            skipped: vec![unresolvable(1), unresolvable(2)]
        })
    );
    assert!(state.playlist.is_empty());
    assert_eq!(h.engine.load_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn partly_unresolvable_playlist_plays_the_rest() {
    let h = start();
    let submitted = vec![track(1), unresolvable(2), track(3)];

    // Starting on the broken track hands over to the next playable one
    h.coordinator.load_playlist(submitted, 1);
    let state = playing(&h.coordinator, &track(3)).await;

    assert_eq!(state.playlist.tracks(), &[track(1), track(3)]);
    assert_eq!(state.current_index, Some(1));
    assert_eq!(state.unplayable, vec![unresolvable(2)]);
    assert_eq!(state.last_error, None);
    assert_eq!(h.engine.items().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn skipped_last_track_starts_at_last_playable() {
    let h = start();

    h.coordinator
        .load_playlist(vec![track(1), track(2), unresolvable(3)], 2);
    let state = playing(&h.coordinator, &track(2)).await;
    assert_eq!(state.current_index, Some(1));
}

#[tokio::test(start_paused = true)]
async fn latest_load_wins() {
    let h = start();
    let first = tracks(3);
    let second = vec![track(7), track(8)];

    h.coordinator.load_playlist(first, 2);
    h.coordinator.load_playlist(second.clone(), 0);
    let state = playing(&h.coordinator, &second[0]).await;

    assert_eq!(state.playlist.tracks(), second.as_slice());
    assert_eq!(state.current_index, Some(0));
    let ids: Vec<String> = h
        .engine
        .items()
        .await
        .iter()
        .map(|item| item.id.to_string())
        .collect();
    assert_eq!(ids, vec!["item-2-0", "item-2-1"]);
}

// ===== Transport =====

#[tokio::test(start_paused = true)]
async fn toggle_twice_restores_playing() {
    let h = start();
    let playlist = tracks(1);
    h.coordinator.load_playlist(playlist.clone(), 0);
    playing(&h.coordinator, &playlist[0]).await;

    h.coordinator.toggle_play_pause();
    let state = settle(&h.coordinator, |s| !s.is_playing()).await;
    assert_eq!(state.transport.phase, TransportPhase::Paused);

    h.coordinator.toggle_play_pause();
    let state = settle(&h.coordinator, |s| s.is_playing()).await;
    assert_eq!(state.transport.phase, TransportPhase::Playing);
}

#[tokio::test(start_paused = true)]
async fn play_at_selects_track_and_ignores_out_of_range() {
    let h = start();
    let playlist = tracks(3);
    h.coordinator.load_playlist(playlist.clone(), 0);
    playing(&h.coordinator, &playlist[0]).await;

    h.coordinator.play_at(2);
    playing(&h.coordinator, &playlist[2]).await;

    h.coordinator.play_at(10);
    h.coordinator.cycle_repeat_mode();
    let state = settle(&h.coordinator, |s| s.transport.repeat_mode == RepeatMode::All).await;
    assert_eq!(state.current_index, Some(2));
    assert_eq!(state.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn play_at_resumes_paused_playback() {
    let h = start();
    let playlist = tracks(2);
    h.coordinator.load_playlist(playlist.clone(), 0);
    playing(&h.coordinator, &playlist[0]).await;

    h.coordinator.pause();
    settle(&h.coordinator, |s| !s.is_playing()).await;

    h.coordinator.play_at(1);
    playing(&h.coordinator, &playlist[1]).await;
}

#[tokio::test(start_paused = true)]
async fn repeat_all_wraps_around() {
    let h = start();
    let playlist = tracks(3);
    h.coordinator.load_playlist(playlist.clone(), 0);
    playing(&h.coordinator, &playlist[0]).await;

    h.coordinator.cycle_repeat_mode();
    settle(&h.coordinator, |s| s.transport.repeat_mode == RepeatMode::All).await;

    for expected in [&playlist[1], &playlist[2], &playlist[0]] {
        h.coordinator.next();
        playing(&h.coordinator, expected).await;
    }

    h.coordinator.previous();
    playing(&h.coordinator, &playlist[2]).await;
}

#[tokio::test(start_paused = true)]
async fn next_at_end_without_repeat_is_a_no_op() {
    let h = start();
    let playlist = tracks(2);
    h.coordinator.load_playlist(playlist.clone(), 1);
    playing(&h.coordinator, &playlist[1]).await;

    h.coordinator.next();
    // Intents run in order, so this marks the point where `next` was handled
    h.coordinator.toggle_shuffle();
    let state = settle(&h.coordinator, |s| s.transport.shuffle_enabled).await;

    assert_eq!(state.current_index, Some(1));
    assert!(state.is_playing());
    assert_eq!(h.engine.current_item_index().await, Some(1));
}

#[tokio::test(start_paused = true)]
async fn repeat_mode_cycles_back_to_off() {
    let h = start();
    h.coordinator.load_playlist(tracks(1), 0);

    for expected in [RepeatMode::All, RepeatMode::One, RepeatMode::Off] {
        h.coordinator.cycle_repeat_mode();
        settle(&h.coordinator, |s| s.transport.repeat_mode == expected).await;
    }
    assert_eq!(h.engine.repeat_mode().await, RepeatMode::Off);
}

#[tokio::test(start_paused = true)]
async fn shuffle_is_mirrored_from_engine() {
    let h = start();
    let playlist = tracks(5);
    h.coordinator.load_playlist(playlist.clone(), 3);
    playing(&h.coordinator, &playlist[3]).await;

    h.coordinator.toggle_shuffle();
    let state = settle(&h.coordinator, |s| s.transport.shuffle_enabled).await;
    assert!(state.is_current(&playlist[3]));
    assert_eq!(h.engine.play_order().await[0], 3);

    h.coordinator.toggle_shuffle();
    settle(&h.coordinator, |s| !s.transport.shuffle_enabled).await;
}

#[tokio::test(start_paused = true)]
async fn seek_is_visible_within_one_poll() {
    let h = start();
    let song = track(1).with_duration_secs(60);
    h.coordinator.load_playlist(vec![song.clone()], 0);
    playing(&h.coordinator, &song).await;

    h.coordinator.seek(Duration::from_secs(20));
    let state = settle(&h.coordinator, |s| {
        s.transport.progress.position >= Duration::from_secs(20)
    })
    .await;
    let position = state.transport.progress.position;
    assert!(position <= Duration::from_millis(20_500), "{:?}", position);
    assert_eq!(state.transport.progress.duration, Duration::from_secs(60));

    h.coordinator.pause();
    h.coordinator.seek(Duration::from_secs(600));
    let state = settle(&h.coordinator, |s| {
        !s.is_playing() && s.transport.progress.position == Duration::from_secs(60)
    })
    .await;
    assert_eq!(state.transport.progress.duration, Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn polling_tracks_elapsed_time() {
    let h = start();
    let song = track(1).with_duration_secs(60);
    h.coordinator.load_playlist(vec![song.clone()], 0);
    playing(&h.coordinator, &song).await;

    tokio::time::sleep(Duration::from_secs(10)).await;
    let position = h.coordinator.state().transport.progress.position;
    assert!(position >= Duration::from_millis(9_500), "{:?}", position);
    assert!(position <= Duration::from_secs(10), "{:?}", position);
}

#[tokio::test(start_paused = true)]
async fn auto_advance_updates_current_track() {
    let h = start();
    let playlist = vec![
        track(1).with_duration_secs(3),
        track(2).with_duration_secs(3),
    ];
    h.coordinator.load_playlist(playlist.clone(), 0);
    playing(&h.coordinator, &playlist[0]).await;

    let state = playing(&h.coordinator, &playlist[1]).await;
    assert_eq!(state.current_index, Some(1));

    // Repeat off: playback halts after the last item
    let state = settle(&h.coordinator, |s| !s.is_playing()).await;
    assert!(state.is_current(&playlist[1]));
    assert_eq!(state.transport.phase, TransportPhase::Paused);
}

// ===== Errors =====

#[tokio::test(start_paused = true)]
async fn fatal_engine_error_returns_to_idle() {
    let h = start();
    let playlist = tracks(2);
    h.coordinator.load_playlist(playlist.clone(), 0);
    playing(&h.coordinator, &playlist[0]).await;

    h.engine.inject_error("decoder failure", true).await;
    let state = settle(&h.coordinator, |s| {
        s.transport.phase == TransportPhase::Idle && !s.is_playing()
    })
    .await;

    assert_eq!(
        state.last_error,
        Some(PlaybackError::EngineRuntime("decoder failure".to_string()))
    );
    assert!(state.playlist.is_empty());
    assert_eq!(state.current_index, None);

    // The coordinator recovers on the next load
    h.coordinator.clear_error();
    h.coordinator.load_playlist(playlist.clone(), 1);
    let state = playing(&h.coordinator, &playlist[1]).await;
    assert_eq!(state.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn recoverable_engine_error_keeps_playing() {
    let h = start();
    let playlist = tracks(1);
    h.coordinator.load_playlist(playlist.clone(), 0);
    playing(&h.coordinator, &playlist[0]).await;

    h.engine.inject_error("network hiccup", false).await;
    let state = settle(&h.coordinator, |s| s.last_error.is_some()).await;

    assert_eq!(
        state.last_error,
        Some(PlaybackError::EngineRuntime("network hiccup".to_string()))
    );
    assert_eq!(state.transport.phase, TransportPhase::Playing);
    assert!(state.is_current(&playlist[0]));

    h.coordinator.clear_error();
    settle(&h.coordinator, |s| s.last_error.is_none()).await;
}

#[tokio::test(start_paused = true)]
async fn failing_engine_command_is_surfaced() {
    let h = start();
    let playlist = tracks(1);
    h.coordinator.load_playlist(playlist.clone(), 0);
    playing(&h.coordinator, &playlist[0]).await;

    h.engine.set_command_failure(Some("boom".to_string())).await;
    h.coordinator.pause();
    let state = settle(&h.coordinator, |s| s.last_error.is_some()).await;

    assert_eq!(
        state.last_error,
        Some(PlaybackError::EngineRuntime("Command failed: boom".to_string()))
    );
    assert!(state.is_playing());
}

// ===== Connection =====

#[tokio::test(start_paused = true)]
async fn connects_on_retry() {
    let h = start_with(|engine| VirtualConnector::new(engine).failing_first(1));
    let playlist = tracks(2);

    h.coordinator.load_playlist(playlist.clone(), 0);
    let state = playing(&h.coordinator, &playlist[0]).await;

    assert_eq!(h.connector.attempts(), 2);
    assert_eq!(state.last_error, None);
}

#[tokio::test(start_paused = true)]
async fn connection_failure_is_sticky() {
    let h = start_with(|engine| VirtualConnector::new(engine).failing_first(2));

    let state = settle(&h.coordinator, |s| s.last_error.is_some()).await;
    assert!(matches!(
        state.last_error,
        Some(PlaybackError::EngineConnection(_))
    ));
    assert_eq!(h.connector.attempts(), 2);

    h.coordinator.clear_error();
    settle(&h.coordinator, |s| s.last_error.is_none()).await;

    h.coordinator.next();
    let state = settle(&h.coordinator, |s| s.last_error.is_some()).await;
    assert!(matches!(
        state.last_error,
        Some(PlaybackError::EngineConnection(_))
    ));

    h.coordinator.clear_error();
    h.coordinator.load_playlist(tracks(2), 0);
    let state = settle(&h.coordinator, |s| s.last_error.is_some()).await;
    assert!(matches!(
        state.last_error,
        Some(PlaybackError::EngineConnection(_))
    ));
    assert!(state.playlist.is_empty());
    assert_eq!(h.engine.load_count().await, 0);
    assert_eq!(h.connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn out_of_range_play_at_is_silent_while_disconnected() {
    let h = start_with(|engine| VirtualConnector::new(engine).failing_first(2));
    settle(&h.coordinator, |s| s.last_error.is_some()).await;
    h.coordinator.clear_error();
    settle(&h.coordinator, |s| s.last_error.is_none()).await;

    // The clock only moves once the coordinator is idle
    h.coordinator.play_at(3);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.coordinator.state().last_error, None);

    // Transport intents still report the missing engine
    h.coordinator.next();
    let state = settle(&h.coordinator, |s| s.last_error.is_some()).await;
    assert!(matches!(
        state.last_error,
        Some(PlaybackError::EngineConnection(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn intents_before_connection_run_in_order() {
    let h = start_with(|engine| {
        VirtualConnector::new(engine).with_connect_delay(Duration::from_secs(2))
    });
    let playlist = tracks(3);

    h.coordinator.load_playlist(playlist.clone(), 0);
    h.coordinator.next();
    h.coordinator.next();

    let state = playing(&h.coordinator, &playlist[2]).await;
    assert_eq!(state.current_index, Some(2));
}

// ===== Teardown =====

#[tokio::test(start_paused = true)]
async fn shutdown_releases_engine_and_stops_polling() {
    let h = start();
    let playlist = tracks(1);
    h.coordinator.load_playlist(playlist.clone(), 0);
    playing(&h.coordinator, &playlist[0]).await;
    assert_eq!(h.engine.subscriber_count().await, 1);

    h.coordinator.shutdown().await;

    assert!(h.coordinator.is_closed());
    assert!(h.engine.is_released().await);
    assert_eq!(h.engine.subscriber_count().await, 0);

    let reads = h.engine.progress_reads().await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.engine.progress_reads().await, reads);

    // Intents after shutdown are dropped quietly
    h.coordinator.next();
}

#[tokio::test(start_paused = true)]
async fn dropping_last_handle_tears_down() {
    let h = start();
    let observer = h.coordinator.subscribe();
    let extra = h.coordinator.clone();
    h.coordinator.load_playlist(tracks(1), 0);

    drop(h.coordinator);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!h.engine.is_released().await);

    drop(extra);
    let mut observer = observer;
    tokio::time::timeout(Duration::from_secs(5), async {
        while observer.changed().await.is_ok() {}
    })
    .await
    .expect("coordinator did not stop");
    assert!(h.engine.is_released().await);
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_connection() {
    let h = start_with(|engine| {
        VirtualConnector::new(engine).with_connect_delay(Duration::from_secs(30))
    });

    tokio::time::timeout(Duration::from_secs(5), h.coordinator.shutdown())
        .await
        .expect("shutdown hung while connecting");
    assert!(!h.engine.is_released().await);
    assert!(h.connector.attempts() <= 1);
}
