//! Events describe state that is already visible
//!
//! Observers run on other worker threads and read `state()` as soon as an
//! event arrives; they must never see the state from before the transition.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{verse, FakeProvider, Harness};
use tilawah_ap::events::{EngineStatus, RecitationEvent};
use tilawah_common::PlaybackPolicy;
use tokio::sync::mpsc;

const ACK_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unit_started_follows_committed_state() {
    let h = Harness::new();
    let mut events = h.engine.subscribe_events();
    let state = h.engine.state();
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

    let observer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let RecitationEvent::UnitStarted {
                verse: Some(announced),
                ..
            } = event
            {
                let committed = state.get_current_verse().await;
                let status = state.get_status().await;
                if seen_tx.send((announced, committed, status)).is_err() {
                    return;
                }
            }
        }
    });

    for n in 1..=120 {
        h.engine.play_verse(2, n).await.unwrap();
        let (announced, committed, status) = tokio::time::timeout(ACK_TIMEOUT, seen_rx.recv())
            .await
            .expect("observer should report UnitStarted")
            .expect("observer stopped early");

        assert_eq!(announced, verse(2, n));
        assert_eq!(committed, Some(announced), "state lagged UnitStarted for 2:{}", n);
        assert_eq!(status, EngineStatus::Playing);
    }

    observer.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_surah_loaded_follows_settled_state() {
    let provider = Arc::new(FakeProvider::new());
    provider.hold(36);
    let mut h = Harness::with_provider(provider, PlaybackPolicy::default());

    let engine = h.engine.clone();
    let play = tokio::spawn(async move { engine.play_verse(36, 3).await });
    h.wait_for_status(EngineStatus::Loading).await;

    h.provider.release(36);
    h.next_event("surah loaded", |e| {
        matches!(e, RecitationEvent::SurahLoaded { .. })
    })
    .await;

    // No polling: the transition completed before the event went out
    assert_eq!(h.status().await, EngineStatus::Playing);
    assert_eq!(h.current_verse().await, Some(verse(36, 3)));
    play.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queue_exhausted_seen_while_idle() {
    let mut h = Harness::new();
    h.engine.play_verse(112, 4).await.unwrap();

    h.output.finish();
    h.next_event("queue exhausted", |e| {
        matches!(e, RecitationEvent::QueueExhausted { .. })
    })
    .await;

    assert_eq!(h.status().await, EngineStatus::Idle);
    assert!(h.current_verse().await.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fetch_failure_seen_while_idle() {
    let provider = Arc::new(FakeProvider::new());
    provider.hold(7);
    provider.fail(7);
    let mut h = Harness::with_provider(provider, PlaybackPolicy::default());

    let engine = h.engine.clone();
    let play = tokio::spawn(async move { engine.play_verse(7, 1).await });
    h.wait_for_status(EngineStatus::Loading).await;

    h.provider.release(7);
    h.next_event("failure", |e| {
        matches!(e, RecitationEvent::PlaybackFailed { .. })
    })
    .await;

    assert_eq!(h.status().await, EngineStatus::Idle);
    assert!(play.await.unwrap().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reciter_changed_follows_reload() {
    let mut h = Harness::new();
    h.engine.play_verse(2, 1).await.unwrap();

    // Edited outside the engine so no command reply orders the check
    h.engine.policy().set_reciter("minshawi").unwrap();
    h.next_event("reciter changed", |e| {
        matches!(e, RecitationEvent::ReciterChanged { .. })
    })
    .await;

    let state = h.engine.state().get_state().await;
    let unit = state.current_unit().expect("a unit stays loaded");
    assert_eq!(unit.url(), helpers::verse_url("minshawi", 2, 1));
}
