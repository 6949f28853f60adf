//! Test helpers for tilawah-ap integration tests
//!
//! Provides reusable test infrastructure components:
//! - FakeProvider: in-memory surah data with gated, failing and counted fetches
//! - RecordingOutput: output device that records calls and finishes clips on demand
//! - Harness: an engine wired to both, plus polling helpers

#![allow(dead_code)]

pub mod fake_provider;
pub mod recording_output;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tilawah_ap::events::{EngineStatus, RecitationEvent};
use tilawah_ap::{EngineOptions, PlaybackEngine};
use tilawah_common::{PlaybackPolicy, PolicyStore, VerseRef};
use tokio::sync::broadcast;
use tokio::time::Instant;

pub use fake_provider::{formula_url, verse_url, FakeProvider};
pub use recording_output::{OutputLog, RecordingOutput};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine wired to a fake provider and a recording device
pub struct Harness {
    pub engine: PlaybackEngine,
    pub provider: Arc<FakeProvider>,
    pub output: OutputLog,
    pub events: broadcast::Receiver<RecitationEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(PlaybackPolicy::default())
    }

    pub fn continuous() -> Self {
        Self::with_policy(PlaybackPolicy {
            continuous_play: true,
            ..PlaybackPolicy::default()
        })
    }

    pub fn with_policy(policy: PlaybackPolicy) -> Self {
        Self::with_provider(Arc::new(FakeProvider::new()), policy)
    }

    /// Configure the provider before any fetch happens
    pub fn with_provider(provider: Arc<FakeProvider>, policy: PlaybackPolicy) -> Self {
        let (output, log) = RecordingOutput::new();
        let engine = PlaybackEngine::new(
            provider.clone(),
            Box::new(output),
            PolicyStore::new(policy).unwrap(),
            EngineOptions {
                event_capacity: 1024,
                rng_seed: Some(7),
                ..EngineOptions::default()
            },
        )
        .unwrap();
        let events = engine.subscribe_events();

        Self {
            engine,
            provider,
            output: log,
            events,
        }
    }

    pub async fn status(&self) -> EngineStatus {
        self.engine.state().get_status().await
    }

    pub async fn current_verse(&self) -> Option<VerseRef> {
        self.engine.state().get_current_verse().await
    }

    pub async fn wait_for_status(&self, status: EngineStatus) {
        let state = self.engine.state();
        wait_until(&format!("status {}", status), || {
            let state = state.clone();
            async move { state.get_status().await == status }
        })
        .await;
    }

    /// Wait until `surah:verse` is the current verse in the given status
    pub async fn wait_for_verse(&self, surah: u16, verse: u16, status: EngineStatus) {
        let target = VerseRef::new(surah, verse).unwrap();
        let state = self.engine.state();
        wait_until(&format!("{} while {}", target, status), || {
            let state = state.clone();
            async move {
                state.get_status().await == status
                    && state.get_current_verse().await == Some(target)
            }
        })
        .await;
    }

    /// Finish the current clip and wait for the device to load another one
    /// (or for the session to go idle)
    pub async fn finish_clip(&self) {
        let before = self.output.sources().len();
        self.output.finish();
        let output = self.output.clone();
        let state = self.engine.state();
        wait_until("clip to advance", || {
            let output = output.clone();
            let state = state.clone();
            async move {
                output.sources().len() > before || state.get_status().await == EngineStatus::Idle
            }
        })
        .await;
    }

    /// Next buffered event matching `predicate`, skipping the others
    pub async fn next_event<F>(&mut self, what: &str, mut predicate: F) -> RecitationEvent
    where
        F: FnMut(&RecitationEvent) -> bool,
    {
        let deadline = Instant::now() + WAIT_TIMEOUT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.events.recv()).await {
                Ok(Ok(event)) if predicate(&event) => return event,
                Ok(Ok(_)) => continue,
                Ok(Err(e)) => panic!("event stream failed while waiting for {}: {}", what, e),
                Err(_) => panic!("timed out waiting for {}", what),
            }
        }
    }

    /// Drain the buffered events
    pub fn drain_events(&mut self) -> Vec<RecitationEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// Poll `check` until it holds, panicking after a timeout
pub async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + WAIT_TIMEOUT;
    loop {
        if check().await {
            return;
        }
        if Instant::now() >= deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Let the engine drain its inboxes
pub async fn settle_briefly() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

pub fn verse(surah: u16, verse: u16) -> VerseRef {
    VerseRef::new(surah, verse).unwrap()
}
