//! Shared playback state
//!
//! Read-only view of the session for callers and UI. Only the engine task
//! writes it, and it does so before replying to the command that caused the
//! change, so a caller that awaited a command always observes its effect.

use std::sync::Arc;

use tilawah_common::events::{EngineStatus, EventBus, RecitationEvent};
use tilawah_common::{SurahAudioData, VerseRef};
use tokio::sync::{broadcast, RwLock};

use crate::playback::state::OrchestratorState;

/// Device clock as last reported
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackPosition {
    /// Seconds from the start of the current clip
    pub current_time: f64,
    /// Clip length in seconds, once the device reported it
    pub duration: Option<f64>,
}

/// Shared state accessible by all components
///
/// Uses RwLock for concurrent read access with rare writes
pub struct SharedState {
    /// Orchestrator state machine
    pub orchestrator: RwLock<OrchestratorState>,

    /// Data of the surah the current unit belongs to
    pub current_surah: RwLock<Option<Arc<SurahAudioData>>>,

    /// Current device position
    pub position: RwLock<PlaybackPosition>,

    /// Event broadcaster for observers
    events: EventBus,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new(event_capacity: usize) -> Self {
        Self {
            orchestrator: RwLock::new(OrchestratorState::Idle),
            current_surah: RwLock::new(None),
            position: RwLock::new(PlaybackPosition::default()),
            events: EventBus::new(event_capacity),
        }
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast_event(&self, event: RecitationEvent) {
        // No subscribers is fine
        self.events.emit_lossy(event);
    }

    /// Subscribe to the event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<RecitationEvent> {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> OrchestratorState {
        self.orchestrator.read().await.clone()
    }

    pub async fn set_state(&self, state: OrchestratorState) {
        *self.orchestrator.write().await = state;
    }

    pub async fn get_status(&self) -> EngineStatus {
        self.orchestrator.read().await.status()
    }

    /// Verse the session is positioned on
    pub async fn get_current_verse(&self) -> Option<VerseRef> {
        self.orchestrator.read().await.current_verse()
    }

    pub async fn get_current_surah(&self) -> Option<Arc<SurahAudioData>> {
        self.current_surah.read().await.clone()
    }

    pub async fn set_current_surah(&self, surah: Option<Arc<SurahAudioData>>) {
        *self.current_surah.write().await = surah;
    }

    pub async fn get_position(&self) -> PlaybackPosition {
        *self.position.read().await
    }

    pub async fn set_current_time(&self, current_time: f64) {
        self.position.write().await.current_time = current_time;
    }

    pub async fn set_duration(&self, duration: Option<f64>) {
        self.position.write().await.duration = duration;
    }

    /// Reset the clock for a newly loaded source
    pub async fn reset_position(&self) {
        *self.position.write().await = PlaybackPosition::default();
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EVENT_CAPACITY)
    }
}
