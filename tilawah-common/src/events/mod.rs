//! Event types for the recitation event system
//!
//! Provides the shared event definitions and the EventBus observers subscribe to.

mod playback_types;

pub use playback_types::{EngineStatus, FailureKind};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::verse::VerseRef;

/// Recitation event types
///
/// Events are broadcast via EventBus. Every failure, whether raised by a
/// caller's command or by automatic advancement, is published as
/// `PlaybackFailed`.
///
/// An event goes out only after the transition it reports is visible in the
/// engine's state view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecitationEvent {
    /// Orchestrator status changed
    StateChanged {
        old_state: EngineStatus,
        new_state: EngineStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A clip was committed to the device (started, or cued while paused)
    UnitStarted {
        surah_number: u16,
        /// `None` while the opening formula plays
        verse: Option<VerseRef>,
        opening_formula: bool,
        url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Surah data arrived and the pending transition has settled
    SurahLoaded {
        surah_number: u16,
        verse_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A verse was skipped because the reciter has no clip for it
    ClipSkipped {
        verse: VerseRef,
        reciter_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue ran out (last verse without continuous play, last surah, end of page)
    QueueExhausted {
        /// Surah of the last unit considered
        surah_number: u16,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Selected reciter changed
    ReciterChanged {
        old: String,
        new: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Device position update
    ///
    /// Lossy: emitted at the device's time-update cadence.
    PlaybackProgress {
        current_time: f64,
        duration: Option<f64>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A transition failed
    PlaybackFailed {
        kind: FailureKind,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl RecitationEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            RecitationEvent::StateChanged { .. } => "StateChanged",
            RecitationEvent::UnitStarted { .. } => "UnitStarted",
            RecitationEvent::SurahLoaded { .. } => "SurahLoaded",
            RecitationEvent::ClipSkipped { .. } => "ClipSkipped",
            RecitationEvent::QueueExhausted { .. } => "QueueExhausted",
            RecitationEvent::ReciterChanged { .. } => "ReciterChanged",
            RecitationEvent::PlaybackProgress { .. } => "PlaybackProgress",
            RecitationEvent::PlaybackFailed { .. } => "PlaybackFailed",
        }
    }
}

/// Central event distribution bus
///
/// Wraps a `tokio::sync::broadcast` channel. Slow subscribers lag and lose
/// the oldest events rather than blocking the engine.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<RecitationEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use tilawah_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(256);
    /// assert_eq!(event_bus.capacity(), 256);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<RecitationEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RecitationEvent,
    ) -> Result<usize, broadcast::error::SendError<RecitationEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RecitationEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
