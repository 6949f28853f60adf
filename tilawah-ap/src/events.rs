//! Event system for the tilawah-ap player
//!
//! # Architecture
//!
//! The player uses hybrid communication:
//! - **EventBus** (tokio::broadcast): One-to-many event broadcasting
//! - **Command channel** (tokio::mpsc + oneshot replies): caller → orchestrator
//! - **Device channel** (tokio::mpsc): audio output → orchestrator
//! - **Shared state** (Arc<RwLock<T>>): Read-heavy access
//!
//! This module re-exports the shared event types from tilawah-common.

pub use tilawah_common::events::{EngineStatus, EventBus, FailureKind, RecitationEvent};

/// One-line rendering of an event for logs and the command-line player
pub fn describe(event: &RecitationEvent) -> String {
    match event {
        RecitationEvent::StateChanged {
            old_state,
            new_state,
            ..
        } => format!("state {} -> {}", old_state, new_state),
        RecitationEvent::UnitStarted {
            surah_number,
            verse: Some(verse),
            ..
        } if *surah_number == verse.surah_number() => format!("verse {}", verse),
        RecitationEvent::UnitStarted { surah_number, .. } => {
            format!("opening formula of surah {}", surah_number)
        }
        RecitationEvent::SurahLoaded {
            surah_number,
            verse_count,
            ..
        } => format!("surah {} loaded ({} verses)", surah_number, verse_count),
        RecitationEvent::ClipSkipped {
            verse, reciter_id, ..
        } => format!("skipped {} (no clip for {})", verse, reciter_id),
        RecitationEvent::QueueExhausted { surah_number, .. } => {
            format!("queue exhausted after surah {}", surah_number)
        }
        RecitationEvent::ReciterChanged { old, new, .. } => {
            format!("reciter {} -> {}", old, new)
        }
        RecitationEvent::PlaybackProgress {
            current_time,
            duration,
            ..
        } => match duration {
            Some(duration) => format!(
                "{} / {}",
                tilawah_common::time::format_position(*current_time),
                tilawah_common::time::format_position(*duration)
            ),
            None => tilawah_common::time::format_position(*current_time),
        },
        RecitationEvent::PlaybackFailed { kind, message, .. } => {
            format!("failed ({}): {}", kind, message)
        }
    }
}
