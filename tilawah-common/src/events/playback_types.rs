//! Playback-related type definitions
//!
//! Supporting types for engine status and failure reporting.

use serde::{Deserialize, Serialize};

/// Coarse orchestrator status as seen by observers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    /// Nothing loaded, no queue
    Idle,
    /// Waiting for surah data
    Loading,
    /// A verse is sounding
    Playing,
    /// User paused the current unit
    Paused,
    /// The opening formula is sounding before a surah's first verse
    PlayingOpeningFormula,
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineStatus::Idle => write!(f, "idle"),
            EngineStatus::Loading => write!(f, "loading"),
            EngineStatus::Playing => write!(f, "playing"),
            EngineStatus::Paused => write!(f, "paused"),
            EngineStatus::PlayingOpeningFormula => write!(f, "playing_opening_formula"),
        }
    }
}

/// Category of a playback failure
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Surah data could not be fetched
    Fetch,
    /// The audio output device rejected a command
    AudioOutput,
    /// Reciter id not in the registry
    UnknownReciter,
    /// Caller supplied an invalid verse or page
    InvalidInput,
    /// Requested verse has no playable clip
    NotFound,
    /// Anything else
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Fetch => write!(f, "fetch"),
            FailureKind::AudioOutput => write!(f, "audio_output"),
            FailureKind::UnknownReciter => write!(f, "unknown_reciter"),
            FailureKind::InvalidInput => write!(f, "invalid_input"),
            FailureKind::NotFound => write!(f, "not_found"),
            FailureKind::Internal => write!(f, "internal"),
        }
    }
}
