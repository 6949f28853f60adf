//! Orchestrator state machine types

use serde::Serialize;
use tilawah_common::events::EngineStatus;
use tilawah_common::VerseRef;

/// What the device plays: the opening formula of a surah or one verse,
/// with the concrete URL for the selected reciter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackUnit {
    OpeningFormula { surah_number: u16, url: String },
    Verse { verse: VerseRef, url: String },
}

impl PlaybackUnit {
    pub fn url(&self) -> &str {
        match self {
            PlaybackUnit::OpeningFormula { url, .. } | PlaybackUnit::Verse { url, .. } => url,
        }
    }

    pub fn surah_number(&self) -> u16 {
        match self {
            PlaybackUnit::OpeningFormula { surah_number, .. } => *surah_number,
            PlaybackUnit::Verse { verse, .. } => verse.surah_number(),
        }
    }

    /// The verse, or `None` for the opening formula
    pub fn verse(&self) -> Option<VerseRef> {
        match self {
            PlaybackUnit::OpeningFormula { .. } => None,
            PlaybackUnit::Verse { verse, .. } => Some(*verse),
        }
    }

    pub fn is_opening_formula(&self) -> bool {
        matches!(self, PlaybackUnit::OpeningFormula { .. })
    }
}

impl std::fmt::Display for PlaybackUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackUnit::OpeningFormula { surah_number, .. } => {
                write!(f, "opening formula of surah {}", surah_number)
            }
            PlaybackUnit::Verse { verse, .. } => write!(f, "verse {}", verse),
        }
    }
}

/// Why a surah load was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadReason {
    /// Direct `play_verse`
    PlayVerse,
    /// First item of a page queue
    PlayPage,
    /// Next unit in the active queue (same surah list or next page item)
    Advance,
    /// Continuous play moved on to another surah
    SurahTransition,
    /// `previous()` stepped back into another surah
    StepBack,
    /// Missing clip skipped into a surah not yet loaded
    Skip,
}

/// The verse a pending load is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadTarget {
    pub verse: VerseRef,
    pub reason: LoadReason,
}

/// Exactly one per session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OrchestratorState {
    #[default]
    Idle,
    Loading(LoadTarget),
    Playing(PlaybackUnit),
    /// `then` holds the verse due after a paused opening formula
    Paused {
        unit: PlaybackUnit,
        then: Option<PlaybackUnit>,
    },
    PlayingOpeningFormula {
        formula: PlaybackUnit,
        then: PlaybackUnit,
    },
}

impl OrchestratorState {
    pub fn status(&self) -> EngineStatus {
        match self {
            OrchestratorState::Idle => EngineStatus::Idle,
            OrchestratorState::Loading(_) => EngineStatus::Loading,
            OrchestratorState::Playing(_) => EngineStatus::Playing,
            OrchestratorState::Paused { .. } => EngineStatus::Paused,
            OrchestratorState::PlayingOpeningFormula { .. } => EngineStatus::PlayingOpeningFormula,
        }
    }

    /// Unit loaded in the device, if any
    pub fn current_unit(&self) -> Option<&PlaybackUnit> {
        match self {
            OrchestratorState::Idle | OrchestratorState::Loading(_) => None,
            OrchestratorState::Playing(unit) => Some(unit),
            OrchestratorState::Paused { unit, .. } => Some(unit),
            OrchestratorState::PlayingOpeningFormula { formula, .. } => Some(formula),
        }
    }

    /// Verse the session is positioned on.
    ///
    /// While the opening formula sounds (or is paused) this is the verse
    /// that follows it; while loading it is the load target.
    pub fn current_verse(&self) -> Option<VerseRef> {
        match self {
            OrchestratorState::Idle => None,
            OrchestratorState::Loading(target) => Some(target.verse),
            OrchestratorState::Playing(unit) => unit.verse(),
            OrchestratorState::Paused { unit, then } => {
                unit.verse().or_else(|| then.as_ref().and_then(PlaybackUnit::verse))
            }
            OrchestratorState::PlayingOpeningFormula { then, .. } => then.verse(),
        }
    }

    /// Verse due after the opening formula, if one is pending
    pub fn pending_then(&self) -> Option<&PlaybackUnit> {
        match self {
            OrchestratorState::PlayingOpeningFormula { then, .. } => Some(then),
            OrchestratorState::Paused { then, .. } => then.as_ref(),
            _ => None,
        }
    }
}
