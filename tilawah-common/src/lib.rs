//! # Tilawah Common Library
//!
//! Shared code for the tilawah recitation player:
//! - Scripture geometry (surah verse counts, `VerseRef`)
//! - Per-surah audio bundles (`SurahAudioData`)
//! - Playback policy and the preferences handle (`PolicyStore`)
//! - Event types (`RecitationEvent`) and the `EventBus`
//! - Configuration file resolution
//! - Utility functions

pub mod config;
pub mod error;
pub mod events;
pub mod policy;
pub mod surah;
pub mod time;
pub mod verse;

pub use error::{Error, Result};
pub use policy::{PlaybackPolicy, PolicyStore};
pub use surah::{ReciterClips, SurahAudioData, VerseAudio};
pub use verse::{PageItem, VerseRef};
