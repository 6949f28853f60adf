//! Per-surah audio bundle
//!
//! `SurahAudioData` is what the surah data provider returns and what the
//! playback cache stores. The shape does not depend on the reciter: every
//! verse carries the URLs of all reciters, so one bundle serves any
//! reciter selection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::verse::{has_opening_formula, VerseRef};

/// Map from reciter id to audio URL
pub type ReciterClips = HashMap<String, String>;

/// Audio clips for one verse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerseAudio {
    pub verse: VerseRef,
    pub clips: ReciterClips,
}

impl VerseAudio {
    pub fn new(verse: VerseRef, clips: ReciterClips) -> Self {
        Self { verse, clips }
    }

    /// URL of this verse for a reciter, if that reciter recorded it
    pub fn clip_url(&self, reciter_id: &str) -> Option<&str> {
        self.clips.get(reciter_id).map(String::as_str)
    }
}

/// All audio needed to play one surah
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurahAudioData {
    pub surah_number: u16,
    /// Display name (transliterated)
    pub name: String,
    /// Verses in order, `verses[i].verse.verse_in_surah() == i + 1`
    pub verses: Vec<VerseAudio>,
    /// Opening formula clip; always `None` for surahs 1 and 9
    pub opening_formula: Option<ReciterClips>,
}

impl SurahAudioData {
    /// Builds a bundle, sorting verses by position and dropping an opening
    /// formula attached to a surah that never carries one.
    pub fn new(
        surah_number: u16,
        name: impl Into<String>,
        mut verses: Vec<VerseAudio>,
        opening_formula: Option<ReciterClips>,
    ) -> Self {
        verses.sort_by_key(|v| v.verse.verse_in_surah());
        verses.dedup_by_key(|v| v.verse.verse_in_surah());

        let opening_formula = opening_formula
            .filter(|clips| has_opening_formula(surah_number) && !clips.is_empty());

        Self {
            surah_number,
            name: name.into(),
            verses,
            opening_formula,
        }
    }

    pub fn verse_count(&self) -> usize {
        self.verses.len()
    }

    /// Verse by 1-based position in the surah
    pub fn verse(&self, verse_in_surah: u16) -> Option<&VerseAudio> {
        self.verses
            .iter()
            .find(|v| v.verse.verse_in_surah() == verse_in_surah)
    }

    /// Index into `verses` of a 1-based verse position
    pub fn index_of(&self, verse_in_surah: u16) -> Option<usize> {
        self.verses
            .iter()
            .position(|v| v.verse.verse_in_surah() == verse_in_surah)
    }

    /// URL of a verse for a reciter
    pub fn clip_url(&self, verse_in_surah: u16, reciter_id: &str) -> Option<&str> {
        self.verse(verse_in_surah)?.clip_url(reciter_id)
    }

    /// URL of the opening formula for a reciter
    pub fn opening_formula_url(&self, reciter_id: &str) -> Option<&str> {
        self.opening_formula
            .as_ref()?
            .get(reciter_id)
            .map(String::as_str)
    }
}
