//! Scripture geometry
//!
//! Surah numbering, verse counts and the `VerseRef` identity used everywhere
//! a verse is addressed. Every verse shape coming from outside the crate is
//! normalized into a `VerseRef` through the constructors here.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// First surah number
pub const FIRST_SURAH: u16 = 1;

/// Last surah number
pub const LAST_SURAH: u16 = 114;

/// Total number of verses in the scripture
pub const TOTAL_VERSES: u16 = 6236;

/// Number of verses in each surah, indexed by `surah_number - 1`
const VERSE_COUNTS: [u16; LAST_SURAH as usize] = [
    7, 286, 200, 176, 120, 165, 206, 75, 129, 109, 123, 111, 43, 52, 99, 128, 111, 110, 98, 135,
    112, 78, 118, 64, 77, 227, 93, 88, 69, 60, 34, 30, 73, 54, 45, 83, 182, 88, 75, 85, 54, 53, 89,
    59, 37, 35, 38, 29, 18, 45, 60, 49, 62, 55, 78, 96, 29, 22, 24, 13, 14, 11, 11, 18, 12, 12, 30,
    52, 52, 44, 28, 28, 20, 56, 40, 31, 50, 40, 46, 42, 29, 19, 36, 25, 22, 17, 19, 26, 30, 20, 15,
    21, 11, 8, 8, 19, 5, 8, 8, 11, 11, 8, 3, 9, 5, 4, 7, 3, 6, 3, 5, 4, 5, 6,
];

/// Returns true if `surah_number` is in `1..=114`
pub fn is_valid_surah(surah_number: u16) -> bool {
    (FIRST_SURAH..=LAST_SURAH).contains(&surah_number)
}

/// Number of verses in a surah, or `None` for an out-of-range surah number
pub fn verse_count(surah_number: u16) -> Option<u16> {
    if !is_valid_surah(surah_number) {
        return None;
    }
    Some(VERSE_COUNTS[(surah_number - 1) as usize])
}

/// Whether a surah is preceded by the opening formula.
///
/// Every surah carries it except the first (where it is the first verse
/// itself) and the ninth.
pub fn has_opening_formula(surah_number: u16) -> bool {
    is_valid_surah(surah_number) && surah_number != 1 && surah_number != 9
}

/// Global number of the verse preceding the first verse of `surah_number`
fn global_offset(surah_number: u16) -> u16 {
    VERSE_COUNTS[..(surah_number - 1) as usize].iter().sum()
}

/// Identifies one verse uniquely within the whole scripture.
///
/// Immutable once created; build it with [`VerseRef::new`] or
/// [`VerseRef::from_global`], which validate against the verse-count table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VerseRef {
    surah_number: u16,
    verse_in_surah: u16,
    verse_global: u16,
}

impl VerseRef {
    /// Builds a reference from a surah number and a position inside that surah
    pub fn new(surah_number: u16, verse_in_surah: u16) -> Result<Self> {
        let count = verse_count(surah_number).ok_or_else(|| {
            Error::InvalidInput(format!("surah number {} out of range", surah_number))
        })?;

        if verse_in_surah == 0 || verse_in_surah > count {
            return Err(Error::InvalidInput(format!(
                "surah {} has {} verses, got verse {}",
                surah_number, count, verse_in_surah
            )));
        }

        Ok(Self {
            surah_number,
            verse_in_surah,
            verse_global: global_offset(surah_number) + verse_in_surah,
        })
    }

    /// Builds a reference from a global verse number (`1..=6236`)
    pub fn from_global(verse_global: u16) -> Result<Self> {
        if verse_global == 0 || verse_global > TOTAL_VERSES {
            return Err(Error::InvalidInput(format!(
                "global verse number {} out of range",
                verse_global
            )));
        }

        let mut remaining = verse_global;
        for (index, count) in VERSE_COUNTS.iter().enumerate() {
            if remaining <= *count {
                return Self::new(index as u16 + 1, remaining);
            }
            remaining -= count;
        }

        Err(Error::Internal(format!(
            "verse count table does not cover global verse {}",
            verse_global
        )))
    }

    /// First verse of a surah
    pub fn first_of(surah_number: u16) -> Result<Self> {
        Self::new(surah_number, 1)
    }

    /// Last verse of a surah
    pub fn last_of(surah_number: u16) -> Result<Self> {
        let count = verse_count(surah_number).ok_or_else(|| {
            Error::InvalidInput(format!("surah number {} out of range", surah_number))
        })?;
        Self::new(surah_number, count)
    }

    pub fn surah_number(&self) -> u16 {
        self.surah_number
    }

    pub fn verse_in_surah(&self) -> u16 {
        self.verse_in_surah
    }

    pub fn verse_global(&self) -> u16 {
        self.verse_global
    }

    /// True for the first verse of its surah
    pub fn is_first_in_surah(&self) -> bool {
        self.verse_in_surah == 1
    }

    /// True for the last verse of its surah
    pub fn is_last_in_surah(&self) -> bool {
        verse_count(self.surah_number) == Some(self.verse_in_surah)
    }
}

impl std::fmt::Display for VerseRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.surah_number, self.verse_in_surah)
    }
}

/// One entry of a page queue as supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageItem {
    pub surah_number: u16,
    pub verse_in_surah: u16,
}

impl PageItem {
    pub fn new(surah_number: u16, verse_in_surah: u16) -> Self {
        Self {
            surah_number,
            verse_in_surah,
        }
    }

    /// Validates the item against the verse-count table
    pub fn verse_ref(&self) -> Result<VerseRef> {
        VerseRef::new(self.surah_number, self.verse_in_surah)
    }
}

impl std::str::FromStr for PageItem {
    type Err = Error;

    /// Parses `"surah:verse"`, e.g. `"2:255"`
    fn from_str(s: &str) -> Result<Self> {
        let (surah, verse) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("expected surah:verse, got '{}'", s)))?;

        let surah_number = surah
            .parse::<u16>()
            .map_err(|e| Error::InvalidInput(format!("invalid surah '{}': {}", surah, e)))?;
        let verse_in_surah = verse
            .parse::<u16>()
            .map_err(|e| Error::InvalidInput(format!("invalid verse '{}': {}", verse, e)))?;

        let item = PageItem::new(surah_number, verse_in_surah);
        item.verse_ref()?;
        Ok(item)
    }
}
