//! Playback queue
//!
//! "What should play, in order." One abstraction with two flavors:
//!
//! - **Sequential**: every verse of one surah. Crossing into another surah
//!   is decided by the engine through [`choose_next_surah`] and replaces the
//!   queue with the new surah's verses.
//! - **Explicit**: a caller-supplied list (one printed page), possibly
//!   spanning several surahs. Stepping never leaves the list.
//!
//! Queue positions are pure geometry; whether a verse actually has a clip
//! for the selected reciter is decided later by the resolver.

use rand::Rng;
use serde::Serialize;
use tilawah_common::verse::{verse_count, FIRST_SURAH, LAST_SURAH};
use tilawah_common::{PlaybackPolicy, VerseRef};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlaybackQueue {
    Sequential {
        surah_number: u16,
        verses: Vec<VerseRef>,
        cursor: usize,
    },
    Explicit {
        items: Vec<VerseRef>,
        cursor: usize,
    },
}

fn surah_verses(surah_number: u16) -> Result<Vec<VerseRef>> {
    let count = verse_count(surah_number)
        .ok_or_else(|| Error::InvalidInput(format!("surah number {} out of range", surah_number)))?;
    Ok((1..=count)
        .filter_map(|v| VerseRef::new(surah_number, v).ok())
        .collect())
}

impl PlaybackQueue {
    /// Sequential queue over a whole surah, positioned on `verse`
    pub fn sequential_at(verse: VerseRef) -> Result<Self> {
        let verses = surah_verses(verse.surah_number())?;
        let cursor = (verse.verse_in_surah() - 1) as usize;
        Ok(PlaybackQueue::Sequential {
            surah_number: verse.surah_number(),
            verses,
            cursor,
        })
    }

    /// Sequential queue positioned on the first verse of a surah
    pub fn sequential_start(surah_number: u16) -> Result<Self> {
        Self::sequential_at(VerseRef::first_of(surah_number)?)
    }

    /// Sequential queue positioned on the last verse of a surah
    pub fn sequential_end(surah_number: u16) -> Result<Self> {
        Self::sequential_at(VerseRef::last_of(surah_number)?)
    }

    /// Explicit queue positioned on its first item
    pub fn explicit(items: Vec<VerseRef>) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::InvalidInput("page queue is empty".to_string()));
        }
        Ok(PlaybackQueue::Explicit { items, cursor: 0 })
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, PlaybackQueue::Explicit { .. })
    }

    fn entries(&self) -> &[VerseRef] {
        match self {
            PlaybackQueue::Sequential { verses, .. } => verses,
            PlaybackQueue::Explicit { items, .. } => items,
        }
    }

    pub fn cursor(&self) -> usize {
        match self {
            PlaybackQueue::Sequential { cursor, .. } | PlaybackQueue::Explicit { cursor, .. } => {
                *cursor
            }
        }
    }

    fn cursor_mut(&mut self) -> &mut usize {
        match self {
            PlaybackQueue::Sequential { cursor, .. } | PlaybackQueue::Explicit { cursor, .. } => {
                cursor
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Verse under the cursor
    pub fn current(&self) -> Option<VerseRef> {
        self.entries().get(self.cursor()).copied()
    }

    /// Surah of a sequential queue
    pub fn surah_number(&self) -> Option<u16> {
        match self {
            PlaybackQueue::Sequential { surah_number, .. } => Some(*surah_number),
            PlaybackQueue::Explicit { .. } => None,
        }
    }

    /// Nothing lies before the cursor: the first explicit item, or 1:1
    pub fn at_front(&self) -> bool {
        match self {
            PlaybackQueue::Sequential {
                surah_number,
                cursor,
                ..
            } => *surah_number == FIRST_SURAH && *cursor == 0,
            PlaybackQueue::Explicit { cursor, .. } => *cursor == 0,
        }
    }

    /// Move the cursor one entry forward within the list
    pub fn step_forward(&mut self) -> Option<VerseRef> {
        let next = self.cursor() + 1;
        let verse = self.entries().get(next).copied()?;
        *self.cursor_mut() = next;
        Some(verse)
    }

    /// Move the cursor one entry back within the list
    pub fn step_back(&mut self) -> Option<VerseRef> {
        let previous = self.cursor().checked_sub(1)?;
        let verse = self.entries().get(previous).copied()?;
        *self.cursor_mut() = previous;
        Some(verse)
    }
}

/// Surah that follows `current` when its last verse ends.
///
/// `None` means the queue is exhausted: continuous play is off, or the
/// last surah was reached without shuffle. With shuffle (which only
/// applies under continuous play) the next surah is drawn uniformly from
/// the full valid range.
pub fn choose_next_surah<R: Rng>(
    current: u16,
    policy: &PlaybackPolicy,
    rng: &mut R,
) -> Option<u16> {
    if !policy.continuous_play {
        return None;
    }
    if policy.shuffle_active() {
        return Some(rng.gen_range(FIRST_SURAH..=LAST_SURAH));
    }
    (current < LAST_SURAH).then_some(current + 1)
}

/// Surah that `previous()` steps back into from the first verse of `current`
pub fn previous_surah(current: u16) -> Option<u16> {
    (current > FIRST_SURAH).then(|| current - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn verse(surah: u16, v: u16) -> VerseRef {
        VerseRef::new(surah, v).unwrap()
    }

    fn policy(continuous_play: bool, shuffle: bool) -> PlaybackPolicy {
        PlaybackPolicy {
            continuous_play,
            shuffle,
            ..PlaybackPolicy::default()
        }
    }

    #[test]
    fn test_sequential_steps_within_surah() {
        let mut queue = PlaybackQueue::sequential_at(verse(112, 2)).unwrap();
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.current(), Some(verse(112, 2)));

        assert_eq!(queue.step_forward(), Some(verse(112, 3)));
        assert_eq!(queue.step_forward(), Some(verse(112, 4)));
        assert_eq!(queue.step_forward(), None);
        // Cursor unchanged at the end
        assert_eq!(queue.current(), Some(verse(112, 4)));

        assert_eq!(queue.step_back(), Some(verse(112, 3)));
    }

    #[test]
    fn test_advancing_past_k_yields_k_plus_one() {
        for surah in [2u16, 9, 36, 112] {
            let count = verse_count(surah).unwrap();
            for k in 1..count {
                let mut queue = PlaybackQueue::sequential_at(verse(surah, k)).unwrap();
                assert_eq!(queue.step_forward(), Some(verse(surah, k + 1)));
            }
        }
    }

    #[test]
    fn test_sequential_start_and_end() {
        let start = PlaybackQueue::sequential_start(3).unwrap();
        assert_eq!(start.current(), Some(verse(3, 1)));
        let end = PlaybackQueue::sequential_end(3).unwrap();
        assert_eq!(end.current(), Some(verse(3, 200)));
        assert_eq!(end.surah_number(), Some(3));
    }

    #[test]
    fn test_at_front() {
        assert!(PlaybackQueue::sequential_start(1).unwrap().at_front());
        assert!(!PlaybackQueue::sequential_start(2).unwrap().at_front());
        assert!(!PlaybackQueue::sequential_at(verse(1, 2)).unwrap().at_front());

        let mut page = PlaybackQueue::explicit(vec![verse(2, 1), verse(2, 2)]).unwrap();
        assert!(page.at_front());
        page.step_forward();
        assert!(!page.at_front());
    }

    #[test]
    fn test_explicit_queue_spans_surahs() {
        let mut page =
            PlaybackQueue::explicit(vec![verse(2, 1), verse(2, 2), verse(3, 1)]).unwrap();
        assert!(page.is_explicit());
        assert_eq!(page.step_forward(), Some(verse(2, 2)));
        assert_eq!(page.step_forward(), Some(verse(3, 1)));
        assert_eq!(page.cursor(), 2);
        assert_eq!(page.step_forward(), None);
        assert_eq!(page.cursor(), 2);
    }

    #[test]
    fn test_empty_explicit_queue_rejected() {
        assert!(matches!(
            PlaybackQueue::explicit(vec![]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_next_surah_without_continuous_play() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(choose_next_surah(5, &policy(false, false), &mut rng), None);
        // Shuffle alone does nothing
        assert_eq!(choose_next_surah(5, &policy(false, true), &mut rng), None);
    }

    #[test]
    fn test_next_surah_sequential() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(choose_next_surah(5, &policy(true, false), &mut rng), Some(6));
        assert_eq!(choose_next_surah(113, &policy(true, false), &mut rng), Some(114));
        assert_eq!(choose_next_surah(114, &policy(true, false), &mut rng), None);
    }

    #[test]
    fn test_shuffle_is_uniform_over_all_surahs() {
        let mut rng = StdRng::seed_from_u64(0x7157_4157);
        let shuffle = policy(true, true);
        let draws_per_surah = 200usize;
        let mut counts = vec![0usize; LAST_SURAH as usize + 1];

        for _ in 0..draws_per_surah * LAST_SURAH as usize {
            let surah = choose_next_surah(114, &shuffle, &mut rng).expect("shuffle always continues");
            assert!((FIRST_SURAH..=LAST_SURAH).contains(&surah));
            counts[surah as usize] += 1;
        }

        assert_eq!(counts[0], 0);
        for (surah, count) in counts.iter().enumerate().skip(1) {
            assert!(
                (120..=290).contains(count),
                "surah {} drawn {} times, expected about {}",
                surah,
                count,
                draws_per_surah
            );
        }

        // Chi-square against the uniform distribution, 113 degrees of freedom
        let expected = draws_per_surah as f64;
        let chi_square: f64 = counts
            .iter()
            .skip(1)
            .map(|c| {
                let diff = *c as f64 - expected;
                diff * diff / expected
            })
            .sum();
        assert!(chi_square < 180.0, "chi-square {} too large", chi_square);
    }

    #[test]
    fn test_previous_surah() {
        assert_eq!(previous_surah(1), None);
        assert_eq!(previous_surah(2), Some(1));
        assert_eq!(previous_surah(114), Some(113));
    }
}
