//! In-memory surah provider
//!
//! Serves every surah with a clip per verse for each known reciter, with
//! switches for holding fetches open, failing them, and removing clips.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use tilawah_ap::provider::{FetchError, SurahDataProvider};
use tilawah_common::verse::{has_opening_formula, verse_count};
use tilawah_common::{ReciterClips, SurahAudioData, VerseAudio, VerseRef};
use tokio::sync::watch;

pub const RECITERS: [&str; 3] = ["alafasy", "minshawi", "husarymujawwad"];

pub fn verse_url(reciter: &str, surah: u16, verse: u16) -> String {
    format!("https://cdn.test/{}/{:03}{:03}.mp3", reciter, surah, verse)
}

pub fn formula_url(reciter: &str, surah: u16) -> String {
    format!("https://cdn.test/{}/bismillah{:03}.mp3", reciter, surah)
}

#[derive(Default)]
struct Switches {
    calls: HashMap<u16, usize>,
    /// Open gates let fetches through; a closed gate holds them
    gates: HashMap<u16, watch::Sender<bool>>,
    failing: HashSet<u16>,
    missing_clips: HashSet<(String, u16, u16)>,
    missing_formulas: HashSet<(String, u16)>,
}

#[derive(Default)]
pub struct FakeProvider {
    switches: Mutex<Switches>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold fetches of `surah` until [`release`](Self::release)
    pub fn hold(&self, surah: u16) {
        let (tx, _) = watch::channel(false);
        self.switches.lock().unwrap().gates.insert(surah, tx);
    }

    pub fn release(&self, surah: u16) {
        if let Some(gate) = self.switches.lock().unwrap().gates.get(&surah) {
            gate.send_replace(true);
        }
    }

    pub fn fail(&self, surah: u16) {
        self.switches.lock().unwrap().failing.insert(surah);
    }

    pub fn recover(&self, surah: u16) {
        self.switches.lock().unwrap().failing.remove(&surah);
    }

    /// The reciter has no recording of this verse
    pub fn remove_clip(&self, reciter: &str, surah: u16, verse: u16) {
        self.switches
            .lock()
            .unwrap()
            .missing_clips
            .insert((reciter.to_string(), surah, verse));
    }

    pub fn remove_formula(&self, reciter: &str, surah: u16) {
        self.switches
            .lock()
            .unwrap()
            .missing_formulas
            .insert((reciter.to_string(), surah));
    }

    /// Fetches started for `surah`
    pub fn calls(&self, surah: u16) -> usize {
        self.switches
            .lock()
            .unwrap()
            .calls
            .get(&surah)
            .copied()
            .unwrap_or(0)
    }

    fn build(&self, surah: u16) -> SurahAudioData {
        let switches = self.switches.lock().unwrap();
        let count = verse_count(surah).unwrap();

        let verses = (1..=count)
            .map(|v| {
                let clips: ReciterClips = RECITERS
                    .iter()
                    .filter(|r| !switches.missing_clips.contains(&(r.to_string(), surah, v)))
                    .map(|r| (r.to_string(), verse_url(r, surah, v)))
                    .collect();
                VerseAudio::new(VerseRef::new(surah, v).unwrap(), clips)
            })
            .collect();

        let formula = has_opening_formula(surah).then(|| {
            RECITERS
                .iter()
                .filter(|r| !switches.missing_formulas.contains(&(r.to_string(), surah)))
                .map(|r| (r.to_string(), formula_url(r, surah)))
                .collect::<ReciterClips>()
        });

        SurahAudioData::new(surah, format!("Surah {}", surah), verses, formula)
    }
}

#[async_trait]
impl SurahDataProvider for FakeProvider {
    async fn fetch_surah_detail(&self, surah_number: u16) -> Result<SurahAudioData, FetchError> {
        let gate = {
            let mut switches = self.switches.lock().unwrap();
            *switches.calls.entry(surah_number).or_insert(0) += 1;
            switches.gates.get(&surah_number).map(|g| g.subscribe())
        };

        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }

        if self.switches.lock().unwrap().failing.contains(&surah_number) {
            return Err(FetchError::Status {
                status: 503,
                url: format!("https://api.test/surahs/{}", surah_number),
            });
        }
        Ok(self.build(surah_number))
    }
}
