//! HTTP surah data provider
//!
//! Fetches `GET {base_url}/surahs/{n}` and normalizes the response into
//! [`SurahAudioData`]. Two generations of the wire format are accepted:
//!
//! - verse numbers either nested (`{"inQuran": 8, "inSurah": 1}`) or flat (`1`)
//! - verse audio either keyed by reciter id (`{"alafasy": url, ...}`) or the
//!   legacy single-recording shape (`{"primary": url, "secondary": [...]}`),
//!   which is attributed to the configured default reciter
//!
//! The opening formula is read from `preBismillah` (or `bismillah`).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tilawah_common::verse::is_valid_surah;
use tilawah_common::{ReciterClips, SurahAudioData, VerseAudio, VerseRef};
use tracing::{debug, warn};

use super::{FetchError, SurahDataProvider};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSurah {
    number: u16,
    #[serde(default)]
    name: Option<WireName>,
    verses: Vec<WireVerse>,
    #[serde(default, alias = "bismillah")]
    pre_bismillah: Option<WireOpeningFormula>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireName {
    Plain(String),
    Detailed {
        #[serde(default)]
        short: Option<String>,
        #[serde(default)]
        transliteration: Option<WireTransliteration>,
    },
}

#[derive(Debug, Deserialize)]
struct WireTransliteration {
    #[serde(default)]
    en: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireVerse {
    number: WireVerseNumber,
    #[serde(default)]
    audio: Option<WireAudio>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireVerseNumber {
    Nested {
        #[serde(rename = "inQuran")]
        in_quran: u16,
        #[serde(rename = "inSurah")]
        in_surah: u16,
    },
    Flat(u16),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireAudio {
    Legacy {
        primary: String,
        #[serde(default)]
        #[allow(dead_code)]
        secondary: Vec<String>,
    },
    ByReciter(HashMap<String, String>),
}

#[derive(Debug, Deserialize)]
struct WireOpeningFormula {
    #[serde(default)]
    audio: Option<WireAudio>,
}

impl WireAudio {
    fn into_clips(self, default_reciter: &str) -> ReciterClips {
        match self {
            WireAudio::Legacy { primary, .. } => {
                let mut clips = ReciterClips::new();
                clips.insert(default_reciter.to_string(), primary);
                clips
            }
            WireAudio::ByReciter(map) => map
                .into_iter()
                .filter(|(_, url)| !url.trim().is_empty())
                .collect(),
        }
    }
}

impl WireName {
    fn display(self) -> Option<String> {
        match self {
            WireName::Plain(name) => Some(name),
            WireName::Detailed {
                short,
                transliteration,
            } => transliteration
                .and_then(|t| t.en.or(t.id))
                .or(short),
        }
    }
}

/// Decode and normalize one surah response body
pub fn parse_surah_body(
    body: &[u8],
    surah_number: u16,
    default_reciter: &str,
) -> std::result::Result<SurahAudioData, FetchError> {
    let wire: WireSurah =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    if wire.number != surah_number {
        return Err(FetchError::Decode(format!(
            "requested surah {}, response describes surah {}",
            surah_number, wire.number
        )));
    }

    let mut verses = Vec::with_capacity(wire.verses.len());
    for verse in wire.verses {
        let (in_surah, in_quran) = match verse.number {
            WireVerseNumber::Nested { in_quran, in_surah } => (in_surah, Some(in_quran)),
            WireVerseNumber::Flat(in_surah) => (in_surah, None),
        };

        let verse_ref = VerseRef::new(surah_number, in_surah)
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        if let Some(global) = in_quran {
            if global != verse_ref.verse_global() {
                warn!(
                    "Verse {} reports global number {}, expected {}",
                    verse_ref,
                    global,
                    verse_ref.verse_global()
                );
            }
        }

        let clips = verse
            .audio
            .map(|audio| audio.into_clips(default_reciter))
            .unwrap_or_default();
        verses.push(VerseAudio::new(verse_ref, clips));
    }

    let opening_formula = wire
        .pre_bismillah
        .and_then(|formula| formula.audio)
        .map(|audio| audio.into_clips(default_reciter));

    let name = wire
        .name
        .and_then(WireName::display)
        .unwrap_or_else(|| format!("Surah {}", surah_number));

    Ok(SurahAudioData::new(surah_number, name, verses, opening_formula))
}

/// Surah data provider backed by the public surah API
pub struct HttpSurahProvider {
    client: reqwest::Client,
    base_url: String,
    default_reciter: String,
}

impl HttpSurahProvider {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        default_reciter: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tilawah-ap/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_reciter: default_reciter.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn surah_url(&self, surah_number: u16) -> String {
        format!("{}/surahs/{}", self.base_url, surah_number)
    }
}

#[async_trait]
impl SurahDataProvider for HttpSurahProvider {
    async fn fetch_surah_detail(
        &self,
        surah_number: u16,
    ) -> std::result::Result<SurahAudioData, FetchError> {
        if !is_valid_surah(surah_number) {
            return Err(FetchError::InvalidSurah(surah_number));
        }

        let url = self.surah_url(surah_number);
        debug!("Fetching surah data: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let data = parse_surah_body(&body, surah_number, &self.default_reciter)?;
        debug!(
            "Fetched surah {} ({} verses, opening formula: {})",
            surah_number,
            data.verse_count(),
            data.opening_formula.is_some()
        );
        Ok(data)
    }
}
