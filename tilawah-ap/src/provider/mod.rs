//! Surah data provider boundary
//!
//! The engine consumes surah audio data through [`SurahDataProvider`]. The
//! provider is the only place where remote data shapes are seen; everything
//! it returns is already normalized into [`SurahAudioData`].

pub mod http;

use async_trait::async_trait;
use thiserror::Error;
use tilawah_common::SurahAudioData;

pub use http::HttpSurahProvider;

/// Why a surah fetch failed
///
/// `Clone` so that one failed fetch can be reported to every caller that
/// was waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Transport failure (connection, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Server answered with a non-success status
    #[error("Server returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body could not be interpreted as surah data
    #[error("Malformed surah data: {0}")]
    Decode(String),

    /// Surah number outside 1..=114
    #[error("Invalid surah number {0}")]
    InvalidSurah(u16),
}

/// Source of per-surah audio data
#[async_trait]
pub trait SurahDataProvider: Send + Sync + 'static {
    /// Fetch the full audio bundle of one surah
    async fn fetch_surah_detail(&self, surah_number: u16) -> Result<SurahAudioData, FetchError>;
}
