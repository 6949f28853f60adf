//! Error types for tilawah-ap
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;
use tilawah_common::events::FailureKind;

use crate::provider::FetchError;

/// Main error type for tilawah-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Surah data could not be fetched
    #[error("Failed to fetch surah {surah}: {source}")]
    Fetch {
        surah: u16,
        #[source]
        source: FetchError,
    },

    /// Audio output device rejected a command
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Reciter id not in the registry
    #[error("Unknown reciter: {0}")]
    UnknownReciter(String),

    /// Invalid verse, page or parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A newer command superseded this one before it completed
    #[error("Superseded by a newer command")]
    Cancelled,

    /// The engine task is no longer running
    #[error("Playback engine stopped")]
    EngineStopped,

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the shared library
    #[error(transparent)]
    Common(#[from] tilawah_common::Error),
}

impl Error {
    /// Category reported to observers in `PlaybackFailed`
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Fetch { .. } => FailureKind::Fetch,
            Error::AudioOutput(_) => FailureKind::AudioOutput,
            Error::UnknownReciter(_) => FailureKind::UnknownReciter,
            Error::InvalidInput(_) => FailureKind::InvalidInput,
            Error::Common(tilawah_common::Error::InvalidInput(_)) => FailureKind::InvalidInput,
            Error::NotFound(_) => FailureKind::NotFound,
            Error::Common(tilawah_common::Error::NotFound(_)) => FailureKind::NotFound,
            _ => FailureKind::Internal,
        }
    }
}

/// Convenience Result type using tilawah-ap Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        let fetch = Error::Fetch {
            surah: 5,
            source: FetchError::Status {
                status: 503,
                url: "https://api.test/surahs/5".to_string(),
            },
        };
        assert_eq!(fetch.kind(), FailureKind::Fetch);
        assert!(fetch.to_string().contains("surah 5"));

        let common = Error::from(tilawah_common::Error::InvalidInput("bad".to_string()));
        assert_eq!(common.kind(), FailureKind::InvalidInput);

        assert_eq!(Error::AudioOutput("x".into()).kind(), FailureKind::AudioOutput);
        assert_eq!(Error::Cancelled.kind(), FailureKind::Internal);
    }
}
