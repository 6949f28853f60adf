//! # Tilawah Audio Player Library (tilawah-ap)
//!
//! Recitation playback engine.
//!
//! **Purpose:** Turn verse references into a continuous, correctly ordered
//! stream of recitation clips: resolve clips per reciter, cache surah data,
//! advance through sequential and page queues, insert the opening formula
//! at surah boundaries, and keep the session consistent under user commands
//! that arrive while fetches are in flight.
//!
//! **Architecture:** One orchestrator task owns the session; callers hold a
//! cloneable [`PlaybackEngine`] handle. Surah data comes from a
//! [`provider::SurahDataProvider`], sound goes to an [`audio::AudioOutput`].

pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod playback;
pub mod provider;
pub mod state;

pub use error::{Error, Result};
pub use playback::{EngineOptions, PlaybackEngine};
pub use state::SharedState;
