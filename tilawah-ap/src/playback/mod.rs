//! Playback engine, queues and verse resolution

pub mod engine;
pub mod queue;
pub mod reciters;
pub mod resolver;
pub mod state;

pub use engine::{EngineOptions, PlaybackEngine};
pub use queue::PlaybackQueue;
pub use reciters::{default_reciters, Reciter, ReciterRegistry};
pub use resolver::{Resolution, SurahCache, VerseResolver};
pub use state::{LoadReason, LoadTarget, OrchestratorState, PlaybackUnit};
