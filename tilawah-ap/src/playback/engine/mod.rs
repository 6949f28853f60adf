//! Playback engine
//!
//! **Module Structure:**
//! - `core.rs`: Engine handle, actor task, select loop, shared transition helpers
//! - `playback.rs`: Transport commands (pause/resume, seek, stop), reciter and
//!   speed changes, device notifications
//! - `queue.rs`: Queue-driven transitions (play, next, previous, advancement on
//!   "ended", surah transitions, clip skipping)

mod core;
mod playback;
mod queue;

pub use core::{EngineOptions, PlaybackEngine};
