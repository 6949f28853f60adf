//! Playback policy and preferences handle
//!
//! **Responsibilities:**
//! - Hold the user's playback preferences (continuous play, shuffle, reciter, speed)
//! - Validate every change before it becomes visible
//! - Notify the engine of changes through a `tokio::sync::watch` channel
//!
//! The engine reads a fresh copy on every transition decision, so settings
//! changed mid-session apply at the next transition.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{Error, Result};

/// Reciter selected when nothing else is configured
pub const DEFAULT_RECITER: &str = "alafasy";

/// Slowest accepted playback rate
pub const MIN_PLAYBACK_SPEED: f64 = 0.25;

/// Fastest accepted playback rate
pub const MAX_PLAYBACK_SPEED: f64 = 4.0;

/// Rates offered by the player's speed selector
pub const PLAYBACK_SPEED_PRESETS: [f64; 5] = [0.75, 1.0, 1.25, 1.5, 2.0];

/// Settings consulted by the orchestrator on every transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackPolicy {
    /// Proceed into the next surah after the last verse
    pub continuous_play: bool,
    /// Pick the next surah at random (only with continuous play)
    pub shuffle: bool,
    /// Selected reciter id
    pub reciter_id: String,
    /// Device playback rate
    pub playback_speed: f64,
}

impl Default for PlaybackPolicy {
    fn default() -> Self {
        Self {
            continuous_play: false,
            shuffle: false,
            reciter_id: DEFAULT_RECITER.to_string(),
            playback_speed: 1.0,
        }
    }
}

impl PlaybackPolicy {
    /// Shuffle takes effect only when continuous play is on
    pub fn shuffle_active(&self) -> bool {
        self.continuous_play && self.shuffle
    }

    pub fn validate(&self) -> Result<()> {
        validate_playback_speed(self.playback_speed)?;
        if self.reciter_id.trim().is_empty() {
            return Err(Error::InvalidInput("reciter id must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Check a playback rate against the accepted range
pub fn validate_playback_speed(speed: f64) -> Result<()> {
    if !speed.is_finite() || !(MIN_PLAYBACK_SPEED..=MAX_PLAYBACK_SPEED).contains(&speed) {
        return Err(Error::InvalidInput(format!(
            "playback speed {} outside {}..={}",
            speed, MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED
        )));
    }
    Ok(())
}

/// Shared preferences handle
///
/// Cloning is cheap; all clones observe and mutate the same policy.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    tx: Arc<watch::Sender<PlaybackPolicy>>,
}

impl PolicyStore {
    pub fn new(policy: PlaybackPolicy) -> Result<Self> {
        policy.validate()?;
        let (tx, _) = watch::channel(policy);
        Ok(Self { tx: Arc::new(tx) })
    }

    /// Snapshot of the current policy
    pub fn get(&self) -> PlaybackPolicy {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every effective change
    pub fn subscribe(&self) -> watch::Receiver<PlaybackPolicy> {
        self.tx.subscribe()
    }

    /// Apply a change atomically.
    ///
    /// The edited copy is validated first; an invalid result leaves the
    /// stored policy untouched. Subscribers are only woken when something
    /// actually changed. Returns whether the policy changed.
    pub fn update<F>(&self, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut PlaybackPolicy),
    {
        let mut candidate = self.get();
        edit(&mut candidate);
        candidate.validate()?;

        Ok(self.tx.send_if_modified(|current| {
            if *current == candidate {
                false
            } else {
                *current = candidate;
                true
            }
        }))
    }

    pub fn set_continuous_play(&self, enabled: bool) -> Result<bool> {
        self.update(|p| p.continuous_play = enabled)
    }

    pub fn set_shuffle(&self, enabled: bool) -> Result<bool> {
        self.update(|p| p.shuffle = enabled)
    }

    pub fn set_reciter(&self, reciter_id: impl Into<String>) -> Result<bool> {
        let reciter_id = reciter_id.into();
        self.update(|p| p.reciter_id = reciter_id)
    }

    pub fn set_playback_speed(&self, speed: f64) -> Result<bool> {
        self.update(|p| p.playback_speed = speed)
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        let (tx, _) = watch::channel(PlaybackPolicy::default());
        Self { tx: Arc::new(tx) }
    }
}
