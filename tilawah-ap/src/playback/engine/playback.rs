//! Transport control, reciter and speed changes, device notifications
//!
//! **Responsibilities:**
//! - Pause/resume toggle, keeping the opening formula hand-off across pause
//! - Seek within the current clip
//! - Reciter changes: reload the sounding verse with the new voice
//! - Playback speed changes
//! - Device notifications ("ended", time updates, metadata)

use tilawah_common::events::RecitationEvent;
use tilawah_common::PlaybackPolicy;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::core::Orchestrator;
use super::queue::Step;
use crate::audio::output::DeviceEvent;
use crate::error::{Error, Result};
use crate::playback::state::{LoadReason, OrchestratorState};

impl Orchestrator {
    pub(super) async fn toggle_play_pause(&mut self) -> Result<()> {
        info!("Toggle play/pause command received");

        let next = match self.state.clone() {
            OrchestratorState::Idle | OrchestratorState::Loading(_) => {
                debug!("Toggle ignored while {}", self.state.status());
                return Ok(());
            }
            OrchestratorState::Playing(unit) => {
                if let Err(e) = self.output.pause().await {
                    return Err(self.fail(e).await);
                }
                OrchestratorState::Paused { unit, then: None }
            }
            OrchestratorState::PlayingOpeningFormula { formula, then } => {
                if let Err(e) = self.output.pause().await {
                    return Err(self.fail(e).await);
                }
                OrchestratorState::Paused {
                    unit: formula,
                    then: Some(then),
                }
            }
            OrchestratorState::Paused { unit, then } => {
                if let Err(e) = self.output.play().await {
                    return Err(self.fail(e).await);
                }
                match then {
                    Some(then) => OrchestratorState::PlayingOpeningFormula {
                        formula: unit,
                        then,
                    },
                    None => OrchestratorState::Playing(unit),
                }
            }
        };

        self.transition(next).await;
        Ok(())
    }

    pub(super) async fn seek(&mut self, seconds: f64) -> Result<()> {
        info!("Seek command received: position={:.2}s", seconds);

        if !seconds.is_finite() {
            let err = Error::InvalidInput(format!("seek position {} is not finite", seconds));
            self.broadcast_failure(&err);
            return Err(err);
        }
        if self.state.current_unit().is_none() {
            debug!("Seek ignored while {}", self.state.status());
            return Ok(());
        }

        // Past the end of a clip with known length is its end
        let position = match self.output.duration() {
            Some(duration) => seconds.clamp(0.0, duration.max(0.0)),
            None => seconds.max(0.0),
        };
        if let Err(e) = self.output.seek(position).await {
            self.broadcast_failure(&e);
            return Err(e);
        }
        self.shared.set_current_time(self.output.current_time()).await;
        Ok(())
    }

    pub(super) async fn set_reciter(&mut self, reciter_id: String) -> Result<()> {
        info!("Set reciter command received: {}", reciter_id);

        if let Err(e) = self.registry.select(&reciter_id) {
            self.broadcast_failure(&e);
            return Err(e);
        }
        self.apply_reciter(reciter_id).await
    }

    /// Switch the voice the session resolves clips for.
    ///
    /// The surah data is reciter independent; only the sounding clip is
    /// re-resolved. A paused session stays paused, a sounding opening
    /// formula is restarted in the new voice.
    pub(super) async fn apply_reciter(&mut self, reciter_id: String) -> Result<()> {
        if reciter_id == self.applied_reciter {
            return Ok(());
        }

        let old = std::mem::replace(&mut self.applied_reciter, reciter_id.clone());
        info!("Reciter changed: {} -> {}", old, reciter_id);
        let changed = RecitationEvent::ReciterChanged {
            old,
            new: reciter_id,
            timestamp: chrono::Utc::now(),
        };

        let keep = self.state.current_verse().map(|v| v.surah_number());
        self.resolver.cache().clear_except(keep);

        let (verse, formula_pending, autoplay) = match &self.state {
            OrchestratorState::Idle | OrchestratorState::Loading(_) => {
                self.shared.broadcast_event(changed);
                return Ok(());
            }
            OrchestratorState::Playing(unit) => (unit.verse(), false, true),
            OrchestratorState::Paused { unit, then: None } => (unit.verse(), false, false),
            OrchestratorState::Paused {
                then: Some(then), ..
            } => (then.verse(), true, false),
            OrchestratorState::PlayingOpeningFormula { then, .. } => (then.verse(), true, true),
        };
        let Some(verse) = verse else {
            self.shared.broadcast_event(changed);
            return Ok(());
        };

        let step = Step {
            formula_pending,
            ..Step::new(verse, LoadReason::Skip, autoplay)
        };

        // A reload that needs a fetch finishes after this command returns;
        // its failures still reach observers.
        let (tx, mut rx) = oneshot::channel();
        self.settle(step, Some(tx), None).await;
        self.shared.broadcast_event(changed);
        rx.try_recv().unwrap_or(Ok(()))
    }

    pub(super) async fn set_playback_speed(&mut self, speed: f64) -> Result<()> {
        info!("Set playback speed command received: {}x", speed);

        if let Err(e) = self.policy.set_playback_speed(speed) {
            let err = Error::from(e);
            self.broadcast_failure(&err);
            return Err(err);
        }
        self.apply_speed(speed).await
    }

    pub(super) async fn apply_speed(&mut self, speed: f64) -> Result<()> {
        if speed == self.applied_speed {
            return Ok(());
        }
        if let Err(e) = self.output.set_playback_rate(speed).await {
            self.broadcast_failure(&e);
            return Err(e);
        }
        info!("Playback speed changed: {}x -> {}x", self.applied_speed, speed);
        self.applied_speed = speed;
        Ok(())
    }

    /// Policy edited outside a command (another handle, or a settings UI)
    pub(super) async fn handle_policy_change(&mut self, policy: PlaybackPolicy) {
        debug!("Playback policy changed: {:?}", policy);

        if policy.reciter_id != self.applied_reciter {
            if self.registry.contains(&policy.reciter_id) {
                if let Err(e) = self.apply_reciter(policy.reciter_id).await {
                    debug!("Reciter reload failed: {}", e);
                }
            } else {
                let err = Error::UnknownReciter(policy.reciter_id);
                warn!("Ignoring policy change: {}", err);
                self.broadcast_failure(&err);
            }
        }

        if policy.playback_speed != self.applied_speed {
            if let Err(e) = self.apply_speed(policy.playback_speed).await {
                debug!("Speed change failed: {}", e);
            }
        }
    }

    pub(super) async fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Ended { url } => self.on_ended(&url).await,
            DeviceEvent::TimeUpdate { current_time } => {
                if self.state.current_unit().is_none() {
                    return;
                }
                self.shared.set_current_time(current_time).await;
                let duration = self.shared.get_position().await.duration;
                self.shared.broadcast_event(RecitationEvent::PlaybackProgress {
                    current_time,
                    duration,
                    timestamp: chrono::Utc::now(),
                });
            }
            DeviceEvent::LoadedMetadata { duration } => {
                debug!("Clip duration: {:.2}s", duration);
                self.shared.set_duration(Some(duration)).await;
            }
        }
    }
}
