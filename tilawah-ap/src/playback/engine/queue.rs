//! Queue-driven transitions
//!
//! **Responsibilities:**
//! - Direct play (`play_verse`, `play_page`)
//! - Stepping through the queue (`next`, `previous`, advancement on "ended")
//! - Surah transitions under continuous play and shuffle
//! - Skipping verses the selected reciter has no clip for
//!
//! Every transition funnels through [`Orchestrator::settle`], which either
//! commits a unit, starts a surah load and finishes later, or exhausts the
//! queue.

use std::sync::Arc;

use tilawah_common::events::RecitationEvent;
use tilawah_common::verse::{has_opening_formula, TOTAL_VERSES};
use tilawah_common::{PageItem, SurahAudioData, VerseRef};
use tracing::{debug, info, warn};

use super::core::{Orchestrator, Reply};
use crate::error::{Error, Result};
use crate::playback::queue::{choose_next_surah, previous_surah, PlaybackQueue};
use crate::playback::resolver::{Resolution, VerseResolver};
use crate::playback::state::{LoadReason, OrchestratorState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Direction {
    Forward,
    Backward,
}

/// A verse the session is moving to
#[derive(Debug, Clone)]
pub(super) struct Step {
    pub(super) verse: VerseRef,
    pub(super) reason: LoadReason,
    pub(super) direction: Direction,
    /// Play the surah's opening formula before the verse
    pub(super) formula_pending: bool,
    /// Start sounding, or cue paused
    pub(super) autoplay: bool,
    /// Consecutive verses skipped for lack of a clip
    pub(super) skipped: u16,
}

impl Step {
    pub(super) fn new(verse: VerseRef, reason: LoadReason, autoplay: bool) -> Self {
        Self {
            verse,
            reason,
            direction: Direction::Forward,
            formula_pending: false,
            autoplay,
            skipped: 0,
        }
    }
}

/// Where stepping the queue led
#[derive(Debug)]
pub(super) enum QueueStep {
    Next {
        verse: VerseRef,
        reason: LoadReason,
        entering_surah: bool,
    },
    /// Nothing follows; carries the surah of the last unit considered
    Exhausted(u16),
    /// Nothing precedes the cursor
    FrontReached,
}

impl Orchestrator {
    pub(super) async fn play_verse(&mut self, surah_number: u16, verse_in_surah: u16, reply: Reply) {
        info!(
            "Play verse command received: {}:{}",
            surah_number, verse_in_surah
        );

        let queue = VerseRef::new(surah_number, verse_in_surah)
            .map_err(Error::from)
            .and_then(|verse| Ok((verse, PlaybackQueue::sequential_at(verse)?)));
        let (verse, queue) = match queue {
            Ok(found) => found,
            Err(e) => {
                self.broadcast_failure(&e);
                Self::reply(Some(reply), Err(e));
                return;
            }
        };

        self.supersede_pending();
        self.queue = Some(queue);
        self.settle(Step::new(verse, LoadReason::PlayVerse, true), Some(reply), None)
            .await;
    }

    pub(super) async fn play_page(&mut self, items: Vec<PageItem>, reply: Reply) {
        info!("Play page command received ({} items)", items.len());

        let queue = items
            .iter()
            .map(|item| item.verse_ref().map_err(Error::from))
            .collect::<Result<Vec<_>>>()
            .and_then(PlaybackQueue::explicit);
        let queue = match queue {
            Ok(queue) => queue,
            Err(e) => {
                self.broadcast_failure(&e);
                Self::reply(Some(reply), Err(e));
                return;
            }
        };
        let Some(first) = queue.current() else {
            Self::reply(Some(reply), Err(Error::InvalidInput("page queue is empty".to_string())));
            return;
        };

        self.supersede_pending();
        self.queue = Some(queue);
        self.settle(Step::new(first, LoadReason::PlayPage, true), Some(reply), None)
            .await;
    }

    pub(super) async fn next(&mut self, reply: Reply) {
        info!("Next command received");

        match &self.state {
            OrchestratorState::Idle | OrchestratorState::Loading(_) => {
                debug!("Next ignored while {}", self.state.status());
                Self::reply(Some(reply), Ok(()));
            }
            OrchestratorState::PlayingOpeningFormula { then, .. } => {
                // Cut the formula short
                let step = self.handoff_step(then.verse(), true);
                self.settle_or_idle(step, reply).await;
            }
            OrchestratorState::Paused {
                then: Some(then), ..
            } => {
                let step = self.handoff_step(then.verse(), false);
                self.settle_or_idle(step, reply).await;
            }
            OrchestratorState::Playing(_) => self.advance(true, Some(reply)).await,
            OrchestratorState::Paused { then: None, .. } => self.advance(false, Some(reply)).await,
        }
    }

    pub(super) async fn previous(&mut self, reply: Reply) {
        info!("Previous command received");

        if matches!(
            self.state,
            OrchestratorState::Idle | OrchestratorState::Loading(_)
        ) {
            debug!("Previous ignored while {}", self.state.status());
            Self::reply(Some(reply), Ok(()));
            return;
        }
        if self.queue.as_ref().map_or(true, PlaybackQueue::at_front) {
            debug!("Previous ignored at the front of the queue");
            Self::reply(Some(reply), Ok(()));
            return;
        }

        let autoplay = !matches!(self.state, OrchestratorState::Paused { .. });
        match self.step_queue(Direction::Backward) {
            QueueStep::Next { verse, reason, .. } => {
                let step = Step {
                    direction: Direction::Backward,
                    ..Step::new(verse, reason, autoplay)
                };
                self.settle(step, Some(reply), None).await;
            }
            QueueStep::FrontReached | QueueStep::Exhausted(_) => {
                Self::reply(Some(reply), Ok(()));
            }
        }
    }

    /// Device finished a clip
    pub(super) async fn on_ended(&mut self, url: &str) {
        match &self.state {
            OrchestratorState::Playing(unit) if unit.url() == url => {
                debug!("Finished {}", unit);
                self.advance(true, None).await;
            }
            OrchestratorState::PlayingOpeningFormula { formula, then } if formula.url() == url => {
                debug!("Finished {}, continuing with {}", formula, then);
                let verse = then.verse();
                if let Some(step) = self.handoff_step(verse, true) {
                    self.settle(step, None, None).await;
                }
            }
            _ => debug!("Ignoring stale ended notification for {}", url),
        }
    }

    fn handoff_step(&self, verse: Option<VerseRef>, autoplay: bool) -> Option<Step> {
        verse.map(|verse| Step::new(verse, LoadReason::Advance, autoplay))
    }

    async fn settle_or_idle(&mut self, step: Option<Step>, reply: Reply) {
        match step {
            Some(step) => self.settle(step, Some(reply), None).await,
            None => {
                let err = self
                    .fail(Error::InvalidInput("opening formula has no verse to hand off to".to_string()))
                    .await;
                Self::reply(Some(reply), Err(err));
            }
        }
    }

    /// Move forward through the queue from the current unit
    async fn advance(&mut self, autoplay: bool, reply: Option<Reply>) {
        match self.step_queue(Direction::Forward) {
            QueueStep::Next {
                verse,
                reason,
                entering_surah,
            } => {
                let step = Step {
                    formula_pending: entering_surah,
                    ..Step::new(verse, reason, autoplay)
                };
                self.settle(step, reply, None).await;
            }
            QueueStep::Exhausted(surah_number) => {
                self.exhaust(surah_number).await;
                Self::reply(reply, Ok(()));
            }
            QueueStep::FrontReached => Self::reply(reply, Ok(())),
        }
    }

    /// Drive `step` to a stable state.
    ///
    /// Resolves against cached data, skipping verses without a clip in the
    /// direction of travel, and commits the first playable unit. When the
    /// surah is not loaded yet the load is started and settling resumes
    /// once it completes.
    pub(super) async fn settle(
        &mut self,
        mut step: Step,
        reply: Option<Reply>,
        mut loaded: Option<Arc<SurahAudioData>>,
    ) {
        loop {
            let surah_number = step.verse.surah_number();
            let data = match loaded.take() {
                Some(data) if data.surah_number == surah_number => Some(data),
                _ => self.lookup(surah_number),
            };
            let Some(data) = data else {
                self.begin_load(step, reply).await;
                return;
            };

            let reciter = self.applied_reciter.clone();
            match VerseResolver::resolve_in(&data, step.verse, &reciter) {
                Resolution::Unit(unit) => {
                    let formula = if step.formula_pending {
                        let formula = VerseResolver::opening_formula_in(&data, &reciter);
                        if formula.is_none() {
                            debug!(
                                "No opening formula clip for surah {} by {}",
                                surah_number, reciter
                            );
                        }
                        formula
                    } else {
                        None
                    };
                    let result = self.commit(data, unit, formula, step.autoplay).await;
                    Self::reply(reply, result);
                    return;
                }
                Resolution::NotFound => {
                    warn!("No clip for {} by {}, skipping", step.verse, reciter);
                    self.shared.broadcast_event(RecitationEvent::ClipSkipped {
                        verse: step.verse,
                        reciter_id: reciter,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }

            if step.skipped >= TOTAL_VERSES {
                info!("No playable clip found, giving up after {} skips", step.skipped);
                self.exhaust(surah_number).await;
                Self::reply(reply, Ok(()));
                return;
            }

            let next = loop {
                match self.step_queue(step.direction) {
                    QueueStep::FrontReached => {
                        debug!("Skipped back to the front of the queue, continuing forward");
                        step.direction = Direction::Forward;
                    }
                    other => break other,
                }
            };

            match next {
                QueueStep::Next {
                    verse,
                    reason,
                    entering_surah,
                } => {
                    let same_surah = verse.surah_number() == surah_number;
                    step = Step {
                        verse,
                        reason: if reason == LoadReason::SurahTransition {
                            reason
                        } else {
                            LoadReason::Skip
                        },
                        direction: step.direction,
                        formula_pending: entering_surah || (same_surah && step.formula_pending),
                        autoplay: step.autoplay,
                        skipped: step.skipped + 1,
                    };
                }
                QueueStep::Exhausted(last) => {
                    self.exhaust(last).await;
                    Self::reply(reply, Ok(()));
                    return;
                }
                QueueStep::FrontReached => {
                    Self::reply(reply, Ok(()));
                    return;
                }
            }
        }
    }

    /// Move the queue cursor one unit in `direction`
    pub(super) fn step_queue(&mut self, direction: Direction) -> QueueStep {
        let Some(queue) = self.queue.as_mut() else {
            let last = self
                .state
                .current_verse()
                .map(|v| v.surah_number())
                .unwrap_or_default();
            return QueueStep::Exhausted(last);
        };
        let from = queue.current();
        let from_surah = from.map(|v| v.surah_number()).unwrap_or_default();

        match (direction, queue.is_explicit()) {
            (Direction::Forward, false) => {
                if let Some(verse) = queue.step_forward() {
                    return QueueStep::Next {
                        verse,
                        reason: LoadReason::Advance,
                        entering_surah: false,
                    };
                }
                let policy = self.policy.get();
                let Some(next_surah) = choose_next_surah(from_surah, &policy, &mut self.rng) else {
                    return QueueStep::Exhausted(from_surah);
                };
                match PlaybackQueue::sequential_start(next_surah) {
                    Ok(queue) => {
                        let Some(verse) = queue.current() else {
                            return QueueStep::Exhausted(from_surah);
                        };
                        info!(
                            "Continuing from surah {} into surah {}{}",
                            from_surah,
                            next_surah,
                            if policy.shuffle_active() { " (shuffle)" } else { "" }
                        );
                        self.queue = Some(queue);
                        QueueStep::Next {
                            verse,
                            reason: LoadReason::SurahTransition,
                            entering_surah: has_opening_formula(next_surah),
                        }
                    }
                    Err(e) => {
                        warn!("Cannot continue into surah {}: {}", next_surah, e);
                        QueueStep::Exhausted(from_surah)
                    }
                }
            }
            (Direction::Forward, true) => match queue.step_forward() {
                Some(verse) => QueueStep::Next {
                    verse,
                    reason: LoadReason::Advance,
                    entering_surah: verse.surah_number() != from_surah
                        && verse.is_first_in_surah()
                        && has_opening_formula(verse.surah_number()),
                },
                None => QueueStep::Exhausted(from_surah),
            },
            (Direction::Backward, false) => {
                if let Some(verse) = queue.step_back() {
                    return QueueStep::Next {
                        verse,
                        reason: LoadReason::StepBack,
                        entering_surah: false,
                    };
                }
                let Some(previous) = previous_surah(from_surah) else {
                    return QueueStep::FrontReached;
                };
                match PlaybackQueue::sequential_end(previous) {
                    Ok(queue) => match queue.current() {
                        Some(verse) => {
                            self.queue = Some(queue);
                            QueueStep::Next {
                                verse,
                                reason: LoadReason::StepBack,
                                entering_surah: false,
                            }
                        }
                        None => QueueStep::FrontReached,
                    },
                    Err(e) => {
                        warn!("Cannot step back into surah {}: {}", previous, e);
                        QueueStep::FrontReached
                    }
                }
            }
            (Direction::Backward, true) => match queue.step_back() {
                Some(verse) => QueueStep::Next {
                    verse,
                    reason: LoadReason::StepBack,
                    entering_surah: false,
                },
                None => QueueStep::FrontReached,
            },
        }
    }

    /// Nothing left to play
    pub(super) async fn exhaust(&mut self, surah_number: u16) {
        info!("Playback queue exhausted after surah {}", surah_number);
        self.go_idle().await;
        self.shared.broadcast_event(RecitationEvent::QueueExhausted {
            surah_number,
            timestamp: chrono::Utc::now(),
        });
    }
}
