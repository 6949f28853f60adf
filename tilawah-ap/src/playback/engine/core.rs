//! Core playback engine - handle, lifecycle and orchestration
//!
//! **Responsibilities:**
//! - `PlaybackEngine` handle: the only public entry point for callers
//! - Orchestrator actor: owns the state machine, the queue and the device
//! - Select loop serializing commands, device notifications, fetch
//!   completions and policy changes
//! - Shared helpers: state transitions, committing units, failure handling,
//!   starting surah loads
//!
//! Every mutation of the session happens on the actor task, one message at a
//! time. Fetches run on their own tasks and report back with the ticket they
//! were started under; a completion whose ticket no longer matches the
//! pending load is discarded.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tilawah_common::events::RecitationEvent;
use tilawah_common::{PageItem, PlaybackPolicy, PolicyStore, SurahAudioData};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use super::queue::Step;
use crate::audio::output::{device_event_channel, AudioOutput, DeviceEvent};
use crate::config::{DEFAULT_COMMAND_CAPACITY, DEFAULT_EVENT_CAPACITY};
use crate::error::{Error, Result};
use crate::playback::queue::PlaybackQueue;
use crate::playback::reciters::{default_reciters, Reciter, ReciterRegistry};
use crate::playback::resolver::{SurahCache, SurahLoad, VerseResolver};
use crate::playback::state::{LoadTarget, OrchestratorState, PlaybackUnit};
use crate::provider::SurahDataProvider;
use crate::state::SharedState;

/// Reply channel of a command
pub(super) type Reply = oneshot::Sender<Result<()>>;

/// Messages from engine handles to the orchestrator task
pub(super) enum Command {
    PlayVerse {
        surah_number: u16,
        verse_in_surah: u16,
        reply: Reply,
    },
    PlayPage {
        items: Vec<PageItem>,
        reply: Reply,
    },
    TogglePlayPause {
        reply: Reply,
    },
    Next {
        reply: Reply,
    },
    Previous {
        reply: Reply,
    },
    Seek {
        seconds: f64,
        reply: Reply,
    },
    Stop {
        reply: Reply,
    },
    SetReciter {
        reciter_id: String,
        reply: Reply,
    },
    SetPlaybackSpeed {
        speed: f64,
        reply: Reply,
    },
    Shutdown {
        reply: Reply,
    },
}

/// A surah load the orchestrator is waiting for
pub(super) struct PendingLoad {
    pub(super) ticket: u64,
    pub(super) step: Step,
    pub(super) reply: Option<Reply>,
}

/// Completion of a spawned surah load
pub(super) struct LoadOutcome {
    pub(super) ticket: u64,
    pub(super) surah_number: u16,
    pub(super) result: SurahLoad,
}

/// Engine construction options
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Broadcast channel capacity for events
    pub event_capacity: usize,
    /// Commands buffered before callers wait
    pub command_capacity: usize,
    /// Supported reciters
    pub reciters: Vec<Reciter>,
    /// Fixed seed for shuffle draws; entropy when `None`
    pub rng_seed: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            reciters: default_reciters(),
            rng_seed: None,
        }
    }
}

/// Handle to a running playback engine
///
/// Cloning is cheap; all clones drive the same session. Commands resolve
/// once the orchestrator has settled them: either the session reached a
/// stable state, or the command was superseded by a later one (reported as
/// [`Error::Cancelled`]).
#[derive(Clone)]
pub struct PlaybackEngine {
    commands: mpsc::Sender<Command>,
    state: Arc<SharedState>,
    registry: ReciterRegistry,
    policy: PolicyStore,
}

impl PlaybackEngine {
    /// Start the orchestrator task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        provider: Arc<dyn SurahDataProvider>,
        mut output: Box<dyn AudioOutput>,
        policy: PolicyStore,
        options: EngineOptions,
    ) -> Result<Self> {
        let registry = ReciterRegistry::new(options.reciters, policy.clone());
        let initial = policy.get();
        registry.ensure_known(&initial.reciter_id)?;

        let state = Arc::new(SharedState::new(options.event_capacity));
        let (cmd_tx, cmd_rx) = mpsc::channel(options.command_capacity.max(1));
        let (load_tx, load_rx) = mpsc::unbounded_channel();
        let (sink, device_rx) = device_event_channel();
        output.attach(sink);

        let rng = match options.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let orchestrator = Orchestrator {
            state: OrchestratorState::Idle,
            queue: None,
            resolver: VerseResolver::new(SurahCache::new(provider)),
            output,
            shared: Arc::clone(&state),
            policy: policy.clone(),
            registry: registry.clone(),
            applied_reciter: initial.reciter_id.clone(),
            applied_speed: initial.playback_speed,
            rng,
            ticket: 0,
            pending: None,
            load_tx,
            current_surah: None,
        };

        let policy_rx = policy.subscribe();
        tokio::spawn(orchestrator.run(cmd_rx, device_rx, load_rx, policy_rx));

        Ok(Self {
            commands: cmd_tx,
            state,
            registry,
            policy,
        })
    }

    async fn request<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce(Reply) -> Command,
    {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| Error::EngineStopped)?;
        rx.await.map_err(|_| Error::EngineStopped)?
    }

    /// Play one verse, then continue sequentially through its surah
    pub async fn play_verse(&self, surah_number: u16, verse_in_surah: u16) -> Result<()> {
        self.request(|reply| Command::PlayVerse {
            surah_number,
            verse_in_surah,
            reply,
        })
        .await
    }

    /// Play an explicit list of verses (one printed page) in order
    pub async fn play_page(&self, items: Vec<PageItem>) -> Result<()> {
        self.request(|reply| Command::PlayPage { items, reply }).await
    }

    pub async fn toggle_play_pause(&self) -> Result<()> {
        self.request(|reply| Command::TogglePlayPause { reply }).await
    }

    pub async fn next(&self) -> Result<()> {
        self.request(|reply| Command::Next { reply }).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.request(|reply| Command::Previous { reply }).await
    }

    /// Seek within the current clip (seconds)
    pub async fn seek(&self, seconds: f64) -> Result<()> {
        self.request(|reply| Command::Seek { seconds, reply }).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Select a reciter; the sounding verse reloads with the new voice
    pub async fn set_reciter(&self, reciter_id: &str) -> Result<()> {
        let reciter_id = reciter_id.to_string();
        self.request(|reply| Command::SetReciter { reciter_id, reply })
            .await
    }

    pub async fn set_playback_speed(&self, speed: f64) -> Result<()> {
        self.request(|reply| Command::SetPlaybackSpeed { speed, reply })
            .await
    }

    /// Takes effect at the next surah boundary
    pub fn set_continuous_play(&self, enabled: bool) -> Result<()> {
        self.policy.set_continuous_play(enabled)?;
        Ok(())
    }

    /// Takes effect at the next surah boundary, and only with continuous play
    pub fn set_shuffle(&self, enabled: bool) -> Result<()> {
        self.policy.set_shuffle(enabled)?;
        Ok(())
    }

    /// Read-only view of the session
    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RecitationEvent> {
        self.state.subscribe_events()
    }

    pub fn reciters(&self) -> &[Reciter] {
        self.registry.list()
    }

    pub fn current_reciter(&self) -> String {
        self.registry.current()
    }

    pub fn policy(&self) -> &PolicyStore {
        &self.policy
    }

    /// Stop playback and end the orchestrator task
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}

/// The actor owning the session
pub(super) struct Orchestrator {
    pub(super) state: OrchestratorState,
    pub(super) queue: Option<PlaybackQueue>,
    pub(super) resolver: VerseResolver,
    pub(super) output: Box<dyn AudioOutput>,
    pub(super) shared: Arc<SharedState>,
    pub(super) policy: PolicyStore,
    pub(super) registry: ReciterRegistry,
    /// Reciter the current unit was resolved for
    pub(super) applied_reciter: String,
    /// Rate last applied to the device
    pub(super) applied_speed: f64,
    pub(super) rng: StdRng,
    /// Bumped on every load start and every supersession
    pub(super) ticket: u64,
    pub(super) pending: Option<PendingLoad>,
    load_tx: mpsc::UnboundedSender<LoadOutcome>,
    pub(super) current_surah: Option<Arc<SurahAudioData>>,
}

impl Orchestrator {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut device_events: mpsc::UnboundedReceiver<DeviceEvent>,
        mut loads: mpsc::UnboundedReceiver<LoadOutcome>,
        mut policy_rx: watch::Receiver<PlaybackPolicy>,
    ) {
        info!(
            "Playback engine started (reciter: {}, speed: {}x)",
            self.applied_reciter, self.applied_speed
        );
        if let Err(e) = self.output.set_playback_rate(self.applied_speed).await {
            warn!("Failed to apply initial playback speed: {}", e);
        }

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        info!("Shutdown command received");
                        self.halt().await;
                        let _ = reply.send(Ok(()));
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("All engine handles dropped");
                        self.halt().await;
                        break;
                    }
                },
                Some(event) = device_events.recv() => self.handle_device_event(event).await,
                Some(outcome) = loads.recv() => self.handle_load_outcome(outcome).await,
                Ok(()) = policy_rx.changed() => {
                    let policy = policy_rx.borrow_and_update().clone();
                    self.handle_policy_change(policy).await;
                }
            }
        }

        info!("Playback engine stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::PlayVerse {
                surah_number,
                verse_in_surah,
                reply,
            } => self.play_verse(surah_number, verse_in_surah, reply).await,
            Command::PlayPage { items, reply } => self.play_page(items, reply).await,
            Command::TogglePlayPause { reply } => {
                let result = self.toggle_play_pause().await;
                Self::reply(Some(reply), result);
            }
            Command::Next { reply } => self.next(reply).await,
            Command::Previous { reply } => self.previous(reply).await,
            Command::Seek { seconds, reply } => {
                let result = self.seek(seconds).await;
                Self::reply(Some(reply), result);
            }
            Command::Stop { reply } => {
                info!("Stop command received");
                self.halt().await;
                Self::reply(Some(reply), Ok(()));
            }
            Command::SetReciter { reciter_id, reply } => {
                let result = self.set_reciter(reciter_id).await;
                Self::reply(Some(reply), result);
            }
            Command::SetPlaybackSpeed { speed, reply } => {
                let result = self.set_playback_speed(speed).await;
                Self::reply(Some(reply), result);
            }
            Command::Shutdown { reply } => Self::reply(Some(reply), Ok(())),
        }
    }

    pub(super) fn reply(reply: Option<Reply>, result: Result<()>) {
        if let Some(reply) = reply {
            // Caller may have given up waiting
            let _ = reply.send(result);
        }
    }

    /// Replace the orchestrator state, publishing status changes
    pub(super) async fn transition(&mut self, next: OrchestratorState) {
        let old_status = self.state.status();
        let new_status = next.status();
        self.state = next;
        self.shared.set_state(self.state.clone()).await;

        if old_status != new_status {
            info!("Playback state changed: {} -> {}", old_status, new_status);
            self.shared.broadcast_event(RecitationEvent::StateChanged {
                old_state: old_status,
                new_state: new_status,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Publish a failure to observers
    pub(super) fn broadcast_failure(&self, err: &Error) {
        error!("Playback failure ({}): {}", err.kind(), err);
        self.shared.broadcast_event(RecitationEvent::PlaybackFailed {
            kind: err.kind(),
            message: err.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    /// Drop to Idle and publish the failure; returns the error for the caller
    pub(super) async fn fail(&mut self, err: Error) -> Error {
        self.go_idle().await;
        self.broadcast_failure(&err);
        err
    }

    /// Silence the device and forget the queue and the current surah
    pub(super) async fn go_idle(&mut self) {
        if self.state.current_unit().is_some() {
            if let Err(e) = self.output.pause().await {
                warn!("Failed to pause device while going idle: {}", e);
            }
        }
        self.queue = None;
        self.current_surah = None;
        self.shared.set_current_surah(None).await;
        self.shared.reset_position().await;
        self.transition(OrchestratorState::Idle).await;
    }

    /// Cancel any pending load and go Idle
    pub(super) async fn halt(&mut self) {
        self.supersede_pending();
        self.go_idle().await;
    }

    /// Invalidate in-flight loads; a waiting caller learns it was superseded
    pub(super) fn supersede_pending(&mut self) {
        self.ticket += 1;
        if let Some(pending) = self.pending.take() {
            debug!(
                "Superseding pending load of {} (ticket {})",
                pending.step.verse, pending.ticket
            );
            Self::reply(pending.reply, Err(Error::Cancelled));
        }
    }

    /// Data for a surah when no fetch is needed
    pub(super) fn lookup(&self, surah_number: u16) -> Option<Arc<SurahAudioData>> {
        match &self.current_surah {
            Some(data) if data.surah_number == surah_number => Some(Arc::clone(data)),
            _ => self.resolver.cache().get(surah_number),
        }
    }

    /// Load a device with a unit and update the session.
    ///
    /// With a formula the formula sounds first and `unit` is remembered as
    /// its hand-off. Without autoplay the unit is cued paused.
    pub(super) async fn commit(
        &mut self,
        data: Arc<SurahAudioData>,
        unit: PlaybackUnit,
        formula: Option<PlaybackUnit>,
        autoplay: bool,
    ) -> Result<()> {
        let sounding = formula.clone().unwrap_or_else(|| unit.clone());

        if let Err(e) = self.start_unit(&sounding, autoplay).await {
            return Err(self.fail(e).await);
        }

        self.current_surah = Some(Arc::clone(&data));
        self.shared.set_current_surah(Some(data)).await;
        self.shared.reset_position().await;

        let next = match (formula, autoplay) {
            (Some(formula), true) => OrchestratorState::PlayingOpeningFormula {
                formula,
                then: unit,
            },
            (Some(formula), false) => OrchestratorState::Paused {
                unit: formula,
                then: Some(unit),
            },
            (None, true) => OrchestratorState::Playing(unit),
            (None, false) => OrchestratorState::Paused { unit, then: None },
        };
        self.transition(next).await;

        // Observers reacting to the event read the committed state
        if autoplay {
            info!("Now playing {}", sounding);
        } else {
            info!("Cued {} (paused)", sounding);
        }
        self.shared.broadcast_event(RecitationEvent::UnitStarted {
            surah_number: sounding.surah_number(),
            verse: sounding.verse(),
            opening_formula: sounding.is_opening_formula(),
            url: sounding.url().to_string(),
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    async fn start_unit(&mut self, unit: &PlaybackUnit, autoplay: bool) -> Result<()> {
        self.output.set_source(unit.url()).await?;
        if autoplay {
            self.output.play().await?;
        }
        Ok(())
    }

    /// Fetch the surah of `step` and continue once it arrives
    pub(super) async fn begin_load(&mut self, step: Step, reply: Option<Reply>) {
        self.supersede_pending();
        let ticket = self.ticket;
        let surah_number = step.verse.surah_number();

        info!(
            "Loading surah {} for {} ({:?})",
            surah_number, step.verse, step.reason
        );

        // Nothing sounds while loading
        if self.state.current_unit().is_some() {
            if let Err(e) = self.output.pause().await {
                warn!("Failed to pause device before loading: {}", e);
            }
        }

        let target = LoadTarget {
            verse: step.verse,
            reason: step.reason,
        };
        self.pending = Some(PendingLoad {
            ticket,
            step,
            reply,
        });

        let load = self.resolver.cache().load(surah_number);
        let tx = self.load_tx.clone();
        tokio::spawn(async move {
            let result = load.await;
            // Orchestrator gone means nobody is waiting
            let _ = tx.send(LoadOutcome {
                ticket,
                surah_number,
                result,
            });
        });

        self.transition(OrchestratorState::Loading(target)).await;
    }

    async fn handle_load_outcome(&mut self, outcome: LoadOutcome) {
        let current = self
            .pending
            .as_ref()
            .map_or(false, |p| p.ticket == outcome.ticket);
        if !current {
            debug!(
                "Discarding stale load of surah {} (ticket {})",
                outcome.surah_number, outcome.ticket
            );
            return;
        }
        let Some(pending) = self.pending.take() else {
            return;
        };

        match outcome.result {
            Ok(data) => {
                let (surah_number, verse_count) = (data.surah_number, data.verse_count());
                debug!("Surah {} loaded ({} verses)", surah_number, verse_count);
                self.settle(pending.step, pending.reply, Some(data)).await;
                self.shared.broadcast_event(RecitationEvent::SurahLoaded {
                    surah_number,
                    verse_count,
                    timestamp: chrono::Utc::now(),
                });
            }
            Err(source) => {
                let err = Error::Fetch {
                    surah: outcome.surah_number,
                    source,
                };
                let err = self.fail(err).await;
                Self::reply(pending.reply, Err(err));
            }
        }
    }
}
