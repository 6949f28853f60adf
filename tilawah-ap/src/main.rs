//! Recitation player (tilawah-ap) - Main entry point
//!
//! Plays a surah (optionally from a given verse) or a page of verses through
//! the simulated output device, fetching surah data over HTTP, and logs
//! every engine event. Exits when the session returns to Idle or on
//! Ctrl+C / SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tilawah_ap::audio::SimulatedOutput;
use tilawah_ap::config::TomlConfig;
use tilawah_ap::events::{describe, FailureKind, RecitationEvent};
use tilawah_ap::provider::HttpSurahProvider;
use tilawah_ap::{EngineOptions, PlaybackEngine};
use tilawah_common::{PageItem, PolicyStore};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tilawah-ap
#[derive(Parser, Debug)]
#[command(name = "tilawah-ap")]
#[command(about = "Recitation player: plays a surah or a page verse by verse")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "TILAWAH_CONFIG")]
    config: Option<PathBuf>,

    /// Surah to play
    #[arg(short, long, conflicts_with = "page", required_unless_present = "page")]
    surah: Option<u16>,

    /// Verse to start from
    #[arg(short, long, default_value_t = 1, requires = "surah")]
    verse: u16,

    /// Page to play, as comma-separated surah:verse items (e.g. 2:1,2:2,2:3)
    #[arg(long, value_delimiter = ',')]
    page: Vec<PageItem>,

    /// Reciter id
    #[arg(short, long, env = "TILAWAH_RECITER")]
    reciter: Option<String>,

    /// Continue into the following surahs
    #[arg(long, env = "TILAWAH_CONTINUOUS")]
    continuous: bool,

    /// Pick the next surah at random (with --continuous)
    #[arg(long, env = "TILAWAH_SHUFFLE")]
    shuffle: bool,

    /// Playback speed
    #[arg(long, env = "TILAWAH_SPEED")]
    speed: Option<f64>,

    /// Surah API base URL
    #[arg(long, env = "TILAWAH_API_BASE_URL")]
    api_base_url: Option<String>,
}

impl Args {
    /// Command-line values override the file
    fn apply(&self, config: &mut TomlConfig) {
        if let Some(reciter) = &self.reciter {
            config.playback.reciter = reciter.clone();
        }
        if self.continuous {
            config.playback.continuous_play = true;
        }
        if self.shuffle {
            config.playback.shuffle = true;
        }
        if let Some(speed) = self.speed {
            config.playback.playback_speed = speed;
        }
        if let Some(url) = &self.api_base_url {
            config.api_base_url = url.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) =
        TomlConfig::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting tilawah-ap {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &source {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    let provider = HttpSurahProvider::new(
        config.api_base_url.clone(),
        config.http_timeout(),
        config.playback.reciter.clone(),
    )
    .context("Failed to create surah provider")?;
    info!("Surah API: {}", provider.base_url());

    let policy = PolicyStore::new(config.to_policy()).context("Invalid playback policy")?;
    let engine = PlaybackEngine::new(
        Arc::new(provider),
        Box::new(SimulatedOutput::new(config.simulation.clip_seconds)),
        policy,
        EngineOptions {
            event_capacity: config.event_capacity,
            ..EngineOptions::default()
        },
    )
    .context("Failed to initialize playback engine")?;
    info!("Playback engine initialized (reciter: {})", engine.current_reciter());

    // Subscribe before the first command so no transition is missed
    let events = engine.subscribe_events();

    let started = if args.page.is_empty() {
        let surah = args.surah.context("--surah or --page is required")?;
        engine.play_verse(surah, args.verse).await
    } else {
        engine.play_page(args.page.clone()).await
    };
    if let Err(e) = started {
        engine.shutdown().await.ok();
        bail!("Failed to start playback: {}", e);
    }

    tokio::select! {
        _ = follow_events(events) => info!("Playback finished"),
        _ = shutdown_signal() => {}
    }

    engine
        .shutdown()
        .await
        .context("Failed to stop playback engine")?;
    info!("Shutdown complete");
    Ok(())
}

/// Log engine events until the session returns to Idle
async fn follow_events(mut events: broadcast::Receiver<RecitationEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                match &event {
                    RecitationEvent::PlaybackProgress { .. } => debug!("{}", describe(&event)),
                    RecitationEvent::ClipSkipped { .. } => warn!("{}", describe(&event)),
                    RecitationEvent::PlaybackFailed { .. } => error!("{}", describe(&event)),
                    _ => info!("{}", describe(&event)),
                }
                // Published once the session is already Idle
                if matches!(
                    event,
                    RecitationEvent::QueueExhausted { .. }
                        | RecitationEvent::PlaybackFailed {
                            kind: FailureKind::Fetch | FailureKind::AudioOutput,
                            ..
                        }
                ) {
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Event log lagged, {} events dropped", n);
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
