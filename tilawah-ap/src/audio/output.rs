//! Audio output device interface
//!
//! **Responsibilities:**
//! - Define the command surface of a playback device (source, play, pause, seek, rate)
//! - Define the notifications a device reports back (ended, time update, metadata)
//! - Provide the single long-lived event sink a device reports through

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// Notification from the audio output device
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// The clip at `url` played to its end
    Ended { url: String },

    /// Playback position advanced
    TimeUpdate { current_time: f64 },

    /// The source's duration became known
    LoadedMetadata { duration: f64 },
}

/// Sending half of the device notification channel
///
/// Handed to the device once, at engine construction. Sending never blocks,
/// so devices may report from any thread or callback.
#[derive(Debug, Clone)]
pub struct DeviceEventSink {
    tx: mpsc::UnboundedSender<DeviceEvent>,
}

impl DeviceEventSink {
    /// Report an event; silently dropped once the engine has shut down
    pub fn emit(&self, event: DeviceEvent) {
        let _ = self.tx.send(event);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create the device notification channel
pub fn device_event_channel() -> (DeviceEventSink, mpsc::UnboundedReceiver<DeviceEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DeviceEventSink { tx }, rx)
}

/// A single playback primitive, exclusively owned by the playback engine
///
/// Command failures are reported as `Error::AudioOutput`.
#[async_trait]
pub trait AudioOutput: Send + 'static {
    /// Register the sink this device reports through.
    ///
    /// Called exactly once, before any other method.
    fn attach(&mut self, sink: DeviceEventSink);

    /// Load a new source; position resets to zero
    async fn set_source(&mut self, url: &str) -> Result<()>;

    /// Start or resume playback of the current source
    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    /// Move the play head, in seconds from the start of the clip
    async fn seek(&mut self, seconds: f64) -> Result<()>;

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Duration of the current source in seconds, once known
    fn duration(&self) -> Option<f64>;

    async fn set_playback_rate(&mut self, rate: f64) -> Result<()>;
}
