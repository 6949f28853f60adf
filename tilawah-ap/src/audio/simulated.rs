//! Timer-driven simulated output device
//!
//! Stands in for a real audio element: every source "plays" for a fixed
//! clip length (scaled by the playback rate), reports time updates while
//! playing and reports `Ended` when the clip runs out. Used by the
//! command-line player, which has no audio hardware of its own.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::output::{AudioOutput, DeviceEvent, DeviceEventSink};
use crate::error::{Error, Result};

const DEFAULT_TICK: Duration = Duration::from_millis(250);

#[derive(Debug)]
struct Transport {
    source: Option<String>,
    position: f64,
    rate: f64,
}

/// Simulated playback device
pub struct SimulatedOutput {
    clip_seconds: f64,
    tick: Duration,
    transport: Arc<Mutex<Transport>>,
    sink: Option<DeviceEventSink>,
    ticker: Option<JoinHandle<()>>,
}

fn lock(transport: &Mutex<Transport>) -> MutexGuard<'_, Transport> {
    transport.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimulatedOutput {
    /// Device whose clips each last `clip_seconds` at rate 1.0
    pub fn new(clip_seconds: f64) -> Self {
        Self::with_tick(clip_seconds, DEFAULT_TICK)
    }

    /// Same, with a custom time-update cadence
    pub fn with_tick(clip_seconds: f64, tick: Duration) -> Self {
        Self {
            clip_seconds: clip_seconds.max(0.0),
            tick,
            transport: Arc::new(Mutex::new(Transport {
                source: None,
                position: 0.0,
                rate: 1.0,
            })),
            sink: None,
            ticker: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn source(&self) -> Option<String> {
        lock(&self.transport).source.clone()
    }

    fn halt(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn emit(&self, event: DeviceEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }
}

#[async_trait]
impl AudioOutput for SimulatedOutput {
    fn attach(&mut self, sink: DeviceEventSink) {
        self.sink = Some(sink);
    }

    async fn set_source(&mut self, url: &str) -> Result<()> {
        self.halt();
        {
            let mut transport = lock(&self.transport);
            transport.source = Some(url.to_string());
            transport.position = 0.0;
        }
        debug!("Simulated source set: {}", url);
        self.emit(DeviceEvent::LoadedMetadata {
            duration: self.clip_seconds,
        });
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        if lock(&self.transport).source.is_none() {
            return Err(Error::AudioOutput("no source loaded".to_string()));
        }
        if self.is_playing() {
            return Ok(());
        }

        let transport = Arc::clone(&self.transport);
        let sink = self.sink.clone();
        let tick = self.tick;
        let clip_seconds = self.clip_seconds;

        self.ticker = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick).await;

                let (event, finished) = {
                    let mut t = lock(&transport);
                    t.position = (t.position + tick.as_secs_f64() * t.rate).min(clip_seconds);
                    if t.position >= clip_seconds {
                        let url = t.source.clone().unwrap_or_default();
                        (DeviceEvent::Ended { url }, true)
                    } else {
                        (
                            DeviceEvent::TimeUpdate {
                                current_time: t.position,
                            },
                            false,
                        )
                    }
                };

                trace!("Simulated device event: {:?}", event);
                if let Some(sink) = &sink {
                    sink.emit(event);
                }
                if finished {
                    break;
                }
            }
        }));
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.halt();
        Ok(())
    }

    async fn seek(&mut self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() {
            return Err(Error::AudioOutput(format!("cannot seek to {}", seconds)));
        }
        lock(&self.transport).position = seconds.clamp(0.0, self.clip_seconds);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        lock(&self.transport).position
    }

    fn duration(&self) -> Option<f64> {
        lock(&self.transport)
            .source
            .as_ref()
            .map(|_| self.clip_seconds)
    }

    async fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::AudioOutput(format!("invalid playback rate {}", rate)));
        }
        lock(&self.transport).rate = rate;
        Ok(())
    }
}

impl Drop for SimulatedOutput {
    fn drop(&mut self) {
        self.halt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::device_event_channel;

    fn device(clip_seconds: f64) -> (SimulatedOutput, tokio::sync::mpsc::UnboundedReceiver<DeviceEvent>) {
        let (sink, rx) = device_event_channel();
        let mut output = SimulatedOutput::with_tick(clip_seconds, Duration::from_millis(10));
        output.attach(sink);
        (output, rx)
    }

    #[tokio::test]
    async fn test_play_without_source_rejected() {
        let (mut output, _rx) = device(1.0);
        assert!(matches!(output.play().await, Err(Error::AudioOutput(_))));
    }

    #[tokio::test]
    async fn test_clip_runs_to_end() {
        let (mut output, mut rx) = device(0.05);
        output.set_source("https://cdn.test/001001.mp3").await.unwrap();
        assert_eq!(rx.recv().await, Some(DeviceEvent::LoadedMetadata { duration: 0.05 }));

        output.play().await.unwrap();

        let ended = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match rx.recv().await {
                    Some(DeviceEvent::Ended { url }) => break url,
                    Some(_) => continue,
                    None => panic!("sink closed"),
                }
            }
        })
        .await
        .expect("clip should end");

        assert_eq!(ended, "https://cdn.test/001001.mp3");
        assert_eq!(output.current_time(), 0.05);
    }

    #[tokio::test]
    async fn test_pause_stops_clock() {
        let (mut output, _rx) = device(10.0);
        output.set_source("https://cdn.test/a.mp3").await.unwrap();
        output.play().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        output.pause().await.unwrap();

        let paused_at = output.current_time();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(output.current_time(), paused_at);
        assert!(!output.is_playing());
    }

    #[tokio::test]
    async fn test_new_source_resets_position() {
        let (mut output, _rx) = device(10.0);
        output.set_source("https://cdn.test/a.mp3").await.unwrap();
        output.seek(4.0).await.unwrap();
        assert_eq!(output.current_time(), 4.0);

        output.set_source("https://cdn.test/b.mp3").await.unwrap();
        assert_eq!(output.current_time(), 0.0);
        assert_eq!(output.source().as_deref(), Some("https://cdn.test/b.mp3"));
    }

    #[tokio::test]
    async fn test_seek_clamped_and_rate_validated() {
        let (mut output, _rx) = device(3.0);
        output.set_source("https://cdn.test/a.mp3").await.unwrap();
        output.seek(99.0).await.unwrap();
        assert_eq!(output.current_time(), 3.0);
        assert!(output.seek(f64::NAN).await.is_err());

        assert!(output.set_playback_rate(1.5).await.is_ok());
        assert!(output.set_playback_rate(0.0).await.is_err());
    }
}
