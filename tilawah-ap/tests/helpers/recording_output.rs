//! Output device that records every call instead of producing sound
//!
//! Tests drive the device side through [`OutputLog`]: finishing the current
//! clip, reporting time updates, or rejecting playback.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tilawah_ap::audio::{AudioOutput, DeviceEvent, DeviceEventSink};
use tilawah_ap::{Error, Result};

/// Duration reported for every clip
pub const CLIP_SECONDS: f64 = 5.0;

#[derive(Default)]
struct Device {
    sink: Option<DeviceEventSink>,
    sources: Vec<String>,
    current: Option<String>,
    playing: bool,
    position: f64,
    plays: usize,
    pauses: usize,
    seeks: Vec<f64>,
    rates: Vec<f64>,
    reject_play: bool,
}

/// Shared view of the recording device
#[derive(Clone, Default)]
pub struct OutputLog {
    device: Arc<Mutex<Device>>,
}

impl OutputLog {
    /// Every source loaded, in order
    pub fn sources(&self) -> Vec<String> {
        self.device.lock().unwrap().sources.clone()
    }

    pub fn current_source(&self) -> Option<String> {
        self.device.lock().unwrap().current.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.device.lock().unwrap().playing
    }

    pub fn play_count(&self) -> usize {
        self.device.lock().unwrap().plays
    }

    pub fn pause_count(&self) -> usize {
        self.device.lock().unwrap().pauses
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.device.lock().unwrap().seeks.clone()
    }

    pub fn rates(&self) -> Vec<f64> {
        self.device.lock().unwrap().rates.clone()
    }

    /// Make `play()` fail from now on
    pub fn set_reject_play(&self, reject: bool) {
        self.device.lock().unwrap().reject_play = reject;
    }

    /// Report a device notification
    pub fn emit(&self, event: DeviceEvent) {
        let device = self.device.lock().unwrap();
        device
            .sink
            .as_ref()
            .expect("output not attached to an engine")
            .emit(event);
    }

    /// The current clip played to its end
    pub fn finish(&self) {
        let url = self
            .current_source()
            .expect("finish() called with no source loaded");
        self.device.lock().unwrap().playing = false;
        self.emit(DeviceEvent::Ended { url });
    }
}

pub struct RecordingOutput {
    log: OutputLog,
}

impl RecordingOutput {
    pub fn new() -> (Self, OutputLog) {
        let log = OutputLog::default();
        (Self { log: log.clone() }, log)
    }
}

#[async_trait]
impl AudioOutput for RecordingOutput {
    fn attach(&mut self, sink: DeviceEventSink) {
        self.log.device.lock().unwrap().sink = Some(sink);
    }

    async fn set_source(&mut self, url: &str) -> Result<()> {
        {
            let mut device = self.log.device.lock().unwrap();
            device.sources.push(url.to_string());
            device.current = Some(url.to_string());
            device.playing = false;
            device.position = 0.0;
        }
        self.log.emit(DeviceEvent::LoadedMetadata {
            duration: CLIP_SECONDS,
        });
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        let mut device = self.log.device.lock().unwrap();
        if device.reject_play {
            return Err(Error::AudioOutput("playback not allowed".to_string()));
        }
        device.playing = true;
        device.plays += 1;
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        let mut device = self.log.device.lock().unwrap();
        device.playing = false;
        device.pauses += 1;
        Ok(())
    }

    async fn seek(&mut self, seconds: f64) -> Result<()> {
        let mut device = self.log.device.lock().unwrap();
        device.position = seconds.min(CLIP_SECONDS);
        device.seeks.push(seconds);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.log.device.lock().unwrap().position
    }

    fn duration(&self) -> Option<f64> {
        self.log.device.lock().unwrap().current.as_ref().map(|_| CLIP_SECONDS)
    }

    async fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        self.log.device.lock().unwrap().rates.push(rate);
        Ok(())
    }
}
