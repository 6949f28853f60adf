//! Audio output subsystem
//!
//! The engine never decodes audio itself. It drives a single externally
//! owned playback primitive through the [`AudioOutput`] trait and listens to
//! its notifications through one [`DeviceEventSink`].

pub mod output;
pub mod simulated;

pub use output::{device_event_channel, AudioOutput, DeviceEvent, DeviceEventSink};
pub use simulated::SimulatedOutput;
