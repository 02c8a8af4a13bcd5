//! Audio platform integration.
//!
//! - macOS: CoreAudio HAL with property listeners
//! - Other platforms: cpal host polled for default-output changes
//!
//! The capture -> playback engine is cpal everywhere.

mod backend;
mod cpal_engine;
pub mod forward;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(not(target_os = "macos"))]
mod polling;

pub use backend::{AudioEngine, AudioHal, ChangeCallback, DeviceInfo, Subscription};
pub use cpal_engine::CpalEngine;

#[cfg(target_os = "macos")]
pub use macos::CoreAudioHal;

#[cfg(not(target_os = "macos"))]
pub use polling::PollingHal;

use std::sync::Arc;

/// Create the hardware layer for this platform.
pub fn create_hal() -> Arc<dyn AudioHal> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(CoreAudioHal::new())
    }

    #[cfg(not(target_os = "macos"))]
    {
        Arc::new(PollingHal::new())
    }
}

/// Create the audio engine for this platform.
pub fn create_engine() -> Box<dyn AudioEngine> {
    Box::new(CpalEngine::new())
}
