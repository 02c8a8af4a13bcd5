//! Platform-agnostic audio collaborator traits and types
//!
//! The bridge core only talks to the audio system through these two traits:
//! [`AudioHal`] for device enumeration and default-output notifications, and
//! [`AudioEngine`] for the capture -> playback graph itself. Both are
//! object-safe so the daemon can hold `Arc<dyn AudioHal>` and
//! `Box<dyn AudioEngine>`.

use std::fmt;
use std::sync::Arc;

use crate::device::{DeviceId, DeviceRef};
use crate::error::{BridgeError, LinkConfigError};

/// Audio device as reported by the hardware layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Platform identifier
    pub id: DeviceId,
    /// Human-readable device name
    pub name: String,
}

impl DeviceInfo {
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Callback invoked whenever the system default output device changes.
///
/// Runs on whatever thread the platform delivers notifications on and must
/// return quickly.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Registration handle for a default-output listener.
///
/// Dropping the subscription unregisters the listener.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unregister now instead of on drop.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Audio hardware abstraction layer.
pub trait AudioHal: Send + Sync {
    /// List every audio device currently known to the system, in platform
    /// enumeration order.
    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, BridgeError>;

    /// Identifier of the current system default output device.
    fn default_output_device(&self) -> Result<DeviceId, BridgeError>;

    /// Register `callback` to run whenever the default output device changes.
    fn subscribe_default_output_changed(
        &self,
        callback: ChangeCallback,
    ) -> Result<Subscription, BridgeError>;
}

/// Audio graph that forwards captured buffers to a playback device.
///
/// Calls are synchronous and expected to complete in bounded time.
pub trait AudioEngine: Send {
    /// Bind the capture side to `device`.
    fn bind_input_device(&mut self, device: &DeviceRef) -> Result<(), LinkConfigError>;

    /// Bind the playback side to `device`.
    fn bind_output_device(&mut self, device: &DeviceRef) -> Result<(), LinkConfigError>;

    /// Start capture and playback, forwarding every captured buffer to the
    /// playback side in arrival order.
    fn start_capture_forwarding(&mut self) -> Result<(), LinkConfigError>;

    /// Stop and release everything, including bindings. Safe to call when
    /// nothing is running.
    fn stop_all(&mut self);

    /// Set the playback gain (0.0 - 1.0) of the running link.
    fn set_output_volume(&mut self, level: f32);
}
