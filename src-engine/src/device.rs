//! Device identifiers and name-based device resolution.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::platform::{AudioHal, DeviceInfo};

/// Opaque platform device identifier.
///
/// A string so CoreAudio `AudioDeviceID`s and cpal device names fit the same
/// type. The empty string is the "unknown" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Sentinel used when the default output cannot be queried.
    pub fn unknown() -> Self {
        Self(String::new())
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            f.write_str("<unknown>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<u32> for DeviceId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A resolved device: identifier plus the full name it was resolved to.
///
/// Only valid until the next device topology change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    pub id: DeviceId,
    pub name: String,
}

impl From<DeviceInfo> for DeviceRef {
    fn from(info: DeviceInfo) -> Self {
        Self {
            id: info.id,
            name: info.name,
        }
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// The capture (virtual) and playback (physical) devices of the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePair {
    pub capture: DeviceRef,
    pub playback: DeviceRef,
}

/// Case-insensitive substring match of `fragment` in `name`.
pub fn name_matches(name: &str, fragment: &str) -> bool {
    name.to_lowercase().contains(&fragment.to_lowercase())
}

/// Resolves configured device names against the live device list.
pub struct DeviceResolver {
    hal: Arc<dyn AudioHal>,
    capture_name: String,
    playback_name: String,
}

impl DeviceResolver {
    pub fn new(
        hal: Arc<dyn AudioHal>,
        capture_name: impl Into<String>,
        playback_name: impl Into<String>,
    ) -> Self {
        Self {
            hal,
            capture_name: capture_name.into(),
            playback_name: playback_name.into(),
        }
    }

    pub fn capture_name(&self) -> &str {
        &self.capture_name
    }

    pub fn playback_name(&self) -> &str {
        &self.playback_name
    }

    /// Return the first device whose name contains `name`, ignoring case.
    ///
    /// When several devices match, the first in platform enumeration order
    /// wins. That order is not guaranteed to be stable across OS versions.
    pub fn resolve(&self, name: &str) -> Result<DeviceRef, BridgeError> {
        let devices = self.hal.enumerate_devices().map_err(|e| {
            warn!("[HAL] Device enumeration failed while resolving {:?}: {}", name, e);
            BridgeError::device_not_found(name)
        })?;

        let found = devices
            .into_iter()
            .find(|d| name_matches(&d.name, name))
            .map(DeviceRef::from)
            .ok_or_else(|| BridgeError::device_not_found(name))?;

        debug!("[HAL] Resolved {:?} to {}", name, found);
        Ok(found)
    }

    /// Resolve both configured devices.
    pub fn resolve_pair(&self) -> Result<DevicePair, BridgeError> {
        let capture = self.resolve(&self.capture_name)?;
        let playback = self.resolve(&self.playback_name)?;
        Ok(DevicePair { capture, playback })
    }

    /// Current system default output, or [`DeviceId::unknown()`] if the query
    /// fails.
    pub fn current_default_output(&self) -> DeviceId {
        match self.hal.default_output_device() {
            Ok(id) => id,
            Err(e) => {
                warn!("[HAL] Default output query failed: {}", e);
                DeviceId::unknown()
            }
        }
    }
}
