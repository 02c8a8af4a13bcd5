//! Error types for the bridge engine.
//!
//! Only [`BridgeError::DeviceNotFound`] at startup is fatal. Everything that
//! goes wrong while relinking is caught by the link controller and turned into
//! the `Failed` state plus a report line.

/// Why a capture -> playback link could not be configured.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkConfigError {
    /// The device exists but cannot be opened right now (busy, vanished).
    #[error("device unavailable: {device} - {reason}")]
    DeviceUnavailable {
        /// Name of the device that could not be opened.
        device: String,
        /// What the audio backend reported.
        reason: String,
    },

    /// Capture and playback could not agree on a stream format.
    #[error("format mismatch: {reason}")]
    FormatMismatch {
        /// Description of the incompatible formats.
        reason: String,
    },

    /// The OS refused access to an audio device.
    #[error("permission denied for {device}")]
    PermissionDenied {
        /// Name of the device access was denied for.
        device: String,
    },

    /// `start_capture_forwarding` was called before both devices were bound.
    #[error("{0} device not bound")]
    NotBound(&'static str),

    /// Any other audio backend failure.
    #[error("audio backend error: {0}")]
    Backend(String),
}

impl LinkConfigError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Errors surfaced by the bridge engine.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// No audio device name contains the requested fragment.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// Name fragment that matched nothing.
        name: String,
    },

    /// The link could not be configured.
    #[error("link configuration failed: {0}")]
    LinkConfiguration(#[from] LinkConfigError),

    /// A system-defined key event carried data that could not be decoded.
    #[error("malformed key event: {reason}")]
    EventDecode {
        /// What was wrong with the event.
        reason: String,
    },

    /// A query or listener registration on the audio hardware layer failed.
    #[error("audio hardware error: {0}")]
    Hal(String),

    /// Global key interception is not available.
    #[error("hotkey tap unavailable: {0}")]
    HotkeyUnavailable(String),
}

impl BridgeError {
    pub fn device_not_found(name: impl Into<String>) -> Self {
        Self::DeviceNotFound { name: name.into() }
    }

    pub fn event_decode(reason: impl Into<String>) -> Self {
        Self::EventDecode {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_display() {
        let err = BridgeError::device_not_found("U2723QE");
        assert_eq!(err.to_string(), "device not found: U2723QE");
    }

    #[test]
    fn test_link_config_error_wraps() {
        let err: BridgeError = LinkConfigError::FormatMismatch {
            reason: "48000Hz capture, 44100Hz playback".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "link configuration failed: format mismatch: 48000Hz capture, 44100Hz playback"
        );
    }

    #[test]
    fn test_not_bound_display() {
        assert_eq!(
            LinkConfigError::NotBound("input").to_string(),
            "input device not bound"
        );
    }
}
