//! Global volume-key interception.
//!
//! This module provides the platform key tap and the router that decides
//! which events the bridge claims:
//! - macOS: CGEventTap on system-defined events (requires Accessibility permission)
//! - Other platforms: unsupported stub

mod backend;
pub mod event;
mod router;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(not(target_os = "macos"))]
mod unsupported;

pub use backend::{KeyEventHandler, KeyTap, RawKeyEvent, SystemDefinedPayload, TapDisposition};
pub use event::decode_volume_key;
pub use router::HotkeyRouter;

/// Create the key tap for this platform.
pub fn create_key_tap() -> Box<dyn KeyTap> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacOSKeyTap::new())
    }

    #[cfg(not(target_os = "macos"))]
    {
        Box::new(unsupported::UnsupportedKeyTap::new())
    }
}
