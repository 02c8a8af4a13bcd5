//! volbridge Engine
//!
//! Core of the audio bridge daemon. Keeps a virtual capture device linked to a
//! physical playback device while the virtual device is the system default
//! output, and redirects the volume keys to the link's playback gain.
//!
//! The bridge state machine is platform-neutral and talks to the audio system
//! and the key tap through the traits in [`platform`] and [`hotkey`]. The
//! [`daemon`] module wires the real implementations together.

pub mod config;
pub mod daemon;
pub mod debounce;
pub mod device;
pub mod error;
pub mod hotkey;
pub mod link;
pub mod platform;
pub mod report;
pub mod state;
pub mod volume;

#[cfg(test)]
mod mock;

pub use config::{load_config, Config};
pub use daemon::{Collaborators, Daemon};
pub use device::{DeviceId, DevicePair, DeviceRef, DeviceResolver};
pub use error::{BridgeError, LinkConfigError};
pub use link::{LinkController, LinkState};
pub use report::{ConsoleReporter, Report, Reporter};
pub use state::{BridgeContext, SharedBridge};
pub use volume::{VolumeKey, VolumeState};
