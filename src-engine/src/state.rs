//! Shared bridge state.
//!
//! Everything the hotkey router, the debouncer and the link controller touch
//! lives in one [`BridgeContext`] behind a mutex. Relinks and key events are
//! serialized by that mutex, so a volume change that arrives during a relink
//! waits for it and is applied afterwards.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::device::{DeviceId, DeviceResolver};
use crate::link::{LinkController, LinkState};
use crate::report::Reporter;
use crate::volume::VolumeState;

/// Bridge state shared by every event source.
pub struct BridgeContext {
    /// Name-based device lookup
    pub resolver: DeviceResolver,
    /// Owner of the single capture -> playback link
    pub link: LinkController,
    /// Authoritative bridge volume
    pub volume: VolumeState,
    /// Last observed system default output
    pub last_default_output: DeviceId,
    reporter: Arc<dyn Reporter>,
}

impl BridgeContext {
    pub fn new(
        resolver: DeviceResolver,
        link: LinkController,
        volume: VolumeState,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            resolver,
            link,
            volume,
            last_default_output: DeviceId::unknown(),
            reporter,
        }
    }

    pub fn reporter(&self) -> &dyn Reporter {
        self.reporter.as_ref()
    }

    /// Re-read the default output and remember it.
    pub fn observe_default_output(&mut self) -> &DeviceId {
        self.last_default_output = self.resolver.current_default_output();
        &self.last_default_output
    }

    /// Whether the bridge's capture device is the current default output.
    pub fn bridge_is_default_output(&mut self) -> bool {
        let current = self.observe_default_output().clone();
        self.link.is_capture(&current)
    }

    /// Tear down and rebuild the link with the current volume.
    pub fn relink(&mut self) -> LinkState {
        let Self {
            resolver,
            link,
            volume,
            reporter,
            ..
        } = self;
        link.relink(resolver, volume, reporter.as_ref()).clone()
    }

    /// Push the current volume into the link (deferred if not linked).
    pub fn apply_volume(&mut self) {
        self.link
            .set_volume(self.volume.level(), self.volume.is_muted());
    }
}

/// Thread-safe handle to the bridge state.
pub type SharedBridge = Arc<Mutex<BridgeContext>>;

/// Lock the bridge, recovering the state if a previous holder panicked.
pub fn lock_bridge(bridge: &SharedBridge) -> MutexGuard<'_, BridgeContext> {
    bridge.lock().unwrap_or_else(PoisonError::into_inner)
}
