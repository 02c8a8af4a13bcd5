//! Bridge link lifecycle.
//!
//! The [`LinkController`] owns the single capture -> playback link. Every
//! relink starts from a full teardown, re-resolves both devices and rebuilds
//! the graph; any failure leaves no partial link and parks the controller in
//! [`LinkState::Failed`] until the next external trigger.

use tracing::{debug, info, warn};

use crate::device::{DeviceId, DevicePair, DeviceRef, DeviceResolver};
use crate::error::BridgeError;
use crate::platform::AudioEngine;
use crate::report::{Report, Reporter};
use crate::volume::VolumeState;

/// Lifecycle state of the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// No link has been attempted yet, or the link was torn down on shutdown.
    Idle,
    /// A relink is in progress.
    Linking,
    /// Audio is flowing from capture to playback.
    Linked,
    /// The last attempt failed; waits for the next trigger.
    Failed(String),
}

/// Status of a [`BridgeLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    Down,
    Up,
}

/// The live capture -> playback path.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeLink {
    pub capture: DeviceRef,
    pub playback: DeviceRef,
    pub status: LinkStatus,
    pub applied_volume: f32,
    pub applied_muted: bool,
}

/// Owns the audio engine and the single bridge link.
pub struct LinkController {
    engine: Box<dyn AudioEngine>,
    devices: DevicePair,
    state: LinkState,
    link: Option<BridgeLink>,
}

impl LinkController {
    /// Create an idle controller for a device pair resolved at startup.
    pub fn new(engine: Box<dyn AudioEngine>, devices: DevicePair) -> Self {
        Self {
            engine,
            devices,
            state: LinkState::Idle,
            link: None,
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn is_linked(&self) -> bool {
        self.state == LinkState::Linked
    }

    pub fn link(&self) -> Option<&BridgeLink> {
        self.link.as_ref()
    }

    /// Last successfully resolved capture device.
    ///
    /// Survives a failed resolution so routing decisions keep comparing
    /// against the last-known bridge device.
    pub fn capture_device(&self) -> &DeviceRef {
        &self.devices.capture
    }

    pub fn playback_device(&self) -> &DeviceRef {
        &self.devices.playback
    }

    /// Whether `id` is the bridge's capture device.
    pub fn is_capture(&self, id: &DeviceId) -> bool {
        !id.is_unknown() && *id == self.devices.capture.id
    }

    /// Tear down and rebuild the link.
    ///
    /// Never returns an error: failures become [`LinkState::Failed`] and a
    /// `link failed` report.
    pub fn relink(
        &mut self,
        resolver: &DeviceResolver,
        volume: &VolumeState,
        reporter: &dyn Reporter,
    ) -> &LinkState {
        info!("[Link] Relinking (from {:?})", self.state);
        self.state = LinkState::Linking;
        self.release();

        match self.try_link(resolver, volume) {
            Ok(link) => {
                info!(
                    "[Link] Linked {} -> {} at volume {:.4}{}",
                    link.capture,
                    link.playback,
                    link.applied_volume,
                    if link.applied_muted { " (muted)" } else { "" }
                );
                let device = link.playback.id.clone();
                self.link = Some(link);
                self.state = LinkState::Linked;
                reporter.report(Report::LinkReady { device });
            }
            Err(e) => {
                // Release anything this attempt attached before failing.
                self.release();
                let reason = e.to_string();
                warn!("[Link] Link failed: {}", reason);
                self.state = LinkState::Failed(reason.clone());
                reporter.report(Report::LinkFailed { reason });
            }
        }

        &self.state
    }

    fn try_link(
        &mut self,
        resolver: &DeviceResolver,
        volume: &VolumeState,
    ) -> Result<BridgeLink, BridgeError> {
        self.devices = resolver.resolve_pair()?;
        let DevicePair { capture, playback } = self.devices.clone();

        self.engine.bind_output_device(&playback)?;
        self.engine.bind_input_device(&capture)?;
        self.engine.set_output_volume(volume.effective_level());
        self.engine.start_capture_forwarding()?;

        Ok(BridgeLink {
            capture,
            playback,
            status: LinkStatus::Up,
            applied_volume: volume.level(),
            applied_muted: volume.is_muted(),
        })
    }

    /// Apply a volume to the live link. No-op unless linked; the caller's
    /// [`VolumeState`] carries the value into the next successful link.
    pub fn set_volume(&mut self, level: f32, muted: bool) {
        if self.state != LinkState::Linked {
            debug!("[Link] Not linked; volume {:.4} deferred", level);
            return;
        }
        let effective = if muted { 0.0 } else { level };
        self.engine.set_output_volume(effective);
        if let Some(link) = self.link.as_mut() {
            link.applied_volume = level;
            link.applied_muted = muted;
        }
    }

    /// Destroy the link without rebuilding it.
    pub fn teardown(&mut self) {
        if self.link.is_some() {
            info!("[Link] Tearing down link");
        }
        self.release();
        self.state = LinkState::Idle;
    }

    fn release(&mut self) {
        self.engine.stop_all();
        if let Some(mut link) = self.link.take() {
            link.status = LinkStatus::Down;
            debug!("[Link] Released link {} -> {}", link.capture, link.playback);
        }
    }
}
