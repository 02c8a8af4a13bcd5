//! Daemon wiring: collaborators, event sources and shutdown.
//!
//! Startup resolves both devices first. If either is missing nothing else is
//! set up and the error is returned for the caller to exit on. Otherwise the
//! HAL listener feeds the debouncer, the key tap feeds the hotkey router, and
//! the link is built right away if the bridge is already the default output.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::device::DeviceResolver;
use crate::error::BridgeError;
use crate::hotkey::{create_key_tap, HotkeyRouter, KeyTap};
use crate::link::{LinkController, LinkState};
use crate::platform::{create_engine, create_hal, AudioEngine, AudioHal, Subscription};
use crate::report::{ConsoleReporter, Report, Reporter};
use crate::state::{lock_bridge, BridgeContext, SharedBridge};
use crate::volume::VolumeState;

/// The external systems the bridge runs against.
pub struct Collaborators {
    pub hal: Arc<dyn AudioHal>,
    pub engine: Box<dyn AudioEngine>,
    pub key_tap: Box<dyn KeyTap>,
    pub reporter: Arc<dyn Reporter>,
}

impl Collaborators {
    /// Real implementations for this platform, reporting to stdout.
    pub fn platform() -> Self {
        Self {
            hal: create_hal(),
            engine: create_engine(),
            key_tap: create_key_tap(),
            reporter: Arc::new(ConsoleReporter::new()),
        }
    }
}

/// A running bridge.
pub struct Daemon {
    bridge: SharedBridge,
    key_tap: Box<dyn KeyTap>,
    debouncer: Debouncer,
    subscription: Option<Subscription>,
    signal_task: Option<JoinHandle<()>>,
    stopped: bool,
}

impl Daemon {
    /// Start the bridge.
    ///
    /// Must be called from within a tokio runtime. Fails only with
    /// [`BridgeError::DeviceNotFound`] when a configured device is missing.
    pub fn start(config: &Config, collaborators: Collaborators) -> Result<Self, BridgeError> {
        let Collaborators {
            hal,
            engine,
            mut key_tap,
            reporter,
        } = collaborators;

        let resolver = DeviceResolver::new(
            hal.clone(),
            config.capture_device.clone(),
            config.playback_device.clone(),
        );
        let devices = match resolver.resolve_pair() {
            Ok(devices) => devices,
            Err(e) => {
                error!("[Daemon] Required audio device missing: {}", e);
                reporter.report(Report::LinkFailed {
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };
        info!(
            "[Daemon] Bridging {} -> {}",
            devices.capture, devices.playback
        );

        let volume = VolumeState::new(config.initial_volume, config.volume_steps);
        let link = LinkController::new(engine, devices);
        let bridge: SharedBridge = Arc::new(Mutex::new(BridgeContext::new(
            resolver, link, volume, reporter,
        )));

        let debouncer = Debouncer::new(bridge.clone(), config.debounce_window());
        debug!(
            "[Daemon] Default output changes settle for {:?}",
            debouncer.window()
        );
        let (subscription, signal_task) =
            subscribe_default_output(hal.as_ref(), debouncer.clone());

        let handler = HotkeyRouter::new().into_handler(bridge.clone());
        match key_tap.register(handler).and_then(|_| key_tap.enable()) {
            Ok(()) => info!("[Daemon] Volume key tap enabled"),
            Err(e) => warn!("[Daemon] Volume keys will not be redirected: {}", e),
        }

        {
            let mut ctx = lock_bridge(&bridge);
            if ctx.bridge_is_default_output() {
                info!("[Daemon] Bridge device is already the default output");
                ctx.relink();
            } else {
                info!(
                    "[Daemon] Default output is {}; waiting for the bridge device",
                    ctx.last_default_output
                );
            }
        }

        Ok(Self {
            bridge,
            key_tap,
            debouncer,
            subscription,
            signal_task,
            stopped: false,
        })
    }

    /// Shared bridge state.
    pub fn bridge(&self) -> SharedBridge {
        self.bridge.clone()
    }

    pub fn link_state(&self) -> LinkState {
        lock_bridge(&self.bridge).link.state().clone()
    }

    pub fn key_tap_enabled(&self) -> bool {
        self.key_tap.is_enabled()
    }

    /// Stop intercepting keys, stop listening and tear the link down.
    pub fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.key_tap.disable();
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        if let Some(task) = self.signal_task.take() {
            task.abort();
        }
        self.debouncer.stop();
        lock_bridge(&self.bridge).link.teardown();
        info!("[Daemon] Shut down");
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Forward HAL change notifications to the debouncer.
///
/// The HAL callback only queues a message; the debounced check runs on the
/// runtime. A failed registration leaves the bridge without automatic
/// relinking.
fn subscribe_default_output(
    hal: &dyn AudioHal,
    debouncer: Debouncer,
) -> (Option<Subscription>, Option<JoinHandle<()>>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();

    let subscription = match hal.subscribe_default_output_changed(Arc::new(move || {
        let _ = tx.send(());
    })) {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!("[Daemon] Default output changes will be missed: {}", e);
            return (None, None);
        }
    };

    let task = tokio::spawn(async move {
        while rx.recv().await.is_some() {
            let _ = debouncer.signal();
        }
        debug!("[Daemon] Default output listener closed");
    });

    (Some(subscription), Some(task))
}
