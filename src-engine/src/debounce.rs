//! Delayed re-evaluation of default-output changes.
//!
//! CoreAudio announces a new default output before the device has finished
//! its handshake, so acting on the notification directly fails. Each raw
//! signal instead schedules its own check after a quiescence window; pending
//! checks are never cancelled. A check only relinks if the bridge device is
//! still the default output when it fires, which makes duplicate checks
//! harmless and ignores switches that already reverted.
//!
//! Once stopped, checks that are still waiting fire as no-ops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::state::{lock_bridge, SharedBridge};

/// Schedules delayed relink checks on the tokio runtime.
#[derive(Clone)]
pub struct Debouncer {
    bridge: SharedBridge,
    window: Duration,
    stopped: Arc<AtomicBool>,
}

impl Debouncer {
    pub fn new(bridge: SharedBridge, window: Duration) -> Self {
        Self {
            bridge,
            window,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Disarm every pending and future check, clones included.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Record a raw default-output-changed signal and schedule a check.
    ///
    /// Must be called from within a tokio runtime.
    pub fn signal(&self) -> JoinHandle<bool> {
        {
            let mut ctx = lock_bridge(&self.bridge);
            let observed = ctx.observe_default_output().clone();
            debug!(
                "[Debounce] Default output changed to {}; re-checking in {:?}",
                observed, self.window
            );
        }

        let bridge = self.bridge.clone();
        let window = self.window;
        let stopped = self.stopped.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut ctx = lock_bridge(&bridge);
            // Checked under the lock; stop() is called before shutdown takes it.
            if stopped.load(Ordering::SeqCst) {
                debug!("[Debounce] Stopped; dropping pending check");
                false
            } else if ctx.bridge_is_default_output() {
                info!("[Debounce] Bridge device is the default output; relinking");
                ctx.relink();
                true
            } else {
                debug!(
                    "[Debounce] Default output is {}; no relink",
                    ctx.last_default_output
                );
                false
            }
        })
    }
}
