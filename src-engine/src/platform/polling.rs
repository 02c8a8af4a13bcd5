//! cpal hardware layer for hosts without change notifications.
//!
//! Device ids are the cpal device names. Default-output changes are detected
//! by a watcher thread that polls the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait};
use tracing::{debug, info};

use super::backend::{AudioHal, ChangeCallback, DeviceInfo, Subscription};
use crate::device::DeviceId;
use crate::error::BridgeError;

/// Interval between default-output polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// [`AudioHal`] backed by the default cpal host.
#[derive(Debug, Default)]
pub struct PollingHal;

impl PollingHal {
    pub fn new() -> Self {
        Self
    }
}

fn default_output_name(host: &cpal::Host) -> DeviceId {
    host.default_output_device()
        .and_then(|d| d.name().ok())
        .map(DeviceId::from)
        .unwrap_or_else(DeviceId::unknown)
}

impl AudioHal for PollingHal {
    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, BridgeError> {
        let host = cpal::default_host();
        let devices = host
            .devices()
            .map_err(|e| BridgeError::Hal(format!("failed to list audio devices: {}", e)))?;

        Ok(devices
            .filter_map(|d| d.name().ok())
            .map(|name| DeviceInfo::new(name.clone(), name))
            .collect())
    }

    fn default_output_device(&self) -> Result<DeviceId, BridgeError> {
        Ok(default_output_name(&cpal::default_host()))
    }

    fn subscribe_default_output_changed(
        &self,
        callback: ChangeCallback,
    ) -> Result<Subscription, BridgeError> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let handle = thread::Builder::new()
            .name("volbridge-hal-poll".to_string())
            .spawn(move || {
                let host = cpal::default_host();
                let mut last = default_output_name(&host);
                debug!("[HAL] Polling default output (initially {})", last);

                while !thread_stop.load(Ordering::SeqCst) {
                    thread::sleep(POLL_INTERVAL);
                    let current = default_output_name(&host);
                    if current != last {
                        info!("[HAL] Default output changed: {} -> {}", last, current);
                        last = current;
                        callback();
                    }
                }
            })
            .map_err(|e| BridgeError::Hal(format!("failed to spawn poll thread: {}", e)))?;

        Ok(Subscription::new(move || {
            stop.store(true, Ordering::SeqCst);
            let _ = handle.join();
            debug!("[HAL] Stopped polling default output");
        }))
    }
}
