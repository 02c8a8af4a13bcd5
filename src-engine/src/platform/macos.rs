//! CoreAudio hardware layer.
//!
//! Device ids are `AudioDeviceID`s rendered as decimal strings. Default-output
//! changes come from an `AudioObjectPropertyListener` on the system object.

use std::ffi::c_void;
use std::mem;
use std::ptr;

use coreaudio::audio_unit::macos_helpers::{get_audio_device_ids, get_device_name};
use coreaudio::sys::{
    kAudioHardwarePropertyDefaultOutputDevice, kAudioObjectPropertyElementMaster,
    kAudioObjectPropertyScopeGlobal, kAudioObjectSystemObject, AudioDeviceID,
    AudioObjectAddPropertyListener, AudioObjectGetPropertyData, AudioObjectID,
    AudioObjectPropertyAddress, AudioObjectRemovePropertyListener, OSStatus,
};
use tracing::{debug, warn};

use super::backend::{AudioHal, ChangeCallback, DeviceInfo, Subscription};
use crate::device::DeviceId;
use crate::error::BridgeError;

const DEFAULT_OUTPUT_ADDRESS: AudioObjectPropertyAddress = AudioObjectPropertyAddress {
    mSelector: kAudioHardwarePropertyDefaultOutputDevice,
    mScope: kAudioObjectPropertyScopeGlobal,
    mElement: kAudioObjectPropertyElementMaster,
};

/// [`AudioHal`] backed by the CoreAudio HAL.
#[derive(Debug, Default)]
pub struct CoreAudioHal;

impl CoreAudioHal {
    pub fn new() -> Self {
        Self
    }
}

impl AudioHal for CoreAudioHal {
    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, BridgeError> {
        let ids = get_audio_device_ids()
            .map_err(|e| BridgeError::Hal(format!("failed to list audio devices: {}", e)))?;

        let mut devices = Vec::with_capacity(ids.len());
        for id in ids {
            match get_device_name(id) {
                Ok(name) => devices.push(DeviceInfo::new(id, name)),
                Err(e) => debug!("[HAL] Skipping device {} without a name: {}", id, e),
            }
        }
        Ok(devices)
    }

    fn default_output_device(&self) -> Result<DeviceId, BridgeError> {
        let mut device_id: AudioDeviceID = 0;
        let mut size = mem::size_of::<AudioDeviceID>() as u32;

        let status = unsafe {
            AudioObjectGetPropertyData(
                kAudioObjectSystemObject,
                &DEFAULT_OUTPUT_ADDRESS as *const _,
                0,
                ptr::null(),
                &mut size as *mut _,
                &mut device_id as *mut _ as *mut _,
            )
        };

        if status != 0 {
            return Err(BridgeError::Hal(format!(
                "failed to get default output device: OSStatus {}",
                status
            )));
        }
        if device_id == 0 {
            return Ok(DeviceId::unknown());
        }
        Ok(DeviceId::from(device_id))
    }

    fn subscribe_default_output_changed(
        &self,
        callback: ChangeCallback,
    ) -> Result<Subscription, BridgeError> {
        let client_data = Box::into_raw(Box::new(callback));

        let status = unsafe {
            AudioObjectAddPropertyListener(
                kAudioObjectSystemObject,
                &DEFAULT_OUTPUT_ADDRESS,
                Some(default_output_listener),
                client_data as *mut c_void,
            )
        };

        if status != 0 {
            drop(unsafe { Box::from_raw(client_data) });
            return Err(BridgeError::Hal(format!(
                "failed to register default output listener: OSStatus {}",
                status
            )));
        }
        debug!("[HAL] Registered default output listener");

        // Raw pointers are not Send; carry the address instead.
        let client_addr = client_data as usize;
        Ok(Subscription::new(move || {
            let client_data = client_addr as *mut ChangeCallback;
            let status = unsafe {
                AudioObjectRemovePropertyListener(
                    kAudioObjectSystemObject,
                    &DEFAULT_OUTPUT_ADDRESS,
                    Some(default_output_listener),
                    client_data as *mut c_void,
                )
            };
            if status != 0 {
                // CoreAudio may still call in; leak the callback rather than free it.
                warn!(
                    "[HAL] Failed to remove default output listener: OSStatus {}",
                    status
                );
                return;
            }
            drop(unsafe { Box::from_raw(client_data) });
            debug!("[HAL] Removed default output listener");
        }))
    }
}

unsafe extern "C" fn default_output_listener(
    _object_id: AudioObjectID,
    _num_addresses: u32,
    _addresses: *const AudioObjectPropertyAddress,
    client_data: *mut c_void,
) -> OSStatus {
    if client_data.is_null() {
        return 0;
    }
    let callback = &*(client_data as *const ChangeCallback);
    callback();
    0
}
