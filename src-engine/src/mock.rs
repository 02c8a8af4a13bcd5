//! In-memory collaborators for unit tests.

use std::sync::{Arc, Mutex};

use crate::device::{DeviceId, DeviceRef};
use crate::error::{BridgeError, LinkConfigError};
use crate::hotkey::{KeyEventHandler, KeyTap, RawKeyEvent, TapDisposition};
use crate::platform::{AudioEngine, AudioHal, ChangeCallback, DeviceInfo, Subscription};
use crate::report::{Report, Reporter};

#[derive(Default)]
struct HalState {
    devices: Vec<DeviceInfo>,
    default_output: DeviceId,
    fail_enumeration: bool,
    fail_default_output: bool,
    fail_subscribe: bool,
    next_subscriber: u64,
    subscribers: Vec<(u64, ChangeCallback)>,
}

/// Scriptable device list and default output.
#[derive(Default)]
pub struct MockHal {
    state: Arc<Mutex<HalState>>,
}

impl MockHal {
    pub fn with_devices(devices: &[(&str, &str)]) -> Arc<Self> {
        let hal = Self::default();
        {
            let mut state = hal.state.lock().unwrap();
            state.devices = devices
                .iter()
                .map(|(id, name)| DeviceInfo::new(*id, *name))
                .collect();
        }
        Arc::new(hal)
    }

    pub fn set_default_output(&self, id: &str) {
        self.state.lock().unwrap().default_output = DeviceId::from(id);
    }

    /// Change the default output and fire every listener.
    pub fn switch_default_output(&self, id: &str) {
        self.set_default_output(id);
        self.notify();
    }

    /// Fire every listener without changing anything.
    pub fn notify(&self) {
        let callbacks: Vec<ChangeCallback> = self
            .state
            .lock()
            .unwrap()
            .subscribers
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap().subscribers.len()
    }

    pub fn add_device(&self, id: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .devices
            .push(DeviceInfo::new(id, name));
    }

    pub fn remove_device(&self, id: &str) {
        let id = DeviceId::from(id);
        self.state.lock().unwrap().devices.retain(|d| d.id != id);
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.state.lock().unwrap().fail_enumeration = fail;
    }

    pub fn fail_default_output(&self, fail: bool) {
        self.state.lock().unwrap().fail_default_output = fail;
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.state.lock().unwrap().fail_subscribe = fail;
    }
}

impl AudioHal for MockHal {
    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, BridgeError> {
        let state = self.state.lock().unwrap();
        if state.fail_enumeration {
            return Err(BridgeError::Hal("enumeration failed".into()));
        }
        Ok(state.devices.clone())
    }

    fn default_output_device(&self) -> Result<DeviceId, BridgeError> {
        let state = self.state.lock().unwrap();
        if state.fail_default_output {
            return Err(BridgeError::Hal("default output query failed".into()));
        }
        Ok(state.default_output.clone())
    }

    fn subscribe_default_output_changed(
        &self,
        callback: ChangeCallback,
    ) -> Result<Subscription, BridgeError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_subscribe {
            return Err(BridgeError::Hal("listener registration failed".into()));
        }
        let key = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.push((key, callback));

        let shared = self.state.clone();
        Ok(Subscription::new(move || {
            shared.lock().unwrap().subscribers.retain(|(k, _)| *k != key);
        }))
    }
}

#[derive(Default)]
struct EngineLog {
    input: Option<DeviceId>,
    output: Option<DeviceId>,
    active: usize,
    max_active: usize,
    starts: usize,
    volume: Option<f32>,
    volume_at_start: Option<f32>,
    fail_next_start: Option<LinkConfigError>,
    fail_next_bind_input: Option<LinkConfigError>,
    fail_next_bind_output: Option<LinkConfigError>,
}

/// Records the link graph instead of moving audio.
#[derive(Clone, Default)]
pub struct MockEngine {
    log: Arc<Mutex<EngineLog>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> Option<DeviceId> {
        self.log.lock().unwrap().input.clone()
    }

    pub fn output(&self) -> Option<DeviceId> {
        self.log.lock().unwrap().output.clone()
    }

    pub fn active_links(&self) -> usize {
        self.log.lock().unwrap().active
    }

    /// Highest number of simultaneously running links ever observed.
    pub fn max_active_links(&self) -> usize {
        self.log.lock().unwrap().max_active
    }

    pub fn starts(&self) -> usize {
        self.log.lock().unwrap().starts
    }

    /// Last gain applied while both devices were bound.
    pub fn volume(&self) -> Option<f32> {
        self.log.lock().unwrap().volume
    }

    /// Gain in effect when the most recent link started.
    pub fn volume_at_start(&self) -> Option<f32> {
        self.log.lock().unwrap().volume_at_start
    }

    pub fn fail_next_start(&self, err: LinkConfigError) {
        self.log.lock().unwrap().fail_next_start = Some(err);
    }

    pub fn fail_next_bind_input(&self, err: LinkConfigError) {
        self.log.lock().unwrap().fail_next_bind_input = Some(err);
    }

    pub fn fail_next_bind_output(&self, err: LinkConfigError) {
        self.log.lock().unwrap().fail_next_bind_output = Some(err);
    }
}

impl AudioEngine for MockEngine {
    fn bind_input_device(&mut self, device: &DeviceRef) -> Result<(), LinkConfigError> {
        let mut log = self.log.lock().unwrap();
        if let Some(err) = log.fail_next_bind_input.take() {
            return Err(err);
        }
        log.input = Some(device.id.clone());
        Ok(())
    }

    fn bind_output_device(&mut self, device: &DeviceRef) -> Result<(), LinkConfigError> {
        let mut log = self.log.lock().unwrap();
        if let Some(err) = log.fail_next_bind_output.take() {
            return Err(err);
        }
        log.output = Some(device.id.clone());
        Ok(())
    }

    fn start_capture_forwarding(&mut self) -> Result<(), LinkConfigError> {
        let mut log = self.log.lock().unwrap();
        if let Some(err) = log.fail_next_start.take() {
            return Err(err);
        }
        if log.input.is_none() {
            return Err(LinkConfigError::NotBound("input"));
        }
        if log.output.is_none() {
            return Err(LinkConfigError::NotBound("output"));
        }
        log.starts += 1;
        log.volume_at_start = log.volume;
        log.active += 1;
        log.max_active = log.max_active.max(log.active);
        Ok(())
    }

    fn stop_all(&mut self) {
        let mut log = self.log.lock().unwrap();
        log.input = None;
        log.output = None;
        log.active = 0;
    }

    fn set_output_volume(&mut self, level: f32) {
        let mut log = self.log.lock().unwrap();
        if log.input.is_some() && log.output.is_some() {
            log.volume = Some(level);
        }
    }
}

#[derive(Default)]
struct TapState {
    handler: Option<KeyEventHandler>,
    enabled: bool,
    fail_enable: Option<String>,
}

/// Key tap driven by [`MockKeyTap::send`].
#[derive(Clone, Default)]
pub struct MockKeyTap {
    state: Arc<Mutex<TapState>>,
}

impl MockKeyTap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `enable` fail, as when Accessibility is not granted.
    pub fn fail_enable(&self, reason: &str) {
        self.state.lock().unwrap().fail_enable = Some(reason.to_string());
    }

    pub fn is_registered(&self) -> bool {
        self.state.lock().unwrap().handler.is_some()
    }

    /// Deliver an event. Disabled taps pass everything through.
    pub fn send(&self, event: RawKeyEvent) -> TapDisposition {
        let handler = {
            let state = self.state.lock().unwrap();
            match (&state.handler, state.enabled) {
                (Some(handler), true) => handler.clone(),
                _ => return TapDisposition::PassThrough,
            }
        };
        handler(event)
    }
}

impl KeyTap for MockKeyTap {
    fn register(&mut self, handler: KeyEventHandler) -> Result<(), BridgeError> {
        self.state.lock().unwrap().handler = Some(handler);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), BridgeError> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = state.fail_enable.take() {
            return Err(BridgeError::HotkeyUnavailable(reason));
        }
        if state.handler.is_none() {
            return Err(BridgeError::HotkeyUnavailable("no handler registered".into()));
        }
        state.enabled = true;
        Ok(())
    }

    fn disable(&mut self) {
        self.state.lock().unwrap().enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.state.lock().unwrap().enabled
    }
}

/// Captures reports for assertions.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    reports: Arc<Mutex<Vec<Report>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    /// Rendered report lines, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.reports().iter().map(ToString::to_string).collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, report: Report) {
        self.reports.lock().unwrap().push(report);
    }
}
