//! cpal-backed capture -> playback engine.
//!
//! Devices are bound by their exact platform name (the name the resolver
//! matched). cpal exposes no stable device id, so two devices sharing a name
//! are indistinguishable here; the first one the host lists wins and a
//! warning is logged. Capture runs at the device's default f32 format;
//! playback is opened at the same sample rate, so no resampling happens on
//! the way.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use tracing::{debug, error, info, warn};

use super::backend::AudioEngine;
use super::forward::{forwarding_queue, ForwardStats, Gain};
use crate::device::DeviceRef;
use crate::error::LinkConfigError;

/// Forwarding queue depth in milliseconds of capture audio.
const QUEUE_MS: u32 = 200;

struct BoundDevice {
    device: cpal::Device,
    name: String,
}

/// Both streams of a running link.
struct RunningLink {
    _input: cpal::Stream,
    _output: cpal::Stream,
    stats: Arc<ForwardStats>,
}

// SAFETY: cpal::Stream is !Send only because some backends keep
// thread-affine handles. The streams are created, held and dropped behind the
// bridge mutex and never used concurrently; CoreAudio stream handles may be
// released from any thread.
unsafe impl Send for RunningLink {}

/// Audio engine built on cpal streams and a lock-free forwarding queue.
pub struct CpalEngine {
    host: cpal::Host,
    input: Option<BoundDevice>,
    output: Option<BoundDevice>,
    running: Option<RunningLink>,
    gain: Arc<Gain>,
}

impl CpalEngine {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
            input: None,
            output: None,
            running: None,
            // Silent until the link controller applies the stored level.
            gain: Arc::new(Gain::new(0.0)),
        }
    }

    fn find_device(&self, name: &str, input: bool) -> Result<cpal::Device, LinkConfigError> {
        let devices: Vec<cpal::Device> = if input {
            self.host.input_devices().map(|d| d.collect())
        } else {
            self.host.output_devices().map(|d| d.collect())
        }
        .map_err(|e| LinkConfigError::backend(format!("device enumeration failed: {}", e)))?;

        let role = if input { "capture" } else { "playback" };
        let named = devices
            .into_iter()
            .filter_map(|d| d.name().ok().map(|n| (d, n)))
            .collect();

        select_named(named, name, role).ok_or_else(|| LinkConfigError::DeviceUnavailable {
            device: name.to_string(),
            reason: format!("no {} stream available", role),
        })
    }

    fn output_config(
        output: &BoundDevice,
        sample_rate: SampleRate,
        preferred_channels: u16,
    ) -> Result<StreamConfig, LinkConfigError> {
        let ranges = output
            .device
            .supported_output_configs()
            .map_err(|e| stream_config_error(&output.name, e))?;

        let mut candidates: Vec<_> = ranges
            .filter(|r| r.sample_format() == SampleFormat::F32)
            .filter(|r| r.min_sample_rate() <= sample_rate && sample_rate <= r.max_sample_rate())
            .collect();

        // Prefer the capture channel count, then the widest layout.
        candidates.sort_by_key(|r| (r.channels() != preferred_channels, u16::MAX - r.channels()));

        candidates
            .into_iter()
            .next()
            .map(|r| r.with_sample_rate(sample_rate).config())
            .ok_or_else(|| LinkConfigError::FormatMismatch {
                reason: format!(
                    "{} has no f32 playback format at {} Hz",
                    output.name, sample_rate.0
                ),
            })
    }
}

impl Default for CpalEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for CpalEngine {
    fn bind_input_device(&mut self, device: &DeviceRef) -> Result<(), LinkConfigError> {
        let found = self.find_device(&device.name, true)?;
        debug!("[Engine] Bound capture device {}", device);
        self.input = Some(BoundDevice {
            device: found,
            name: device.name.clone(),
        });
        Ok(())
    }

    fn bind_output_device(&mut self, device: &DeviceRef) -> Result<(), LinkConfigError> {
        let found = self.find_device(&device.name, false)?;
        debug!("[Engine] Bound playback device {}", device);
        self.output = Some(BoundDevice {
            device: found,
            name: device.name.clone(),
        });
        Ok(())
    }

    fn start_capture_forwarding(&mut self) -> Result<(), LinkConfigError> {
        let input = self.input.as_ref().ok_or(LinkConfigError::NotBound("input"))?;
        let output = self.output.as_ref().ok_or(LinkConfigError::NotBound("output"))?;

        let supported = input
            .device
            .default_input_config()
            .map_err(|e| match e {
                cpal::DefaultStreamConfigError::StreamTypeNotSupported => {
                    LinkConfigError::FormatMismatch {
                        reason: format!("{}: {}", input.name, e),
                    }
                }
                cpal::DefaultStreamConfigError::DeviceNotAvailable => {
                    LinkConfigError::DeviceUnavailable {
                        device: input.name.clone(),
                        reason: e.to_string(),
                    }
                }
                other => backend_error(&input.name, &other),
            })?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(LinkConfigError::FormatMismatch {
                reason: format!(
                    "{} captures {:?}, expected f32",
                    input.name,
                    supported.sample_format()
                ),
            });
        }
        let input_config: StreamConfig = supported.config();
        let output_config =
            Self::output_config(output, input_config.sample_rate, input_config.channels)?;

        let capacity = (input_config.sample_rate.0 * QUEUE_MS / 1000) as usize;
        let (mut producer, mut consumer, stats) = forwarding_queue(
            capacity,
            input_config.channels,
            output_config.channels,
            self.gain.clone(),
        );

        let input_name = input.name.clone();
        let input_stream = input
            .device
            .build_input_stream(
                &input_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    producer.push_interleaved(data);
                },
                move |err| error!("[Engine] Capture stream error on {}: {}", input_name, err),
                None,
            )
            .map_err(|e| build_error(&input.name, e))?;

        let output_name = output.name.clone();
        let output_stream = output
            .device
            .build_output_stream(
                &output_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    consumer.fill_interleaved(data);
                },
                move |err| error!("[Engine] Playback stream error on {}: {}", output_name, err),
                None,
            )
            .map_err(|e| build_error(&output.name, e))?;

        output_stream
            .play()
            .map_err(|e| backend_error(&output.name, &e))?;
        input_stream
            .play()
            .map_err(|e| backend_error(&input.name, &e))?;

        info!(
            "[Engine] Forwarding {} ({} ch) -> {} ({} ch) at {} Hz",
            input.name,
            input_config.channels,
            output.name,
            output_config.channels,
            input_config.sample_rate.0
        );

        self.running = Some(RunningLink {
            _input: input_stream,
            _output: output_stream,
            stats,
        });
        Ok(())
    }

    fn stop_all(&mut self) {
        if let Some(link) = self.running.take() {
            debug!(
                "[Engine] Stopping link ({} frames dropped, {} underrun)",
                link.stats.dropped_frames.load(Ordering::Relaxed),
                link.stats.underrun_frames.load(Ordering::Relaxed)
            );
        }
        self.input = None;
        self.output = None;
    }

    fn set_output_volume(&mut self, level: f32) {
        self.gain.set(level);
    }
}

fn build_error(device: &str, err: cpal::BuildStreamError) -> LinkConfigError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => LinkConfigError::DeviceUnavailable {
            device: device.to_string(),
            reason: err.to_string(),
        },
        cpal::BuildStreamError::StreamConfigNotSupported => LinkConfigError::FormatMismatch {
            reason: format!("{}: {}", device, err),
        },
        other => backend_error(device, &other),
    }
}

fn stream_config_error(device: &str, err: cpal::SupportedStreamConfigsError) -> LinkConfigError {
    match err {
        cpal::SupportedStreamConfigsError::DeviceNotAvailable => {
            LinkConfigError::DeviceUnavailable {
                device: device.to_string(),
                reason: err.to_string(),
            }
        }
        other => backend_error(device, &other),
    }
}

/// Pick the first device whose name equals `name`.
fn select_named<T>(candidates: Vec<(T, String)>, name: &str, role: &str) -> Option<T> {
    let mut matches = candidates.into_iter().filter(|(_, n)| n == name);
    let first = matches.next().map(|(device, _)| device)?;
    let extra = matches.count();
    if extra > 0 {
        warn!(
            "[Engine] {} more {} device(s) also named {:?}; using the first",
            extra, role, name
        );
    }
    Some(first)
}

/// Map an opaque backend failure, singling out access refusals.
fn backend_error(device: &str, err: &dyn std::fmt::Display) -> LinkConfigError {
    let detail = err.to_string();
    let lower = detail.to_lowercase();
    let refused = ["permission", "not permitted", "denied", "not authorized", "unauthorized"]
        .iter()
        .any(|needle| lower.contains(needle));
    if refused {
        LinkConfigError::PermissionDenied {
            device: device.to_string(),
        }
    } else {
        LinkConfigError::backend(format!("{}: {}", device, detail))
    }
}
