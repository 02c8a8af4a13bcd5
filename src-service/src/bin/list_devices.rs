//! List the audio devices the daemon can see.
//!
//! Marks the current default output and the devices the configured capture
//! and playback names resolve to.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use volbridge_engine::device::name_matches;
use volbridge_engine::platform::create_hal;
use volbridge_engine::{load_config, DeviceResolver};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config();
    let hal = create_hal();

    let devices = match hal.enumerate_devices() {
        Ok(devices) => devices,
        Err(e) => {
            eprintln!("Failed to list audio devices: {}", e);
            return ExitCode::from(1);
        }
    };

    let resolver = DeviceResolver::new(
        hal.clone(),
        config.capture_device.clone(),
        config.playback_device.clone(),
    );
    let default_output = resolver.current_default_output();
    let capture = resolver.resolve(&config.capture_device).ok();
    let playback = resolver.resolve(&config.playback_device).ok();

    println!("Audio devices ({}):", devices.len());
    for device in &devices {
        let mut tags = Vec::new();
        if device.id == default_output {
            tags.push("default output".to_string());
        }
        if capture.as_ref().is_some_and(|c| c.id == device.id) {
            tags.push(format!("capture ({:?})", config.capture_device));
        } else if name_matches(&device.name, &config.capture_device) {
            tags.push(format!("also matches {:?}", config.capture_device));
        }
        if playback.as_ref().is_some_and(|p| p.id == device.id) {
            tags.push(format!("playback ({:?})", config.playback_device));
        } else if name_matches(&device.name, &config.playback_device) {
            tags.push(format!("also matches {:?}", config.playback_device));
        }

        if tags.is_empty() {
            println!("  {:>8}  {}", device.id.to_string(), device.name);
        } else {
            println!(
                "  {:>8}  {}  [{}]",
                device.id.to_string(),
                device.name,
                tags.join(", ")
            );
        }
    }

    if capture.is_none() || playback.is_none() {
        println!();
        for (role, name, found) in [
            ("capture", &config.capture_device, capture.is_some()),
            ("playback", &config.playback_device, playback.is_some()),
        ] {
            if !found {
                println!("No {} device matches {:?}", role, name);
            }
        }
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
