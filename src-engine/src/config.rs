//! Configuration loading for the bridge daemon.
//!
//! This module re-exports the shared Config from volbridge-common and adds
//! daemon-side logging via tracing. The file is read-only input.

pub use volbridge_common::config::Config;

use std::path::Path;

use tracing::{info, warn};

/// Load configuration from the default location with tracing output.
pub fn load_config() -> Config {
    load_config_from(&Config::config_path())
}

/// Load configuration from `path`, falling back to defaults.
///
/// A missing file is normal; an unreadable or invalid one is logged and
/// ignored.
pub fn load_config_from(path: &Path) -> Config {
    let config = match Config::load_from(path) {
        Ok(Some(config)) => {
            info!("Loaded config from {:?}", path);
            config
        }
        Ok(None) => {
            info!("No config at {:?}; using defaults", path);
            Config::default()
        }
        Err(e) => {
            warn!("Ignoring config at {:?}: {}", path, e);
            Config::default()
        }
    };
    config.normalized()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("volbridge-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = load_config_from(&temp_path("missing"));
        assert_eq!(config.capture_device, "BlackHole");
        assert_eq!(config.playback_device, "U2723QE");
        assert_eq!(config.debounce_ms, 500);
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let path = temp_path("invalid");
        std::fs::write(&path, "{ not json").unwrap();
        let config = load_config_from(&path);
        let _ = std::fs::remove_file(&path);
        assert_eq!(config.initial_volume, 0.5);
    }

    #[test]
    fn test_partial_file_is_normalized() {
        let path = temp_path("partial");
        let json = serde_json::json!({ "playback_device": "Studio", "initial_volume": 3.0 });
        std::fs::write(&path, json.to_string()).unwrap();
        let config = load_config_from(&path);
        let _ = std::fs::remove_file(&path);

        assert_eq!(config.playback_device, "Studio");
        assert_eq!(config.capture_device, "BlackHole");
        assert_eq!(config.initial_volume, 1.0);
    }
}
