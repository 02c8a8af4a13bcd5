//! Platform-specific logging directory resolution.

use std::path::PathBuf;

/// Returns the platform-appropriate directory for log files.
///
/// | Platform | Directory |
/// |----------|-----------|
/// | Linux | `$XDG_STATE_HOME/volbridge/logs` or `~/.local/state/volbridge/logs` |
/// | macOS | `~/Library/Logs/volbridge` |
/// | Other | `<local data dir>/volbridge/logs` |
///
/// Returns `None` when no home directory can be determined.
pub fn log_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map(|home| home.join("Library").join("Logs").join("volbridge"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = directories::ProjectDirs::from("io", "volbridge", "volbridge")?;
        Some(
            base.state_dir()
                .map(|dir| dir.to_path_buf())
                .unwrap_or_else(|| base.data_local_dir().join("state"))
                .join("logs"),
        )
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        let base = directories::ProjectDirs::from("io", "volbridge", "volbridge")?;
        Some(base.data_local_dir().join("logs"))
    }
}

/// Ensures the log directory exists, creating it if necessary.
///
/// Returns the directory on success.
pub fn ensure_log_dir() -> Result<PathBuf, std::io::Error> {
    let dir = log_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "could not determine a log directory",
        )
    })?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// File name prefix for the daemon's rolling log files.
pub const DAEMON_LOG_PREFIX: &str = "volbridged";

/// File name suffix for rolling log files.
pub const LOG_FILE_SUFFIX: &str = "log";

/// Number of daily log files kept before the oldest is deleted.
pub const MAX_LOG_FILES: usize = 5;
