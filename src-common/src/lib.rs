//! volbridge Common Library
//!
//! Configuration model, platform paths and runtime-mode detection shared by the
//! bridge engine, the daemon and the diagnostic tools.

use std::sync::OnceLock;

pub mod config;
pub mod logging;
pub mod types;

pub use config::Config;
pub use types::*;

static RUNTIME_MODE: OnceLock<RuntimeMode> = OnceLock::new();

pub fn runtime_mode() -> RuntimeMode {
    *RUNTIME_MODE.get_or_init(detect_runtime_mode)
}

fn detect_runtime_mode() -> RuntimeMode {
    if let Ok(mode) = std::env::var("VOLBRIDGE_RUNTIME_MODE") {
        if let Some(mode) = RuntimeMode::parse(&mode) {
            return mode;
        }
    }

    if let Ok(exe_path) = std::env::current_exe() {
        let path_str = exe_path.to_string_lossy();
        if path_str.contains("/target/debug/") || path_str.contains("\\target\\debug\\") {
            return RuntimeMode::Development;
        }
    }

    RuntimeMode::Production
}
