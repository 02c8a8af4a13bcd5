//! Shared types for volbridge.

use serde::{Deserialize, Serialize};

/// Runtime mode - determines default log verbosity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    /// Development mode - verbose logging
    Development,
    /// Production mode
    #[default]
    Production,
}

impl RuntimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeMode::Development => "development",
            RuntimeMode::Production => "production",
        }
    }

    /// Parse a mode name as accepted in `VOLBRIDGE_RUNTIME_MODE`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "development" | "dev" => Some(RuntimeMode::Development),
            "production" | "prod" => Some(RuntimeMode::Production),
            _ => None,
        }
    }

    /// Default `tracing` filter directive for this mode.
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            RuntimeMode::Development => "debug",
            RuntimeMode::Production => "info",
        }
    }
}
