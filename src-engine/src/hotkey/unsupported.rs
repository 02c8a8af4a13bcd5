//! Key tap stub for platforms without global media-key interception.
//!
//! The bridge itself only exists on macOS; this keeps the daemon buildable
//! elsewhere, where the volume keys simply never reach it.

use super::backend::{KeyEventHandler, KeyTap};
use crate::error::BridgeError;

/// Key tap that can never be enabled.
pub struct UnsupportedKeyTap {
    handler: Option<KeyEventHandler>,
}

impl UnsupportedKeyTap {
    pub fn new() -> Self {
        Self { handler: None }
    }
}

impl KeyTap for UnsupportedKeyTap {
    fn register(&mut self, handler: KeyEventHandler) -> Result<(), BridgeError> {
        self.handler = Some(handler);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), BridgeError> {
        Err(BridgeError::HotkeyUnavailable(format!(
            "volume key interception is not available on {}",
            std::env::consts::OS
        )))
    }

    fn disable(&mut self) {
        // No-op for stub
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::TapDisposition;
    use std::sync::Arc;

    #[test]
    fn test_enable_reports_unavailable() {
        let mut tap = UnsupportedKeyTap::new();
        tap.register(Arc::new(|_| TapDisposition::PassThrough))
            .unwrap();
        assert!(matches!(
            tap.enable(),
            Err(BridgeError::HotkeyUnavailable(_))
        ));
        assert!(!tap.is_enabled());
    }
}
