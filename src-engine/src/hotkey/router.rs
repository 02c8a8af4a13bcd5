//! Volume-key routing.
//!
//! The bridge only claims volume keys while its capture device is the system
//! default output. In every other routing the keys reach the OS untouched.

use tracing::{debug, info};

use super::backend::{KeyEventHandler, RawKeyEvent, TapDisposition};
use super::event::decode_volume_key;
use crate::report::Report;
use crate::state::{lock_bridge, BridgeContext, SharedBridge};

/// Decides, per tapped event, whether the bridge consumes it.
#[derive(Debug, Default, Clone, Copy)]
pub struct HotkeyRouter;

impl HotkeyRouter {
    pub fn new() -> Self {
        Self
    }

    /// Handle one tapped event against the bridge state.
    pub fn handle(&self, ctx: &mut BridgeContext, event: &RawKeyEvent) -> TapDisposition {
        if !ctx.bridge_is_default_output() {
            return TapDisposition::PassThrough;
        }

        let key = match decode_volume_key(event) {
            Ok(Some(key)) => key,
            Ok(None) => return TapDisposition::PassThrough,
            Err(e) => {
                debug!("[Hotkey] Passing through undecodable event: {}", e);
                return TapDisposition::PassThrough;
            }
        };

        ctx.volume.apply(key);
        ctx.apply_volume();
        info!(
            "[Hotkey] {:?}: level {:.4}{}",
            key,
            ctx.volume.level(),
            if ctx.volume.is_muted() { " (muted)" } else { "" }
        );
        ctx.reporter()
            .report(Report::volume(ctx.volume.level(), ctx.volume.is_muted()));

        TapDisposition::Consume
    }

    /// Build a key tap handler bound to `bridge`.
    pub fn into_handler(self, bridge: SharedBridge) -> KeyEventHandler {
        std::sync::Arc::new(move |event: RawKeyEvent| {
            let mut ctx = lock_bridge(&bridge);
            self.handle(&mut ctx, &event)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceId, DeviceResolver};
    use crate::hotkey::backend::SystemDefinedPayload;
    use crate::hotkey::event::{
        media_key_data1, NX_KEYTYPE_MUTE, NX_KEYTYPE_SOUND_DOWN, NX_KEYTYPE_SOUND_UP,
        NX_SUBTYPE_AUX_CONTROL_BUTTONS, NX_SYSDEFINED,
    };
    use crate::link::{LinkController, LinkState};
    use crate::mock::{MockEngine, MockHal, RecordingReporter};
    use crate::volume::VolumeState;
    use std::sync::{Arc, Mutex};

    struct Fixture {
        hal: Arc<MockHal>,
        engine: MockEngine,
        reporter: RecordingReporter,
        ctx: BridgeContext,
    }

    fn fixture(level: f32) -> Fixture {
        let hal = MockHal::with_devices(&[("41", "BlackHole 2ch"), ("57", "DELL U2723QE")]);
        let resolver = DeviceResolver::new(hal.clone(), "BlackHole", "U2723QE");
        let engine = MockEngine::new();
        let link = LinkController::new(Box::new(engine.clone()), resolver.resolve_pair().unwrap());
        let reporter = RecordingReporter::new();
        let ctx = BridgeContext::new(
            resolver,
            link,
            VolumeState::new(level, 16),
            Arc::new(reporter.clone()),
        );
        Fixture {
            hal,
            engine,
            reporter,
            ctx,
        }
    }

    fn key(code: u32) -> RawKeyEvent {
        RawKeyEvent {
            event_type: NX_SYSDEFINED,
            payload: Some(SystemDefinedPayload {
                subtype: NX_SUBTYPE_AUX_CONTROL_BUTTONS,
                data1: media_key_data1(code, true),
            }),
        }
    }

    #[test]
    fn test_volume_down_while_linked() {
        let mut f = fixture(0.5);
        f.hal.set_default_output("41");
        assert_eq!(f.ctx.relink(), LinkState::Linked);

        let disposition = HotkeyRouter::new().handle(&mut f.ctx, &key(NX_KEYTYPE_SOUND_DOWN));

        assert_eq!(disposition, TapDisposition::Consume);
        assert_eq!(f.ctx.volume.level(), 0.4375);
        assert_eq!(f.engine.volume(), Some(0.4375));
        assert_eq!(
            f.reporter.lines().last().unwrap(),
            "volume: [●●●●○○○○○○] 44%"
        );
    }

    #[test]
    fn test_never_consumes_when_bridge_not_default() {
        let mut f = fixture(0.5);
        f.hal.set_default_output("57");
        let router = HotkeyRouter::new();

        for code in 0..32 {
            assert_eq!(router.handle(&mut f.ctx, &key(code)), TapDisposition::PassThrough);
        }
        assert_eq!(f.ctx.volume.level(), 0.5);
        assert!(f.reporter.lines().is_empty());
        assert_eq!(f.ctx.last_default_output, DeviceId::from(57));
    }

    #[test]
    fn test_unknown_default_output_passes_through() {
        let mut f = fixture(0.5);
        f.hal.set_default_output("41");
        f.hal.fail_default_output(true);
        assert_eq!(
            HotkeyRouter::new().handle(&mut f.ctx, &key(NX_KEYTYPE_SOUND_UP)),
            TapDisposition::PassThrough
        );
    }

    #[test]
    fn test_unhandled_keys_pass_through_when_default() {
        let mut f = fixture(0.5);
        f.hal.set_default_output("41");
        let router = HotkeyRouter::new();

        // NX_KEYTYPE_BRIGHTNESS_DOWN
        assert_eq!(router.handle(&mut f.ctx, &key(3)), TapDisposition::PassThrough);

        let malformed = RawKeyEvent {
            event_type: NX_SYSDEFINED,
            payload: None,
        };
        assert_eq!(router.handle(&mut f.ctx, &malformed), TapDisposition::PassThrough);

        let key_up = RawKeyEvent {
            event_type: NX_SYSDEFINED,
            payload: Some(SystemDefinedPayload {
                subtype: NX_SUBTYPE_AUX_CONTROL_BUTTONS,
                data1: media_key_data1(NX_KEYTYPE_SOUND_UP, false),
            }),
        };
        assert_eq!(router.handle(&mut f.ctx, &key_up), TapDisposition::PassThrough);
        assert_eq!(f.ctx.volume.level(), 0.5);
    }

    #[test]
    fn test_keys_consumed_while_not_linked_update_volume_only() {
        let mut f = fixture(0.5);
        f.hal.set_default_output("41");

        assert_eq!(
            HotkeyRouter::new().handle(&mut f.ctx, &key(NX_KEYTYPE_SOUND_UP)),
            TapDisposition::Consume
        );
        assert_eq!(f.ctx.volume.level(), 0.5625);
        assert_eq!(f.engine.volume(), None);

        f.ctx.relink();
        assert_eq!(f.engine.volume(), Some(0.5625));
    }

    #[test]
    fn test_mute_toggle_round_trip_on_link() {
        let mut f = fixture(0.5);
        f.hal.set_default_output("41");
        f.ctx.relink();
        let router = HotkeyRouter::new();

        router.handle(&mut f.ctx, &key(NX_KEYTYPE_MUTE));
        assert_eq!(f.engine.volume(), Some(0.0));
        assert_eq!(f.reporter.lines().last().unwrap(), "volume: [○○○○○○○○○○] 0%");

        router.handle(&mut f.ctx, &key(NX_KEYTYPE_MUTE));
        assert_eq!(f.engine.volume(), Some(0.5));
        assert_eq!(f.ctx.volume.level(), 0.5);
    }

    #[test]
    fn test_handler_locks_shared_bridge() {
        let f = fixture(1.0);
        f.hal.set_default_output("41");
        let bridge = Arc::new(Mutex::new(f.ctx));
        let handler = HotkeyRouter::new().into_handler(bridge.clone());

        assert_eq!(handler(key(NX_KEYTYPE_SOUND_UP)), TapDisposition::Consume);
        assert_eq!(lock_bridge(&bridge).volume.level(), 1.0);
    }
}
