//! Decoding of system-defined media key events.
//!
//! Volume keys arrive as `NX_SYSDEFINED` events with the aux-control-buttons
//! subtype. `data1` packs the key code in bits 16..32 and the key flags in the
//! low 16 bits, whose high byte is the key state (`0x0A` down, `0x0B` up).

use super::backend::RawKeyEvent;
use crate::error::BridgeError;
use crate::volume::VolumeKey;

/// `CGEventType` / `NSEventType` of system-defined events.
pub const NX_SYSDEFINED: u32 = 14;
/// `NSEvent` subtype carrying media key presses.
pub const NX_SUBTYPE_AUX_CONTROL_BUTTONS: i16 = 8;

pub const NX_KEYTYPE_SOUND_UP: u32 = 0;
pub const NX_KEYTYPE_SOUND_DOWN: u32 = 1;
pub const NX_KEYTYPE_MUTE: u32 = 7;
/// Also toggles mute.
pub const NX_KEYTYPE_PLAY: u32 = 16;

const KEY_STATE_DOWN: i64 = 0x0A;

/// Build the `data1` value of a media key event.
pub fn media_key_data1(key_code: u32, key_down: bool) -> i64 {
    let state = if key_down { KEY_STATE_DOWN } else { 0x0B };
    ((key_code as i64) << 16) | (state << 8)
}

/// Decode a tapped event into a volume key press.
///
/// Returns `Ok(None)` for events the bridge does not handle (other event
/// types, other subtypes, key-up, other key codes) and an
/// [`BridgeError::EventDecode`] for system-defined events whose payload is
/// missing or out of range.
pub fn decode_volume_key(event: &RawKeyEvent) -> Result<Option<VolumeKey>, BridgeError> {
    if event.event_type != NX_SYSDEFINED {
        return Ok(None);
    }

    let payload = event
        .payload
        .ok_or_else(|| BridgeError::event_decode("system-defined event without payload"))?;

    if payload.subtype != NX_SUBTYPE_AUX_CONTROL_BUTTONS {
        return Ok(None);
    }

    if !(0..=u32::MAX as i64).contains(&payload.data1) {
        return Err(BridgeError::event_decode(format!(
            "data1 {:#x} outside 32 bits",
            payload.data1
        )));
    }

    let data1 = payload.data1;
    let key_code = ((data1 & 0xFFFF_0000) >> 16) as u32;
    let key_flags = data1 & 0x0000_FFFF;
    let key_state = (key_flags & 0xFF00) >> 8;

    if key_state != KEY_STATE_DOWN {
        return Ok(None);
    }

    Ok(match key_code {
        NX_KEYTYPE_SOUND_UP => Some(VolumeKey::Up),
        NX_KEYTYPE_SOUND_DOWN => Some(VolumeKey::Down),
        NX_KEYTYPE_MUTE | NX_KEYTYPE_PLAY => Some(VolumeKey::Mute),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::backend::SystemDefinedPayload;

    fn media_event(key_code: u32, key_down: bool) -> RawKeyEvent {
        RawKeyEvent {
            event_type: NX_SYSDEFINED,
            payload: Some(SystemDefinedPayload {
                subtype: NX_SUBTYPE_AUX_CONTROL_BUTTONS,
                data1: media_key_data1(key_code, key_down),
            }),
        }
    }

    #[test]
    fn test_decodes_volume_keys() {
        assert_eq!(
            decode_volume_key(&media_event(NX_KEYTYPE_SOUND_UP, true)).unwrap(),
            Some(VolumeKey::Up)
        );
        assert_eq!(
            decode_volume_key(&media_event(NX_KEYTYPE_SOUND_DOWN, true)).unwrap(),
            Some(VolumeKey::Down)
        );
        assert_eq!(
            decode_volume_key(&media_event(NX_KEYTYPE_MUTE, true)).unwrap(),
            Some(VolumeKey::Mute)
        );
        assert_eq!(
            decode_volume_key(&media_event(NX_KEYTYPE_PLAY, true)).unwrap(),
            Some(VolumeKey::Mute)
        );
    }

    #[test]
    fn test_key_up_is_ignored() {
        assert_eq!(
            decode_volume_key(&media_event(NX_KEYTYPE_SOUND_UP, false)).unwrap(),
            None
        );
    }

    #[test]
    fn test_other_media_keys_are_ignored() {
        // NX_KEYTYPE_BRIGHTNESS_UP
        assert_eq!(decode_volume_key(&media_event(2, true)).unwrap(), None);
        // NX_KEYTYPE_NEXT
        assert_eq!(decode_volume_key(&media_event(17, true)).unwrap(), None);
    }

    #[test]
    fn test_non_system_events_are_ignored() {
        let key_down = RawKeyEvent {
            event_type: 10,
            payload: None,
        };
        assert_eq!(decode_volume_key(&key_down).unwrap(), None);
    }

    #[test]
    fn test_other_subtypes_are_ignored() {
        let mut event = media_event(NX_KEYTYPE_SOUND_UP, true);
        event.payload = event.payload.map(|p| SystemDefinedPayload { subtype: 0, ..p });
        assert_eq!(decode_volume_key(&event).unwrap(), None);
    }

    #[test]
    fn test_malformed_payloads_are_errors() {
        let missing = RawKeyEvent {
            event_type: NX_SYSDEFINED,
            payload: None,
        };
        assert!(matches!(
            decode_volume_key(&missing),
            Err(BridgeError::EventDecode { .. })
        ));

        let negative = RawKeyEvent {
            event_type: NX_SYSDEFINED,
            payload: Some(SystemDefinedPayload {
                subtype: NX_SUBTYPE_AUX_CONTROL_BUTTONS,
                data1: -1,
            }),
        };
        assert!(matches!(
            decode_volume_key(&negative),
            Err(BridgeError::EventDecode { .. })
        ));
    }
}
