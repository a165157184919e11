//! Stateless mapping from gestures and remote button identifiers onto
//! supervisor commands.

use tracing::warn;

use crate::events::{ControlCommand, Gesture};

/// Maps a classified button gesture to a supervisor command.
///
/// `Ready` and `HeldPress` are progress markers, not commands; they are
/// logged by the caller and dropped here.
pub fn route_gesture(gesture: Gesture) -> Option<ControlCommand> {
    match gesture {
        Gesture::SinglePress => Some(ControlCommand::NextImage),
        Gesture::DoublePress => Some(ControlCommand::RandomImage),
        Gesture::LongPress => Some(ControlCommand::ToggleSlideshow {
            interval: None,
            advance: true,
        }),
        Gesture::ResetPress => Some(ControlCommand::Start),
        Gesture::Ready | Gesture::HeldPress => None,
    }
}

/// Maps a raw remote button identifier to a supervisor command.
///
/// Numeric buttons feed the goto-image digit buffer; an identifier with
/// no mapping is dropped with a warning instead of being forwarded as a
/// blind keystroke.
pub fn route_button(name: &str) -> Option<ControlCommand> {
    if let Some(value) = digit_name(name) {
        return Some(ControlCommand::Digit { value });
    }
    let command = match name {
        "BTN_RIGHT" => ControlCommand::NextImage,
        "BTN_LEFT" => ControlCommand::PrevImage,
        "BTN_UP" => ControlCommand::ZoomIn,
        "BTN_DOWN" => ControlCommand::ZoomOut,
        "BTN_SETUP" => ControlCommand::ToggleVerbose,
        "BTN_STOP" => ControlCommand::ToggleInfo,
        "BTN_PLAYPAUSE" => ControlCommand::ToggleSlideshow {
            interval: None,
            advance: true,
        },
        "BTN_ENTER" | "KEY_OK" => ControlCommand::Confirm,
        _ => {
            warn!(button = name, "unmapped button identifier");
            return None;
        }
    };
    Some(command)
}

/// Extracts the digit from identifiers like `BTN_4` or `KEY_4`.
fn digit_name(name: &str) -> Option<u8> {
    let tail = name
        .strip_prefix("BTN_")
        .or_else(|| name.strip_prefix("KEY_"))?;
    match tail.as_bytes() {
        [byte] if byte.is_ascii_digit() => Some(byte - b'0'),
        _ => None,
    }
}
