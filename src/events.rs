use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// A classified button interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Ready,
    SinglePress,
    DoublePress,
    LongPress,
    ResetPress,
    HeldPress,
}

impl Gesture {
    pub fn label(self) -> &'static str {
        match self {
            Gesture::Ready => "ready",
            Gesture::SinglePress => "single-press",
            Gesture::DoublePress => "double-press",
            Gesture::LongPress => "long-press",
            Gesture::ResetPress => "reset-press",
            Gesture::HeldPress => "held-press",
        }
    }
}

/// Emitted by the button task; `channel` names the originating input device.
#[derive(Debug, Clone)]
pub enum ButtonEvent {
    Gesture { channel: String, gesture: Gesture },
    Fault { channel: String, message: String },
}

fn default_advance() -> bool {
    true
}

/// Commands accepted by the display supervisor.
///
/// The same type is the wire format of the control socket, one JSON object
/// per line, e.g. `{"command":"next-image"}` or
/// `{"command":"toggle-slideshow","interval":"30s"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ControlCommand {
    Start,
    Stop,
    NextImage,
    PrevImage,
    ZoomIn,
    ZoomOut,
    ToggleInfo,
    ToggleVerbose,
    Digit {
        value: u8,
    },
    Confirm,
    /// Jump to the 1-based image number, typed digit by digit.
    GoToImage {
        number: usize,
    },
    RandomImage,
    Sync,
    StartSlideshow {
        #[serde(default, with = "humantime_serde")]
        interval: Option<Duration>,
        #[serde(default = "default_advance")]
        advance: bool,
    },
    StopSlideshow,
    ToggleSlideshow {
        #[serde(default, with = "humantime_serde")]
        interval: Option<Duration>,
        #[serde(default = "default_advance")]
        advance: bool,
    },
    /// Raw button identifier from an external collaborator (IR remote,
    /// CLI); resolved through the router before it reaches the supervisor.
    Button {
        name: String,
    },
    ShowNewImages {
        paths: Vec<PathBuf>,
    },
}
