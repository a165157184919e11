use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::gesture::{GestureWindows, Polarity};

pub const DEFAULT_CONTROL_SOCKET_PATH: &str = "/run/frame-control/control.sock";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Root directory to scan recursively for images.
    pub photo_library_path: PathBuf,
    /// Settle time before newly copied-in images are announced to the viewer.
    #[serde(with = "humantime_serde")]
    pub library_debounce: Duration,
    /// Physical button input.
    pub button: ButtonConfig,
    /// External framebuffer viewer launch parameters.
    pub viewer: ViewerConfig,
    /// Automatic advance timing.
    pub slideshow: SlideshowConfig,
    /// Viewer liveness supervision.
    pub watchdog: WatchdogConfig,
    /// Runtime command socket.
    pub control: ControlConfig,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.photo_library_path.as_os_str().is_empty(),
            "photo-library-path must not be empty"
        );
        ensure!(
            self.library_debounce > Duration::ZERO,
            "library-debounce must be greater than zero"
        );
        self.button
            .validate()
            .context("invalid button configuration")?;
        self.viewer
            .validate()
            .context("invalid viewer configuration")?;
        self.slideshow
            .validate()
            .context("invalid slideshow configuration")?;
        self.watchdog
            .validate()
            .context("invalid watchdog configuration")?;
        self.control
            .validate()
            .context("invalid control configuration")?;
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: PathBuf::new(),
            library_debounce: Duration::from_secs(2),
            button: ButtonConfig::default(),
            viewer: ViewerConfig::default(),
            slideshow: SlideshowConfig::default(),
            watchdog: WatchdogConfig::default(),
            control: ControlConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ButtonConfig {
    /// Whether the physical button listener runs at all.
    pub enabled: bool,
    /// Input device to read; auto-detected by key capability when unset.
    pub device_path: Option<PathBuf>,
    /// Key code the button reports, e.g. KEY_PROG1.
    pub key_code: String,
    /// Grab the device exclusively so presses do not leak to the console.
    pub grab_device: bool,
    /// Which electrical level counts as pressed.
    pub polarity: Polarity,
    /// Maximum gap between releases for a double press; doubles as the hold threshold.
    #[serde(with = "humantime_serde")]
    pub double_press_window: Duration,
    /// Continuous hold after which a long press fires.
    #[serde(with = "humantime_serde")]
    pub long_press_after: Duration,
    /// Continuous hold after which a reset press fires.
    #[serde(with = "humantime_serde")]
    pub reset_press_after: Duration,
    /// Timing loop cadence while a press or a pending decision is live.
    #[serde(with = "humantime_serde")]
    pub press_tick: Duration,
}

impl ButtonConfig {
    fn validate(&self) -> Result<()> {
        ensure!(!self.key_code.is_empty(), "button.key-code must not be empty");
        ensure!(
            self.press_tick > Duration::ZERO,
            "button.press-tick must be greater than zero"
        );
        ensure!(
            self.double_press_window > Duration::ZERO,
            "button.double-press-window must be greater than zero"
        );
        ensure!(
            self.long_press_after > self.double_press_window,
            "button.long-press-after must exceed button.double-press-window"
        );
        ensure!(
            self.reset_press_after > self.long_press_after,
            "button.reset-press-after must exceed button.long-press-after"
        );
        Ok(())
    }

    pub fn windows(&self) -> GestureWindows {
        GestureWindows {
            double_press: self.double_press_window,
            long_press: self.long_press_after,
            reset_press: self.reset_press_after,
        }
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_path: None,
            key_code: String::from("KEY_PROG1"),
            grab_device: false,
            polarity: Polarity::default(),
            double_press_window: Duration::from_millis(300),
            long_press_after: Duration::from_millis(1200),
            reset_press_after: Duration::from_secs(3),
            press_tick: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Display program launched over the image list.
    pub program: String,
    /// Virtual terminal the viewer claims.
    pub console: u32,
    /// Framebuffer device handed to the viewer.
    pub framebuffer: PathBuf,
    /// Cross-fade between images, when the viewer supports one.
    #[serde(with = "humantime_serde")]
    pub blend: Option<Duration>,
    /// Extra arguments appended to the viewer command line.
    pub extra_args: Vec<String>,
    /// How long a quit keystroke may take before the viewer is force-killed.
    #[serde(with = "humantime_serde")]
    pub stop_grace: Duration,
    /// Pause between digits when typing an image number.
    #[serde(with = "humantime_serde")]
    pub inter_digit_delay: Duration,
    /// Name under which the virtual keyboard registers.
    pub keyboard_name: String,
}

impl ViewerConfig {
    fn validate(&self) -> Result<()> {
        ensure!(!self.program.is_empty(), "viewer.program must not be empty");
        ensure!(self.console >= 1, "viewer.console must be at least 1");
        ensure!(
            !self.framebuffer.as_os_str().is_empty(),
            "viewer.framebuffer must not be empty"
        );
        ensure!(
            self.stop_grace > Duration::ZERO,
            "viewer.stop-grace must be greater than zero"
        );
        ensure!(
            self.inter_digit_delay > Duration::ZERO,
            "viewer.inter-digit-delay must be greater than zero"
        );
        ensure!(
            !self.keyboard_name.is_empty(),
            "viewer.keyboard-name must not be empty"
        );
        Ok(())
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            program: String::from("fbi"),
            console: 1,
            framebuffer: PathBuf::from("/dev/fb0"),
            blend: Some(Duration::from_millis(500)),
            extra_args: Vec::new(),
            stop_grace: Duration::from_millis(1500),
            inter_digit_delay: Duration::from_millis(150),
            keyboard_name: String::from("frame-control-keys"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SlideshowConfig {
    /// Delay between automatic advances.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Start advancing as soon as the viewer is up.
    pub auto_start: bool,
}

impl SlideshowConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.interval > Duration::ZERO,
            "slideshow.interval must be greater than zero"
        );
        Ok(())
    }
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            auto_start: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct WatchdogConfig {
    /// Liveness poll cadence.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Wait after a restart before re-asserting the displayed image.
    #[serde(with = "humantime_serde")]
    pub resync_settle: Duration,
}

impl WatchdogConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.poll_interval > Duration::ZERO,
            "watchdog.poll-interval must be greater than zero"
        );
        Ok(())
    }
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            resync_settle: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ControlConfig {
    /// Whether the control socket is served at all.
    pub enabled: bool,
    /// Unix domain socket accepting runtime control commands.
    pub socket_path: PathBuf,
}

impl ControlConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.socket_path.as_os_str().is_empty(),
            "control.socket-path must not be empty"
        );
        ensure!(
            self.socket_path.file_name().is_some(),
            "control.socket-path must include a socket file name"
        );
        Ok(())
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            socket_path: PathBuf::from(DEFAULT_CONTROL_SOCKET_PATH),
        }
    }
}
