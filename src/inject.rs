//! Virtual keyboard wired into the kernel input layer.
//!
//! The viewer reads its shortcuts from the console like any physical
//! keyboard, so keystrokes are delivered by synthesizing events on a
//! uinput device rather than by talking to the process directly.

use anyhow::{Context, Result};
use evdev::uinput::VirtualDevice;
use evdev::{AttributeSet, KeyCode, KeyEvent};
use tracing::debug;

use crate::keys::{self, ControlKey};

pub struct KeyInjector {
    device: VirtualDevice,
}

impl KeyInjector {
    /// Registers a uinput keyboard advertising every key the viewer understands.
    pub fn new(name: &str) -> Result<Self> {
        let mut codes = AttributeSet::<KeyCode>::new();
        for code in keys::supported_codes() {
            codes.insert(code);
        }
        let device = VirtualDevice::builder()
            .context("failed to open /dev/uinput")?
            .name(name)
            .with_keys(&codes)
            .context("failed to register key capabilities")?
            .build()
            .context("failed to create virtual keyboard")?;
        Ok(Self { device })
    }

    /// Presses and releases one key in two event frames.
    pub fn tap(&mut self, key: ControlKey) -> Result<()> {
        let code = key.code();
        debug!(key = ?code, "injecting keystroke");
        self.device
            .emit(&[*KeyEvent::new(code, 1)])
            .with_context(|| format!("failed to press {code:?}"))?;
        self.device
            .emit(&[*KeyEvent::new(code, 0)])
            .with_context(|| format!("failed to release {code:?}"))?;
        Ok(())
    }

    /// Holds every key down in order, then releases them in reverse.
    pub fn combo(&mut self, codes: &[KeyCode]) -> Result<()> {
        debug!(keys = ?codes, "injecting key combination");
        for code in codes {
            self.device
                .emit(&[*KeyEvent::new(*code, 1)])
                .with_context(|| format!("failed to press {code:?}"))?;
        }
        for code in codes.iter().rev() {
            self.device
                .emit(&[*KeyEvent::new(*code, 0)])
                .with_context(|| format!("failed to release {code:?}"))?;
        }
        Ok(())
    }
}
