//! Physical button listener.
//!
//! Samples the configured input device and classifies raw press and
//! release edges into gestures, which are forwarded to the router as
//! they resolve.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use evdev::{Device, EventSummary, KeyCode};
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ButtonConfig;
use crate::events::{ButtonEvent, Gesture};
use crate::gesture::GestureTracker;

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ButtonTaskError {
    #[error("unknown key code: {0}")]
    UnknownKey(String),
}

pub async fn run(
    cfg: ButtonConfig,
    events: Sender<ButtonEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    if !cfg.enabled {
        info!("button listener disabled via configuration");
        return Ok(());
    }

    let target_key = parse_key(&cfg.key_code)?;
    let windows = cfg.windows();

    loop {
        let (mut device, path) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            opened = open_button_device(&cfg, target_key) => {
                opened.context("open button input device")?
            }
        };

        if cfg.grab_device {
            if let Err(err) = device.grab() {
                warn!(device = %path.display(), error = %err, "failed to grab input device");
            }
        }
        let mut stream = device.into_event_stream().context("event stream")?;

        let channel = path.display().to_string();
        let mut tracker = GestureTracker::new(windows);
        info!(device = %channel, key = ?target_key, "listening for button presses");
        forward(&events, &channel, Gesture::Ready).await;

        let mut tick = time::interval(cfg.press_tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tick.tick(), if tracker.armed() => {
                    for gesture in tracker.on_tick(Instant::now()) {
                        forward(&events, &channel, gesture).await;
                    }
                }
                event = stream.next_event() => {
                    let event = match event {
                        Ok(event) => event,
                        Err(err) => {
                            warn!(device = %channel, error = %err, "input stream error; reopening device");
                            let _ = events
                                .send(ButtonEvent::Fault {
                                    channel: channel.clone(),
                                    message: err.to_string(),
                                })
                                .await;
                            break;
                        }
                    };
                    if let EventSummary::Key(_, code, value) = event.destructure() {
                        if code == target_key {
                            match value {
                                1 | 0 => {
                                    if cfg.polarity.is_active(value) {
                                        tracker.on_press(Instant::now());
                                    } else {
                                        for gesture in tracker.on_release(Instant::now()) {
                                            forward(&events, &channel, gesture).await;
                                        }
                                    }
                                }
                                // Kernel autorepeat frames carry value 2.
                                _ => {}
                            }
                        }
                    }
                }
            }
        }
    }
}

async fn forward(events: &Sender<ButtonEvent>, channel: &str, gesture: Gesture) {
    debug!(channel, gesture = gesture.label(), "classified gesture");
    let _ = events
        .send(ButtonEvent::Gesture {
            channel: channel.to_string(),
            gesture,
        })
        .await;
}

fn parse_key(code: &str) -> Result<KeyCode> {
    KeyCode::from_str(code).map_err(|_| ButtonTaskError::UnknownKey(code.to_string()).into())
}

async fn open_button_device(cfg: &ButtonConfig, target_key: KeyCode) -> Result<(Device, PathBuf)> {
    let mut delay = INITIAL_RETRY_DELAY;
    loop {
        match try_open_device(cfg, target_key) {
            Ok(opened) => return Ok(opened),
            Err(err) => {
                warn!(error = %err, retry_in = ?delay, "button input device unavailable");
                time::sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
        }
    }
}

fn try_open_device(cfg: &ButtonConfig, target_key: KeyCode) -> Result<(Device, PathBuf)> {
    if let Some(path) = cfg.device_path.as_ref() {
        let device =
            Device::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        ensure_key(&device, target_key, path)?;
        return Ok((device, path.clone()));
    }

    for (path, device) in evdev::enumerate() {
        if supports_key(&device, target_key) {
            info!(device = %path.display(), "using auto-detected input device");
            return Ok((device, path));
        }
    }

    Err(anyhow!("no input device advertising {target_key:?} found"))
}

fn supports_key(device: &Device, target_key: KeyCode) -> bool {
    device
        .supported_keys()
        .map(|keys| keys.contains(target_key))
        .unwrap_or(false)
}

fn ensure_key(device: &Device, target_key: KeyCode, path: &Path) -> Result<()> {
    if !supports_key(device, target_key) {
        bail!("{} does not support {target_key:?}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_key_codes() {
        assert_eq!(parse_key("KEY_PROG1").unwrap(), KeyCode::KEY_PROG1);
        assert_eq!(parse_key("KEY_POWER").unwrap(), KeyCode::KEY_POWER);
    }

    #[test]
    fn rejects_unknown_key_codes() {
        let err = parse_key("KEY_BOGUS").unwrap_err();
        assert!(err.to_string().contains("unknown key code"));
    }
}
