use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::events::Gesture;

/// Which electrical level counts as "pressed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Polarity {
    #[default]
    NormallyOpen,
    NormallyClosed,
}

impl Polarity {
    /// Maps a raw input value onto the logical pressed level.
    pub fn is_active(self, value: i32) -> bool {
        match self {
            Polarity::NormallyOpen => value != 0,
            Polarity::NormallyClosed => value == 0,
        }
    }
}

/// Threshold durations for press classification.
///
/// `double_press` doubles as the hold threshold and as the quiet window a
/// release must survive before it counts as a single press.
#[derive(Debug, Clone, Copy)]
pub struct GestureWindows {
    pub double_press: Duration,
    pub long_press: Duration,
    pub reset_press: Duration,
}

impl Default for GestureWindows {
    fn default() -> Self {
        Self {
            double_press: Duration::from_millis(300),
            long_press: Duration::from_millis(1200),
            reset_press: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PressInfo {
    down_at: Instant,
    held_fired: bool,
    long_fired: bool,
    reset_fired: bool,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Pressed(PressInfo),
}

/// Classifies raw press/release edges plus a periodic tick into gestures.
///
/// Purely `Instant`-driven; the owning task supplies the clock and the
/// tick cadence, which keeps every timing decision testable.
pub struct GestureTracker {
    windows: GestureWindows,
    phase: Phase,
    last_release: Option<Instant>,
    pending_single: Option<Instant>,
}

impl GestureTracker {
    pub fn new(windows: GestureWindows) -> Self {
        Self {
            windows,
            phase: Phase::Idle,
            last_release: None,
            pending_single: None,
        }
    }

    /// Signal went active. Duplicate edges while pressed are ignored.
    pub fn on_press(&mut self, now: Instant) {
        if let Phase::Idle = self.phase {
            self.phase = Phase::Pressed(PressInfo {
                down_at: now,
                held_fired: false,
                long_fired: false,
                reset_fired: false,
            });
        }
    }

    /// Signal went inactive; classifies the release.
    ///
    /// A release closer than the double-press window to the previous one
    /// emits DoublePress at once and cancels the pending single press.
    /// Otherwise a single press is scheduled to fire once the window
    /// passes uncontested. Neither happens when a long or reset press
    /// already fired during this activation.
    pub fn on_release(&mut self, now: Instant) -> Vec<Gesture> {
        let mut out = Vec::new();
        // A single press already past its deadline flushes before the
        // release is classified, so rescheduling below cannot drop it.
        if let Some(deadline) = self.pending_single {
            if now >= deadline {
                self.pending_single = None;
                out.push(Gesture::SinglePress);
            }
        }

        let Phase::Pressed(press) = self.phase else {
            return out;
        };
        self.phase = Phase::Idle;

        let threshold_fired = press.long_fired || press.reset_fired;
        let quick_gap = self
            .last_release
            .is_some_and(|prev| now.saturating_duration_since(prev) < self.windows.double_press);
        if !threshold_fired {
            if quick_gap {
                self.pending_single = None;
                out.push(Gesture::DoublePress);
            } else {
                self.pending_single = Some(now + self.windows.double_press);
            }
        }
        self.last_release = Some(now);
        out
    }

    /// Advances the timing state; call at the configured tick interval
    /// while [`armed`](Self::armed) is true.
    pub fn on_tick(&mut self, now: Instant) -> Vec<Gesture> {
        let mut out = Vec::new();

        if let Some(deadline) = self.pending_single {
            if now >= deadline {
                self.pending_single = None;
                out.push(Gesture::SinglePress);
            }
        }

        if let Phase::Pressed(ref mut press) = self.phase {
            if press.reset_fired {
                return out;
            }
            let pressed_for = now.saturating_duration_since(press.down_at);
            if !press.held_fired && pressed_for > self.windows.double_press {
                press.held_fired = true;
                out.push(Gesture::HeldPress);
            }
            if !press.long_fired && pressed_for > self.windows.long_press {
                press.long_fired = true;
                out.push(Gesture::LongPress);
            }
            if pressed_for > self.windows.reset_press {
                press.reset_fired = true;
                out.push(Gesture::ResetPress);
            }
        }
        out
    }

    /// True while a press is active or a single-press deadline is pending.
    pub fn armed(&self) -> bool {
        matches!(self.phase, Phase::Pressed(_)) || self.pending_single.is_some()
    }
}
