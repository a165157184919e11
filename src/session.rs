//! Navigation and slideshow bookkeeping for one display session.
//!
//! Pure state: the supervisor task consults and mutates this while the
//! keystroke and process side effects happen elsewhere, which keeps the
//! index arithmetic testable without a framebuffer.

use std::mem;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Outcome of a slideshow start/stop/toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideshowChange {
    /// The slideshow was off and is now armed at `interval`.
    Started { interval: Duration },
    /// The slideshow stays on but the timer must be rebuilt at `interval`.
    Restarted { interval: Duration },
    /// The slideshow is now off.
    Stopped,
}

/// Tracks which image is showing, the digits typed so far for a numeric
/// jump, and whether the automatic advance timer should be running.
#[derive(Debug)]
pub struct SessionState {
    images: Vec<PathBuf>,
    current: usize,
    entry: String,
    slideshow_active: bool,
    slideshow_interval: Duration,
}

impl SessionState {
    pub fn new(slideshow_interval: Duration) -> Self {
        Self {
            images: Vec::new(),
            current: 0,
            entry: String::new(),
            slideshow_active: false,
            slideshow_interval,
        }
    }

    /// Replaces the registered image list.
    ///
    /// Paths that are missing or not regular files are dropped with a
    /// warning rather than failing the whole registration. Returns how
    /// many images survived.
    pub fn register_images(&mut self, images: Vec<PathBuf>) -> usize {
        self.images = validate_images(images);
        if self.current >= self.images.len() {
            self.current = 0;
        }
        self.entry.clear();
        self.images.len()
    }

    /// Appends newly discovered images, skipping paths already registered.
    ///
    /// Returns the index of the first appended image, or `None` when
    /// nothing new survived validation.
    pub fn append_images(&mut self, images: Vec<PathBuf>) -> Option<usize> {
        let first_new = self.images.len();
        for path in validate_images(images) {
            if !self.images.contains(&path) {
                self.images.push(path);
            }
        }
        if self.images.len() > first_new {
            Some(first_new)
        } else {
            None
        }
    }

    /// Moves to the next image, wrapping from the last back to the first.
    pub fn advance(&mut self) -> Option<usize> {
        if self.images.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.images.len();
        self.entry.clear();
        Some(self.current)
    }

    /// Moves to the previous image, wrapping from the first to the last.
    pub fn retreat(&mut self) -> Option<usize> {
        if self.images.is_empty() {
            return None;
        }
        self.current = self
            .current
            .checked_sub(1)
            .unwrap_or(self.images.len() - 1);
        self.entry.clear();
        Some(self.current)
    }

    /// Buffers one typed digit for a numeric jump.
    pub fn push_digit(&mut self, digit: u8) {
        if digit <= 9 {
            self.entry.push(char::from(b'0' + digit));
        }
    }

    pub fn clear_entry(&mut self) {
        self.entry.clear();
    }

    /// Consumes the digit buffer as a 1-based image number.
    ///
    /// The buffer is cleared whether or not it named a real image; an
    /// empty or out-of-range entry leaves `current` untouched.
    pub fn confirm_entry(&mut self) -> Option<usize> {
        let entry = mem::take(&mut self.entry);
        let number = entry.parse::<usize>().ok()?;
        self.jump_number(number)
    }

    /// Jumps straight to a 1-based image number, discarding buffered digits.
    pub fn jump_to(&mut self, number: usize) -> Option<usize> {
        self.entry.clear();
        self.jump_number(number)
    }

    fn jump_number(&mut self, number: usize) -> Option<usize> {
        if self.contains_number(number) {
            self.current = number - 1;
            Some(self.current)
        } else {
            None
        }
    }

    /// Whether `number` names a registered image (numbers are 1-based).
    pub fn contains_number(&self, number: usize) -> bool {
        (1..=self.images.len()).contains(&number)
    }

    /// Applies a toggle request.
    ///
    /// Toggling with the interval already configured (or with `None`)
    /// stops an active slideshow; a different interval restarts it at
    /// the new cadence instead.
    pub fn toggle_slideshow(&mut self, interval: Option<Duration>) -> SlideshowChange {
        let interval = usable_interval(interval);
        let requested = interval.unwrap_or(self.slideshow_interval);
        if self.slideshow_active && requested == self.slideshow_interval {
            self.stop_slideshow()
        } else if self.slideshow_active {
            self.slideshow_interval = requested;
            SlideshowChange::Restarted {
                interval: requested,
            }
        } else {
            self.start_slideshow(interval)
        }
    }

    pub fn start_slideshow(&mut self, interval: Option<Duration>) -> SlideshowChange {
        if let Some(interval) = usable_interval(interval) {
            self.slideshow_interval = interval;
        }
        self.slideshow_active = true;
        SlideshowChange::Started {
            interval: self.slideshow_interval,
        }
    }

    pub fn stop_slideshow(&mut self) -> SlideshowChange {
        self.slideshow_active = false;
        SlideshowChange::Stopped
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// 1-based position of the current image.
    pub fn current_number(&self) -> usize {
        self.current + 1
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn slideshow_active(&self) -> bool {
        self.slideshow_active
    }

    pub fn slideshow_interval(&self) -> Duration {
        self.slideshow_interval
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }
}

/// The slideshow interval must stay positive; a zero request from the
/// wire is dropped rather than armed.
fn usable_interval(interval: Option<Duration>) -> Option<Duration> {
    match interval {
        Some(interval) if interval.is_zero() => {
            warn!("ignoring zero slideshow interval");
            None
        }
        other => other,
    }
}

/// Drops paths that do not point at readable regular files.
fn validate_images(images: Vec<PathBuf>) -> Vec<PathBuf> {
    images
        .into_iter()
        .filter(|path| match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => true,
            Ok(_) => {
                warn!(path = %path.display(), "not a regular file; skipping");
                false
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable image path; skipping");
                false
            }
        })
        .collect()
}
