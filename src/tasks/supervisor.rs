//! Display session supervisor.
//!
//! Owns the external viewer process, the navigation state, the slideshow
//! timer, and the watchdog that restarts a crashed viewer and re-asserts
//! the image it was showing. Everything the daemon does to the display
//! funnels through this task, so state never needs a lock.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use rand::Rng;
use tokio::sync::mpsc::Receiver;
use tokio::time::{self, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Configuration, SlideshowConfig, ViewerConfig, WatchdogConfig};
use crate::events::ControlCommand;
use crate::inject::KeyInjector;
use crate::keys::{self, ControlKey};
use crate::platform::process;
use crate::session::{SessionState, SlideshowChange};

pub struct Supervisor {
    viewer: ViewerConfig,
    watchdog: WatchdogConfig,
    slideshow: SlideshowConfig,
    session: SessionState,
    injector: KeyInjector,
    process_name: String,
    should_run: bool,
}

impl Supervisor {
    pub fn new(cfg: &Configuration, injector: KeyInjector) -> Self {
        // Liveness goes through /proc/<pid>/comm, which holds the basename.
        let process_name = Path::new(&cfg.viewer.program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| cfg.viewer.program.clone());
        Self {
            viewer: cfg.viewer.clone(),
            watchdog: cfg.watchdog.clone(),
            slideshow: cfg.slideshow.clone(),
            session: SessionState::new(cfg.slideshow.interval),
            injector,
            process_name,
            should_run: false,
        }
    }

    /// Whether a process matching the viewer's name is alive right now.
    pub fn is_running(&self) -> bool {
        process::viewer_alive(&self.process_name)
    }

    /// Launches the viewer, registering `images` first when given.
    ///
    /// An already-running instance is killed so the relaunch picks up the
    /// current image list.
    pub fn start(&mut self, images: Option<Vec<PathBuf>>) -> Result<()> {
        if let Some(images) = images {
            let count = self.session.register_images(images);
            info!(images = count, "registered image list");
        }
        ensure!(
            !self.session.is_empty(),
            "no images registered; refusing to start viewer"
        );
        if self.is_running() {
            let killed = process::kill_viewer(&self.process_name);
            info!(killed, "killed stale viewer instances before relaunch");
        }
        let pid = process::spawn_viewer(&self.viewer, self.session.images())?;
        self.should_run = true;
        info!(pid, images = self.session.image_count(), "viewer started");
        Ok(())
    }

    /// Asks the viewer to quit, escalating if it lingers.
    ///
    /// The quit keystroke gets `stop_grace` to take effect; a survivor is
    /// force-killed and the console-restore chord is sent so the terminal
    /// is not left on a dead framebuffer. The session always ends
    /// logically stopped, whichever path ran.
    pub async fn stop(&mut self) -> Result<()> {
        self.should_run = false;
        if !self.is_running() {
            debug!("stop requested but viewer is not running");
            return Ok(());
        }
        match self.injector.tap(ControlKey::Quit) {
            Ok(()) => time::sleep(self.viewer.stop_grace).await,
            Err(err) => warn!(error = %err, "quit keystroke failed; escalating to kill"),
        }
        if self.is_running() {
            let killed = process::kill_viewer(&self.process_name);
            warn!(killed, "viewer did not exit gracefully; force-killed");
            self.injector
                .combo(&keys::CONSOLE_RESTORE)
                .context("restore console after force kill")?;
        }
        info!("viewer stopped");
        Ok(())
    }

    /// Shutdown path: stops the viewer and swallows failures.
    pub async fn close(&mut self) {
        if let Err(err) = self.stop().await {
            warn!(error = %err, "failed to stop viewer during shutdown");
        }
    }

    /// Sends the next-image keystroke and advances the index.
    pub fn next_image(&mut self) -> Result<()> {
        self.injector.tap(ControlKey::Next)?;
        if let Some(index) = self.session.advance() {
            debug!(index, "advanced to next image");
        }
        Ok(())
    }

    /// Sends the previous-image keystroke and retreats the index.
    pub fn prev_image(&mut self) -> Result<()> {
        self.injector.tap(ControlKey::Prev)?;
        if let Some(index) = self.session.retreat() {
            debug!(index, "retreated to previous image");
        }
        Ok(())
    }

    /// Zoom keys leave the index alone but drop any typed digits.
    pub fn zoom_in(&mut self) -> Result<()> {
        self.session.clear_entry();
        self.injector.tap(ControlKey::ZoomIn)
    }

    pub fn zoom_out(&mut self) -> Result<()> {
        self.session.clear_entry();
        self.injector.tap(ControlKey::ZoomOut)
    }

    pub fn toggle_info(&mut self) -> Result<()> {
        self.injector.tap(ControlKey::ToggleInfo)
    }

    pub fn toggle_verbose(&mut self) -> Result<()> {
        self.injector.tap(ControlKey::ToggleVerbose)
    }

    /// Buffers a digit and types it into the viewer.
    pub fn send_digit(&mut self, value: u8) -> Result<()> {
        if value > 9 {
            warn!(value, "ignoring out-of-range digit");
            return Ok(());
        }
        self.session.push_digit(value);
        self.injector.tap(ControlKey::Digit(value))
    }

    /// Types the confirm key and resolves the buffered digits.
    ///
    /// Returns the index jumped to, or `None` when the buffer named no
    /// registered image; the buffer is cleared either way.
    pub fn confirm_entry(&mut self) -> Result<Option<usize>> {
        self.injector.tap(ControlKey::Confirm)?;
        Ok(self.session.confirm_entry())
    }

    /// Types the digits of a 1-based image number at the configured
    /// inter-digit delay, then confirms. Out-of-range numbers are ignored.
    pub async fn go_to_image(&mut self, number: usize) -> Result<Option<usize>> {
        if !self.session.contains_number(number) {
            warn!(
                number,
                images = self.session.image_count(),
                "goto target out of range"
            );
            self.session.clear_entry();
            return Ok(None);
        }
        for (position, digit) in keys::digit_sequence(number).iter().enumerate() {
            if position > 0 {
                time::sleep(self.viewer.inter_digit_delay).await;
            }
            self.injector.tap(ControlKey::Digit(*digit))?;
        }
        time::sleep(self.viewer.inter_digit_delay).await;
        self.injector.tap(ControlKey::Confirm)?;
        Ok(self.session.jump_to(number))
    }

    /// Jumps to an image chosen uniformly from the registered list.
    pub async fn random_image(&mut self) -> Result<Option<usize>> {
        let count = self.session.image_count();
        if count == 0 {
            return Ok(None);
        }
        let number = rand::rng().random_range(1..=count);
        info!(number, "jumping to random image");
        self.go_to_image(number).await
    }

    /// Re-types the believed-current image number so a fresh viewer
    /// instance lands on the same photo.
    pub async fn sync(&mut self) -> Result<Option<usize>> {
        if self.session.is_empty() {
            return Ok(None);
        }
        self.go_to_image(self.session.current_number()).await
    }

    /// Folds newly discovered images into the session and relaunches the
    /// viewer over the extended list, landing on the first new arrival.
    pub async fn show_new_images(&mut self, paths: Vec<PathBuf>) -> Result<Option<usize>> {
        let Some(first_new) = self.session.append_images(paths) else {
            debug!("no new images survived validation");
            return Ok(None);
        };
        let number = first_new + 1;
        info!(
            number,
            images = self.session.image_count(),
            "new images available"
        );
        if !self.should_run {
            return Ok(None);
        }
        self.start(None).context("relaunch viewer with new images")?;
        time::sleep(self.watchdog.resync_settle).await;
        self.go_to_image(number).await
    }
}

/// Drives one supervisor over its command stream until shutdown.
pub async fn run(
    mut supervisor: Supervisor,
    initial_images: Vec<PathBuf>,
    mut commands: Receiver<ControlCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut timer: Option<Interval> = None;

    match supervisor.start(Some(initial_images)) {
        Ok(()) => {
            if supervisor.slideshow.auto_start {
                let change = supervisor.session.start_slideshow(None);
                apply_slideshow_change(&mut supervisor, &mut timer, change, false);
            }
        }
        Err(err) => {
            warn!(error = %err, "initial viewer start failed; watchdog will retry");
            supervisor.should_run = true;
            if supervisor.slideshow.auto_start {
                supervisor.session.start_slideshow(None);
            }
        }
    }

    // First liveness check one full period out; the viewer needs a moment
    // to appear in the process table under its own name.
    let mut watchdog = time::interval_at(
        time::Instant::now() + supervisor.watchdog.poll_interval,
        supervisor.watchdog.poll_interval,
    );
    watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("supervisor shutting down");
                supervisor.close().await;
                break;
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    info!("command channel closed; shutting down supervisor");
                    supervisor.close().await;
                    break;
                };
                handle_command(&mut supervisor, &mut timer, command).await;
            }
            _ = next_slideshow_tick(&mut timer) => {
                if let Err(err) = supervisor.next_image() {
                    warn!(error = %err, "slideshow advance failed");
                }
            }
            _ = watchdog.tick() => {
                watchdog_check(&mut supervisor, &mut timer).await;
            }
        }
    }
    Ok(())
}

async fn handle_command(
    supervisor: &mut Supervisor,
    timer: &mut Option<Interval>,
    command: ControlCommand,
) {
    match command {
        ControlCommand::Start => {
            if let Err(err) = restart_viewer(supervisor, timer).await {
                warn!(error = %err, "start command failed");
            }
        }
        ControlCommand::Stop => {
            *timer = None;
            if let Err(err) = supervisor.stop().await {
                warn!(error = %err, "stop command failed");
            }
        }
        ControlCommand::NextImage => match supervisor.next_image() {
            Ok(()) => reset_timer(timer),
            Err(err) => warn!(error = %err, "next-image failed"),
        },
        ControlCommand::PrevImage => match supervisor.prev_image() {
            Ok(()) => reset_timer(timer),
            Err(err) => warn!(error = %err, "prev-image failed"),
        },
        ControlCommand::ZoomIn => log_failure("zoom-in", supervisor.zoom_in()),
        ControlCommand::ZoomOut => log_failure("zoom-out", supervisor.zoom_out()),
        ControlCommand::ToggleInfo => log_failure("toggle-info", supervisor.toggle_info()),
        ControlCommand::ToggleVerbose => {
            log_failure("toggle-verbose", supervisor.toggle_verbose());
        }
        ControlCommand::Digit { value } => log_failure("digit", supervisor.send_digit(value)),
        ControlCommand::Confirm => match supervisor.confirm_entry() {
            Ok(Some(index)) => {
                debug!(index, "numeric entry confirmed");
                reset_timer(timer);
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "confirm failed"),
        },
        ControlCommand::GoToImage { number } => match supervisor.go_to_image(number).await {
            Ok(Some(_)) => reset_timer(timer),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "go-to-image failed"),
        },
        ControlCommand::RandomImage => match supervisor.random_image().await {
            Ok(Some(_)) => reset_timer(timer),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "random-image failed"),
        },
        ControlCommand::Sync => {
            if let Err(err) = supervisor.sync().await {
                warn!(error = %err, "sync failed");
            }
        }
        ControlCommand::StartSlideshow { interval, advance } => {
            let change = supervisor.session.start_slideshow(interval);
            apply_slideshow_change(supervisor, timer, change, advance);
        }
        ControlCommand::StopSlideshow => {
            let change = supervisor.session.stop_slideshow();
            apply_slideshow_change(supervisor, timer, change, false);
        }
        ControlCommand::ToggleSlideshow { interval, advance } => {
            let change = supervisor.session.toggle_slideshow(interval);
            apply_slideshow_change(supervisor, timer, change, advance);
        }
        ControlCommand::Button { name } => {
            // Raw identifiers resolve in the control task; one that leaks
            // through here has no mapping.
            warn!(button = %name, "unrouted button identifier dropped");
        }
        ControlCommand::ShowNewImages { paths } => {
            match supervisor.show_new_images(paths).await {
                Ok(Some(_)) => reset_timer(timer),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "show-new-images failed"),
            }
        }
    }
}

/// Relaunches the viewer over the registered list and re-asserts the
/// current image. Shared by the start command and the watchdog.
async fn restart_viewer(supervisor: &mut Supervisor, timer: &mut Option<Interval>) -> Result<()> {
    supervisor.start(None)?;
    if supervisor.session.slideshow_active() {
        *timer = Some(make_slideshow_timer(supervisor.session.slideshow_interval()));
    }
    time::sleep(supervisor.watchdog.resync_settle).await;
    supervisor.sync().await?;
    Ok(())
}

/// One liveness poll. Runs inline in the supervisor loop, so a restart
/// still in progress simply delays the next poll instead of racing it.
async fn watchdog_check(supervisor: &mut Supervisor, timer: &mut Option<Interval>) {
    if !supervisor.should_run || supervisor.is_running() {
        return;
    }
    warn!("viewer process not running; restarting");
    match restart_viewer(supervisor, timer).await {
        Ok(()) => info!("viewer restarted and resynced"),
        Err(err) => warn!(error = %err, "viewer restart failed; retrying on next tick"),
    }
}

fn apply_slideshow_change(
    supervisor: &mut Supervisor,
    timer: &mut Option<Interval>,
    change: SlideshowChange,
    advance: bool,
) {
    match change {
        SlideshowChange::Started { interval } | SlideshowChange::Restarted { interval } => {
            if advance {
                if let Err(err) = supervisor.next_image() {
                    warn!(error = %err, "slideshow advance failed");
                }
            }
            *timer = Some(make_slideshow_timer(interval));
            info!(interval = ?interval, "slideshow armed");
        }
        SlideshowChange::Stopped => {
            *timer = None;
            info!("slideshow stopped");
        }
    }
}

/// Builds the advance timer with its first tick one full period out.
fn make_slideshow_timer(period: Duration) -> Interval {
    let mut timer = time::interval_at(time::Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Resolves on the next slideshow tick, or never while no timer is armed.
async fn next_slideshow_tick(timer: &mut Option<Interval>) -> time::Instant {
    match timer {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

fn reset_timer(timer: &mut Option<Interval>) {
    if let Some(interval) = timer.as_mut() {
        interval.reset();
    }
}

fn log_failure(operation: &str, result: Result<()>) {
    if let Err(err) = result {
        warn!(operation, error = %err, "keystroke failed");
    }
}
