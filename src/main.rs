//! Binary entrypoint for the frame controller daemon.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use frame_control::config::Configuration;
use frame_control::events::{ButtonEvent, ControlCommand};
use frame_control::inject::KeyInjector;
use frame_control::tasks::supervisor::Supervisor;
use frame_control::{router, tasks};

#[derive(Debug, Parser)]
#[command(
    name = "frame-controld",
    version,
    about = "Physical-button and socket controller for an fbi photo frame"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Logging level (error|warn|info|debug|trace).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::builder()
        .parse(level)
        .with_context(|| format!("invalid log level '{level}'"))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args { config, log_level } = Args::parse();
    init_tracing(&log_level)?;

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::info!("loaded configuration from {}:\n{cfg:#?}", config.display());

    let images = tasks::library::scan(&cfg.photo_library_path);
    tracing::info!(count = images.len(), "discovered images in library");

    let injector = KeyInjector::new(&cfg.viewer.keyboard_name).context("create virtual keyboard")?;
    let supervisor = Supervisor::new(&cfg, injector);

    // Channels (small/bounded)
    let (button_tx, button_rx) = mpsc::channel::<ButtonEvent>(16); // Button -> Router
    let (command_tx, command_rx) = mpsc::channel::<ControlCommand>(16); // Router/Control/Library -> Supervisor

    let cancel = CancellationToken::new();

    // Ctrl-D/Ctrl-C cancel the daemon when run interactively
    if io::stdin().is_terminal() {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let mut sink = Vec::new();
            match io::stdin().read_to_end(&mut sink) {
                Ok(_) => tracing::info!("stdin closed; initiating shutdown"),
                Err(err) => tracing::warn!("stdin watcher failed: {err}"),
            }
            cancel.cancel();
        });
    } else {
        tracing::debug!("stdin is not a terminal; skipping shutdown watcher");
    }

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    #[cfg(unix)]
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    if sigterm.recv().await.is_some() {
                        tracing::info!("SIGTERM received; initiating shutdown");
                        cancel.cancel();
                    }
                }
                Err(err) => tracing::warn!("failed to register SIGTERM handler: {err}"),
            }
        });
    }

    let mut tasks = JoinSet::new();

    // Button listener
    tasks.spawn({
        let button_cfg = cfg.button.clone();
        let events = button_tx;
        let cancel = cancel.clone();
        async move {
            tasks::button::run(button_cfg, events, cancel)
                .await
                .context("button task failed")
        }
    });

    // Gesture router
    tasks.spawn({
        let events = button_rx;
        let commands = command_tx.clone();
        let cancel = cancel.clone();
        async move {
            route_gestures(events, commands, cancel)
                .await
                .context("router task failed")
        }
    });

    // Control socket
    tasks.spawn({
        let control_cfg = cfg.control.clone();
        let commands = command_tx.clone();
        let cancel = cancel.clone();
        async move {
            tasks::control::run(control_cfg, commands, cancel)
                .await
                .context("control task failed")
        }
    });

    // Library watcher
    tasks.spawn({
        let root = cfg.photo_library_path.clone();
        let debounce = cfg.library_debounce;
        let commands = command_tx;
        let cancel = cancel.clone();
        async move {
            tasks::library::run(root, debounce, commands, cancel)
                .await
                .context("library task failed")
        }
    });

    // Viewer supervisor
    tasks.spawn({
        let commands = command_rx;
        let cancel = cancel.clone();
        async move {
            tasks::supervisor::run(supervisor, images, commands, cancel)
                .await
                .context("supervisor task failed")
        }
    });

    // Drain JoinSet; the first failure cancels the rest
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!("task error: {e:?}");
                cancel.cancel();
            }
            Err(e) => {
                tracing::error!("join error: {e}");
                cancel.cancel();
            }
        }
    }

    Ok(())
}

/// Turns classified gestures into viewer commands for the supervisor.
async fn route_gestures(
    mut events: mpsc::Receiver<ButtonEvent>,
    commands: mpsc::Sender<ControlCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            maybe = events.recv() => {
                let Some(event) = maybe else { break };
                match event {
                    ButtonEvent::Gesture { channel, gesture } => {
                        tracing::info!(channel = %channel, gesture = gesture.label(), "button gesture");
                        if let Some(command) = router::route_gesture(gesture) {
                            if commands.send(command).await.is_err() {
                                break;
                            }
                        }
                    }
                    ButtonEvent::Fault { channel, message } => {
                        tracing::warn!(channel = %channel, message = %message, "button channel fault");
                    }
                }
            }
        }
    }
    Ok(())
}
