//! Control socket task.
//!
//! Serves the supervisor's command surface over a Unix domain socket so
//! external collaborators (an IR-remote daemon, shell tooling) can drive
//! the display. Wire format is one JSON command object per line.

use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ControlConfig;
use crate::events::ControlCommand;
use crate::router;

pub async fn run(
    cfg: ControlConfig,
    commands: Sender<ControlCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    if !cfg.enabled {
        info!("control socket disabled via configuration");
        return Ok(());
    }

    let listener = bind_socket(&cfg.socket_path)?;
    info!(socket = %cfg.socket_path.display(), "listening for control commands");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let commands = commands.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handle_client(stream, commands).await {
                            warn!(error = %err, "control client failed");
                        }
                    });
                }
                Err(err) => warn!(error = %err, "failed to accept control connection"),
            },
        }
    }

    if let Err(err) = std::fs::remove_file(&cfg.socket_path) {
        if err.kind() != ErrorKind::NotFound {
            warn!(socket = %cfg.socket_path.display(), error = %err, "failed to remove control socket");
        }
    }
    Ok(())
}

fn bind_socket(path: &Path) -> Result<UnixListener> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    match std::fs::remove_file(path) {
        Ok(()) => debug!(socket = %path.display(), "removed stale control socket"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to remove stale socket {}", path.display()));
        }
    }
    UnixListener::bind(path).with_context(|| format!("failed to bind {}", path.display()))
}

async fn handle_client(stream: UnixStream, commands: Sender<ControlCommand>) -> Result<()> {
    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines.next_line().await.context("read control command")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        dispatch_line(line, &commands).await;
    }
    Ok(())
}

async fn dispatch_line(line: &str, commands: &Sender<ControlCommand>) {
    let command: ControlCommand = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(err) => {
            warn!(error = %err, raw = line, "ignoring malformed control command");
            return;
        }
    };
    // Raw button identifiers resolve here so the supervisor only ever
    // sees concrete operations.
    let command = match command {
        ControlCommand::Button { name } => match router::route_button(&name) {
            Some(mapped) => mapped,
            None => return,
        },
        other => other,
    };
    debug!(?command, "accepted control command");
    let _ = commands.send(command).await;
}
