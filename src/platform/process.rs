//! Process-table queries and lifecycle control for the external viewer.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ViewerConfig;

/// Scans `/proc` for live processes whose comm matches `name`.
///
/// Walks the table on every call; liveness is never cached because the
/// viewer can die between any two observations.
pub fn viewer_pids(name: &str) -> Vec<i32> {
    let entries = match std::fs::read_dir("/proc") {
        Ok(entries) => entries,
        Err(err) => {
            warn!(error = %err, "failed to read /proc");
            return Vec::new();
        }
    };
    let mut pids = Vec::new();
    for entry in entries.filter_map(Result::ok) {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.parse::<i32>().ok())
        else {
            continue;
        };
        // The process can exit between listing and reading its comm.
        let Ok(comm) = std::fs::read_to_string(entry.path().join("comm")) else {
            continue;
        };
        if comm.trim_end() == name {
            pids.push(pid);
        }
    }
    pids
}

pub fn viewer_alive(name: &str) -> bool {
    !viewer_pids(name).is_empty()
}

/// Launches the viewer over `images` and detaches from it.
///
/// The direct child is only a launcher: the viewer forks away to claim
/// its console, so a reaper task collects the child while liveness is
/// tracked through the process table instead.
pub fn spawn_viewer(viewer: &ViewerConfig, images: &[PathBuf]) -> Result<u32> {
    let mut command = Command::new(&viewer.program);
    command
        .arg("-T")
        .arg(viewer.console.to_string())
        .arg("-d")
        .arg(&viewer.framebuffer)
        .arg("-a")
        .arg("--noverbose");
    if let Some(blend) = viewer.blend {
        command.arg("--blend").arg(blend.as_millis().to_string());
    }
    command.args(&viewer.extra_args);
    command.args(images);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to launch {}", viewer.program))?;
    let pid = child.id().unwrap_or_default();
    debug!(program = %viewer.program, pid, images = images.len(), "viewer launcher spawned");
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!(%status, "viewer launcher exited"),
            Err(err) => warn!(error = %err, "failed to reap viewer launcher"),
        }
    });
    Ok(pid)
}

/// Sends SIGKILL to every live process named `name`.
///
/// Returns how many processes were signalled.
pub fn kill_viewer(name: &str) -> usize {
    let mut killed = 0;
    for pid in viewer_pids(name) {
        match kill(Pid::from_raw(pid), Signal::SIGKILL) {
            Ok(()) => killed += 1,
            Err(err) => warn!(pid, error = %err, "failed to kill viewer process"),
        }
    }
    killed
}
