//! Photo library discovery.
//!
//! Scans the library once at startup and then watches it for images
//! copied in while the frame is running. Arrivals are debounced so one
//! multi-file copy turns into a single viewer relaunch.

use std::ffi::OsStr;
use std::mem;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use notify::event::{CreateKind, ModifyKind};
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc::{self, Sender};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::events::ControlCommand;

/// Recursive startup scan, sorted so the display order is stable.
pub fn scan(root: &Path) -> Vec<PathBuf> {
    let mut images = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path().to_path_buf();
        if is_image(&path) {
            images.push(path);
        }
    }
    images.sort();
    images
}

#[instrument(skip(commands, cancel), fields(root = %root.display()))]
pub async fn run(
    root: PathBuf,
    debounce: Duration,
    commands: Sender<ControlCommand>,
    cancel: CancellationToken,
) -> Result<()> {
    // Bridge notify callback -> async channel
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Result<Event>>(128);
    let mut watcher = recommended_watcher(move |res| {
        let _ = watch_tx.blocking_send(res);
    })?;

    match root.canonicalize() {
        Ok(abs) => info!(watching = %abs.display(), "library watcher initialized (recursive)"),
        Err(_) => info!(watching = %root.display(), "library watcher initialized (recursive)"),
    }
    watcher.watch(&root, RecursiveMode::Recursive)?;

    let mut pending = Vec::<PathBuf>::new();
    let mut flush_at: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting library task");
                break;
            }

            _ = flush_deadline(flush_at) => {
                flush_at = None;
                let mut batch = mem::take(&mut pending);
                batch.sort();
                batch.dedup();
                info!(images = batch.len(), "announcing new images");
                let _ = commands
                    .send(ControlCommand::ShowNewImages { paths: batch })
                    .await;
            }

            maybe = watch_rx.recv() => match maybe {
                Some(Ok(event)) => {
                    if collect_additions(&event, &mut pending) {
                        flush_at = Some(Instant::now() + debounce);
                    }
                }
                Some(Err(err)) => warn!(error = %err, "watch error"),
                None => {
                    warn!("watch channel closed; stopping library watcher");
                    break;
                }
            },
        }
    }
    Ok(())
}

/// Resolves at the debounce deadline, or never while none is armed.
async fn flush_deadline(at: Option<Instant>) {
    match at {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Folds one filesystem event into the pending batch; returns whether it
/// grew. Removals are left for the next restart to reconcile.
fn collect_additions(event: &Event, pending: &mut Vec<PathBuf>) -> bool {
    let before = pending.len();
    match &event.kind {
        EventKind::Create(CreateKind::File) => {
            for path in event.paths.iter().filter(|p| is_image(p)) {
                debug!(path = %path.display(), "fs: new image");
                pending.push(path.clone());
            }
        }
        EventKind::Modify(ModifyKind::Name(_)) => {
            // Moves land as renames. Decide per-path by existence.
            for path in event.paths.iter().filter(|p| is_image(p)) {
                if path.exists() {
                    debug!(path = %path.display(), "fs: image moved in");
                    pending.push(path.clone());
                } else {
                    debug!(path = %path.display(), "image moved away; ignored until next restart");
                }
            }
        }
        EventKind::Remove(_) => {
            debug!(paths = ?event.paths, "removal ignored until next restart");
        }
        _ => {
            debug!(kind = ?event.kind, "fs: ignored");
        }
    }
    pending.len() > before
}

#[inline]
fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase()),
        Some(ref e) if ["jpg", "jpeg", "png", "gif", "bmp"].contains(&e.as_str())
    )
}
