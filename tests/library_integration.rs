use std::fs;
use std::time::Duration;

use frame_control::events::ControlCommand;
use frame_control::tasks::library;
use tempfile::tempdir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn arrivals_are_batched_into_one_announcement() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path().join("lib");
    fs::create_dir_all(&lib).unwrap();

    let (command_tx, mut command_rx) = mpsc::channel::<ControlCommand>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(library::run(
        lib.clone(),
        Duration::from_millis(400),
        command_tx,
        cancel.clone(),
    ));

    // Let the watcher register before copying files in.
    tokio::time::sleep(Duration::from_millis(300)).await;
    fs::write(lib.join("b.jpg"), b"x").unwrap();
    fs::write(lib.join("a.jpg"), b"x").unwrap();
    fs::write(lib.join("notes.txt"), b"x").unwrap();

    let command = tokio::time::timeout(Duration::from_secs(5), command_rx.recv())
        .await
        .expect("timeout waiting for new-image announcement")
        .expect("library task closed its channel");
    assert_eq!(
        command,
        ControlCommand::ShowNewImages {
            paths: vec![lib.join("a.jpg"), lib.join("b.jpg")],
        }
    );

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn removals_are_not_announced() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path().join("lib");
    fs::create_dir_all(&lib).unwrap();
    let old = lib.join("old.jpg");
    fs::write(&old, b"x").unwrap();

    let (command_tx, mut command_rx) = mpsc::channel::<ControlCommand>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(library::run(
        lib.clone(),
        Duration::from_millis(200),
        command_tx,
        cancel.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(300)).await;
    fs::remove_file(&old).unwrap();
    assert!(
        tokio::time::timeout(Duration::from_millis(700), command_rx.recv())
            .await
            .is_err(),
        "a removal must not trigger an announcement"
    );

    // The watcher survived the removal and still reports real arrivals.
    fs::write(lib.join("fresh.png"), b"x").unwrap();
    let command = tokio::time::timeout(Duration::from_secs(5), command_rx.recv())
        .await
        .expect("timeout waiting for new-image announcement")
        .expect("library task closed its channel");
    assert_eq!(
        command,
        ControlCommand::ShowNewImages {
            paths: vec![lib.join("fresh.png")],
        }
    );

    cancel.cancel();
    let _ = handle.await;
}
