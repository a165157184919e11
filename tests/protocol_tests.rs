use std::path::PathBuf;
use std::time::Duration;

use frame_control::config::ControlConfig;
use frame_control::events::ControlCommand;
use frame_control::tasks::control;
use tempfile::tempdir;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[test]
fn bare_commands_parse_from_their_kebab_tags() {
    let cases = [
        (r#"{"command":"start"}"#, ControlCommand::Start),
        (r#"{"command":"stop"}"#, ControlCommand::Stop),
        (r#"{"command":"next-image"}"#, ControlCommand::NextImage),
        (r#"{"command":"prev-image"}"#, ControlCommand::PrevImage),
        (r#"{"command":"zoom-in"}"#, ControlCommand::ZoomIn),
        (r#"{"command":"zoom-out"}"#, ControlCommand::ZoomOut),
        (r#"{"command":"toggle-info"}"#, ControlCommand::ToggleInfo),
        (r#"{"command":"toggle-verbose"}"#, ControlCommand::ToggleVerbose),
        (r#"{"command":"confirm"}"#, ControlCommand::Confirm),
        (r#"{"command":"random-image"}"#, ControlCommand::RandomImage),
        (r#"{"command":"sync"}"#, ControlCommand::Sync),
        (
            r#"{"command":"stop-slideshow"}"#,
            ControlCommand::StopSlideshow,
        ),
    ];
    for (json, expected) in cases {
        let parsed: ControlCommand = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, expected, "wire form {json}");
    }
}

#[test]
fn digit_carries_its_value() {
    let parsed: ControlCommand = serde_json::from_str(r#"{"command":"digit","value":5}"#).unwrap();
    assert_eq!(parsed, ControlCommand::Digit { value: 5 });
}

#[test]
fn go_to_image_carries_the_number() {
    let parsed: ControlCommand =
        serde_json::from_str(r#"{"command":"go-to-image","number":24}"#).unwrap();
    assert_eq!(parsed, ControlCommand::GoToImage { number: 24 });
}

#[test]
fn toggle_slideshow_accepts_a_humantime_interval() {
    let parsed: ControlCommand =
        serde_json::from_str(r#"{"command":"toggle-slideshow","interval":"30s"}"#).unwrap();
    assert_eq!(
        parsed,
        ControlCommand::ToggleSlideshow {
            interval: Some(Duration::from_secs(30)),
            advance: true,
        }
    );
}

#[test]
fn start_slideshow_defaults_interval_and_advance() {
    let parsed: ControlCommand = serde_json::from_str(r#"{"command":"start-slideshow"}"#).unwrap();
    assert_eq!(
        parsed,
        ControlCommand::StartSlideshow {
            interval: None,
            advance: true,
        }
    );
}

#[test]
fn start_slideshow_can_disable_the_immediate_advance() {
    let parsed: ControlCommand =
        serde_json::from_str(r#"{"command":"start-slideshow","interval":"1m","advance":false}"#)
            .unwrap();
    assert_eq!(
        parsed,
        ControlCommand::StartSlideshow {
            interval: Some(Duration::from_secs(60)),
            advance: false,
        }
    );
}

#[test]
fn raw_button_names_ride_the_button_command() {
    let parsed: ControlCommand =
        serde_json::from_str(r#"{"command":"button","name":"BTN_RIGHT"}"#).unwrap();
    assert_eq!(
        parsed,
        ControlCommand::Button {
            name: "BTN_RIGHT".into(),
        }
    );
}

#[test]
fn show_new_images_lists_paths() {
    let parsed: ControlCommand = serde_json::from_str(
        r#"{"command":"show-new-images","paths":["/photos/a.jpg","/photos/b.jpg"]}"#,
    )
    .unwrap();
    assert_eq!(
        parsed,
        ControlCommand::ShowNewImages {
            paths: vec![
                PathBuf::from("/photos/a.jpg"),
                PathBuf::from("/photos/b.jpg"),
            ],
        }
    );
}

#[test]
fn unknown_commands_are_rejected() {
    assert!(serde_json::from_str::<ControlCommand>(r#"{"command":"reboot"}"#).is_err());
    assert!(serde_json::from_str::<ControlCommand>(r#"{}"#).is_err());
    assert!(serde_json::from_str::<ControlCommand>("next-image").is_err());
}

async fn connect_when_ready(socket_path: &std::path::Path) -> UnixStream {
    timeout(Duration::from_secs(5), async {
        loop {
            match UnixStream::connect(socket_path).await {
                Ok(stream) => break stream,
                Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
            }
        }
    })
    .await
    .expect("timeout waiting for control socket")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn control_socket_accepts_line_delimited_commands() {
    let tmp = tempdir().unwrap();
    let cfg = ControlConfig {
        enabled: true,
        socket_path: tmp.path().join("control.sock"),
    };
    let socket_path = cfg.socket_path.clone();

    let (command_tx, mut command_rx) = mpsc::channel::<ControlCommand>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(control::run(cfg, command_tx, cancel.clone()));

    let mut stream = connect_when_ready(&socket_path).await;
    stream
        .write_all(
            b"{\"command\":\"next-image\"}\n\
              {\"command\":\"button\",\"name\":\"BTN_5\"}\n\
              not json\n\
              {\"command\":\"digit\",\"value\":7}\n",
        )
        .await
        .unwrap();
    drop(stream);

    // The malformed line is dropped; the raw button name resolves to a digit.
    let mut received = Vec::new();
    for _ in 0..3 {
        let command = timeout(Duration::from_secs(5), command_rx.recv())
            .await
            .expect("timeout waiting for control command")
            .unwrap();
        received.push(command);
    }
    assert_eq!(
        received,
        vec![
            ControlCommand::NextImage,
            ControlCommand::Digit { value: 5 },
            ControlCommand::Digit { value: 7 },
        ]
    );

    cancel.cancel();
    let _ = handle.await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn control_socket_accepts_a_raw_unterminated_write() {
    let tmp = tempdir().unwrap();
    let cfg = ControlConfig {
        enabled: true,
        socket_path: tmp.path().join("control.sock"),
    };
    let socket_path = cfg.socket_path.clone();

    let (command_tx, mut command_rx) = mpsc::channel::<ControlCommand>(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(control::run(cfg, command_tx, cancel.clone()));

    // Clients may write one bare JSON object and close without a newline.
    let mut stream = connect_when_ready(&socket_path).await;
    stream
        .write_all(br#"{"command":"toggle-slideshow"}"#)
        .await
        .unwrap();
    drop(stream);

    let command = timeout(Duration::from_secs(5), command_rx.recv())
        .await
        .expect("timeout waiting for control command")
        .unwrap();
    assert_eq!(
        command,
        ControlCommand::ToggleSlideshow {
            interval: None,
            advance: true,
        }
    );

    cancel.cancel();
    let _ = handle.await;
}
