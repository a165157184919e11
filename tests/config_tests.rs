use std::path::PathBuf;
use std::time::Duration;

use frame_control::config::{ButtonConfig, Configuration, DEFAULT_CONTROL_SOCKET_PATH};
use frame_control::gesture::Polarity;

#[test]
fn parse_kebab_case_config() {
    let yaml = r#"
photo-library-path: "/photos"
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.photo_library_path, PathBuf::from("/photos"));
    assert_eq!(cfg.library_debounce, Duration::from_secs(2));
    assert_eq!(cfg.button.key_code, "KEY_PROG1");
    assert_eq!(cfg.viewer.program, "fbi");
    assert_eq!(cfg.slideshow.interval, Duration::from_secs(10));
    assert!(cfg.slideshow.auto_start);
    assert_eq!(
        cfg.control.socket_path,
        PathBuf::from(DEFAULT_CONTROL_SOCKET_PATH)
    );
}

#[test]
fn parse_humantime_durations() {
    let yaml = r#"
photo-library-path: "/photos"
library-debounce: 5s
button:
  key-code: KEY_POWER
  double-press-window: 250ms
  long-press-after: 1500ms
  reset-press-after: 4s
viewer:
  blend: 750ms
slideshow:
  interval: 45s
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.library_debounce, Duration::from_secs(5));
    assert_eq!(cfg.button.key_code, "KEY_POWER");
    assert_eq!(cfg.button.double_press_window, Duration::from_millis(250));
    assert_eq!(cfg.button.long_press_after, Duration::from_millis(1500));
    assert_eq!(cfg.button.reset_press_after, Duration::from_secs(4));
    assert_eq!(cfg.viewer.blend, Some(Duration::from_millis(750)));
    assert_eq!(cfg.slideshow.interval, Duration::from_secs(45));
    // untouched sections keep their defaults
    assert_eq!(cfg.viewer.program, "fbi");
    assert_eq!(cfg.watchdog.poll_interval, Duration::from_secs(2));
}

#[test]
fn parse_button_polarity() {
    let yaml = r#"
photo-library-path: "/photos"
button:
  polarity: normally-closed
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.button.polarity, Polarity::NormallyClosed);
}

#[test]
fn parse_viewer_extra_args() {
    let yaml = r#"
photo-library-path: "/photos"
viewer:
  console: 2
  framebuffer: /dev/fb1
  extra-args: ["--random", "--readahead"]
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.viewer.console, 2);
    assert_eq!(cfg.viewer.framebuffer, PathBuf::from("/dev/fb1"));
    assert_eq!(cfg.viewer.extra_args, vec!["--random", "--readahead"]);
}

#[test]
fn unknown_fields_are_rejected() {
    let yaml = r#"
photo-library-path: "/photos"
transition: fade
"#;
    let err = serde_yaml::from_str::<Configuration>(yaml).unwrap_err();
    assert!(err.to_string().contains("unknown field"));
}

#[test]
fn from_yaml_file_reads_and_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.yaml");
    std::fs::write(
        &path,
        "photo-library-path: \"/photos\"\nslideshow:\n  interval: 30s\n",
    )
    .unwrap();
    let cfg = Configuration::from_yaml_file(&path).unwrap();
    assert_eq!(cfg.slideshow.interval, Duration::from_secs(30));
}

#[test]
fn validated_accepts_a_complete_config() {
    let yaml = r#"
photo-library-path: "/photos"
button:
  key-code: KEY_POWER
  polarity: normally-open
viewer:
  console: 2
control:
  socket-path: /tmp/frame.sock
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.viewer.console, 2);
}

#[test]
fn validated_rejects_empty_library_path() {
    let cfg = Configuration::default();
    assert!(cfg.validated().is_err());
}

#[test]
fn validated_rejects_inverted_press_windows() {
    let cfg = Configuration {
        photo_library_path: PathBuf::from("/photos"),
        button: ButtonConfig {
            double_press_window: Duration::from_secs(2),
            long_press_after: Duration::from_secs(1),
            ..ButtonConfig::default()
        },
        ..Configuration::default()
    };
    assert!(cfg.validated().is_err());
}

#[test]
fn validated_rejects_reset_window_not_past_long_press() {
    let cfg = Configuration {
        photo_library_path: PathBuf::from("/photos"),
        button: ButtonConfig {
            long_press_after: Duration::from_secs(3),
            reset_press_after: Duration::from_secs(3),
            ..ButtonConfig::default()
        },
        ..Configuration::default()
    };
    assert!(cfg.validated().is_err());
}

#[test]
fn validated_rejects_socket_path_without_file_name() {
    let yaml = r#"
photo-library-path: "/photos"
control:
  socket-path: /
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validated().is_err());
}
