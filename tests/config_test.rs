//! Tests for configuration loading and validation

use pose_capture::config::{Config, SmoothingMode, ValidationPolicy, EXAMPLE_CONFIG};
use pose_capture::template::PoseKind;
use pose_capture::Error;

#[test]
fn test_partial_yaml_keeps_defaults() {
    let yaml = "
smoothing:
  mode: kalman
capture:
  side_countdown_start: 4
validation:
  policy: offset_threshold
";
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.smoothing.mode, SmoothingMode::Kalman);
    assert_eq!(config.capture.countdown_start(PoseKind::Side), 4);
    assert_eq!(config.capture.countdown_start(PoseKind::Front), 3);
    assert_eq!(config.validation.policy, ValidationPolicy::OffsetThreshold);
    assert_eq!(config.orientation, Config::default().orientation);
    config.validate().unwrap();
    assert_eq!(config.create_smoother().unwrap().filter_name(), "KalmanFilter");
}

#[test]
fn test_file_round_trip() {
    let path = std::env::temp_dir().join(format!("pose-capture-config-{}.yaml", std::process::id()));
    let mut config = Config::default();
    config.camera.jpeg_quality = 80;
    config.templates.front = "/variants/front_b.png".to_string();
    config.to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.templates.path(PoseKind::Front), "/variants/front_b.png");
    std::fs::remove_file(&path).ok();
}

#[test]
fn test_example_config_is_valid() {
    let config = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
    config.validate().unwrap();
}

#[test]
fn test_invalid_values_rejected() {
    let mut config = Config::default();
    config.smoothing.alpha = 0.0;
    assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

    let mut config = Config::default();
    config.capture.countdown_tick_ms = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.validation.template_height_ratio = 1.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.camera.minimum.width = config.camera.ideal.width + 1;
    assert!(config.validate().is_err());
}

#[test]
fn test_malformed_yaml() {
    assert!(matches!(Config::from_yaml("smoothing: [1, 2"), Err(Error::ConfigError(_))));
    assert!(matches!(
        Config::from_file("/nonexistent/pose-capture.yaml"),
        Err(Error::Io(_))
    ));
}
