//! Configuration management for the guided capture pipeline

use crate::{
    constants::{
        CAMERA_IDEAL_FPS, CAMERA_IDEAL_HEIGHT, CAMERA_IDEAL_WIDTH, CAMERA_MIN_FPS, CAMERA_MIN_HEIGHT, CAMERA_MIN_WIDTH,
        COUNTDOWN_TICK_MS, DEFAULT_DEAD_ZONE, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_VELOCITY, DEFAULT_MIN_UPDATE_INTERVAL_MS,
        DEFAULT_SMOOTHING_ALPHA, DEFAULT_VELOCITY_DAMPING, FRONT_COUNTDOWN_START, GRAVITY, KALMAN_MEASUREMENT_NOISE,
        KALMAN_PROCESS_NOISE, LEGACY_MAX_OFFSET_PX, LEGACY_MIN_PASSED_POINTS, MIN_KEYPOINT_SCORE, ORIENTATION_ALPHA,
        ORIENTATION_DEAD_ZONE, ORIENTATION_HOLD_MS, ORIENTATION_MAX_VELOCITY, ORIENTATION_VELOCITY_DAMPING,
        SIDE_COUNTDOWN_START, STABILITY_REQUIRED_MS, STABILITY_STEP_MS, TEMPLATE_HEIGHT_RATIO, UPRIGHT_THRESHOLD,
    },
    motion::{MotionSmoother, OrientationClassifier},
    template::PoseKind,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Motion smoother configuration
    pub smoothing: SmoothingConfig,

    /// Upright check configuration
    pub orientation: OrientationConfig,

    /// Capture flow timing
    pub capture: CaptureConfig,

    /// Pose validation configuration
    pub validation: ValidationConfig,

    /// Camera stream configuration
    pub camera: CameraConfig,

    /// Reference template locations
    pub templates: TemplatesConfig,
}

/// Which motion filter the smoother runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMode {
    /// Low-pass when dead zone is 0 and damping is 1, dead-zone + velocity otherwise
    #[default]
    Auto,
    LowPass,
    Advanced,
    Kalman,
}

/// Motion smoother parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Filter selection
    pub mode: SmoothingMode,

    /// Low-pass factor in (0, 1]
    pub alpha: f64,

    /// Raw magnitudes below this are treated as zero
    pub dead_zone: f64,

    /// Samples closer together than this are dropped
    pub min_update_interval_ms: u64,

    /// Velocity damping factor in [0, 1]
    pub velocity_damping: f64,

    /// Velocity clamp
    pub max_velocity: f64,

    /// Kalman process noise
    pub kalman_process_noise: f64,

    /// Kalman measurement noise
    pub kalman_measurement_noise: f64,
}

/// Upright check parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Tolerance around upright in m/s²
    pub threshold: f64,

    /// Gravity magnitude reported by the device
    pub gravity: f64,

    /// Continuous upright time required
    pub hold_ms: u64,

    /// Flip the sign of raw y readings
    pub invert_y: bool,
}

/// Capture flow timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Granularity of the stability and orientation timers
    pub stability_step_ms: u64,

    /// Continuous valid pose time before the countdown starts
    pub stability_required_ms: u64,

    /// First countdown value for the front photo
    pub front_countdown_start: u32,

    /// First countdown value for the side photo
    pub side_countdown_start: u32,

    /// Time between countdown ticks
    pub countdown_tick_ms: u64,

    /// Run the orientation step before the side photo
    pub require_orientation_for_side: bool,

    /// Average keypoints over recent frames before validating
    pub keypoint_smoothing: bool,

    /// Frames in the keypoint moving average
    pub keypoint_smoothing_window: usize,
}

/// Pose validity policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Every required keypoint must land in a zone of the right color
    #[default]
    Zones,
    /// Enough important keypoints within a pixel offset of a reference pose
    OffsetThreshold,
}

/// Pose validation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub policy: ValidationPolicy,

    /// Template height as a share of the video height
    pub template_height_ratio: f64,

    /// Keypoints scoring below this count as missing
    pub min_keypoint_score: f32,

    /// Offset policy: horizontal tolerance in pixels
    pub offset_max_x: f64,

    /// Offset policy: vertical tolerance in pixels
    pub offset_max_y: f64,

    /// Offset policy: important keypoints that must pass
    pub offset_min_points: usize,
}

/// Requested stream size and rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Camera stream parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Preferred stream settings
    pub ideal: StreamSettings,

    /// Lowest acceptable stream settings
    pub minimum: StreamSettings,

    /// Flip the display frame horizontally
    pub mirror_display: bool,

    /// JPEG quality for captured stills (1-100)
    pub jpeg_quality: u8,
}

/// Reference template paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory the template paths are relative to
    pub root: PathBuf,

    /// Front pose template
    pub front: String,

    /// Side pose template
    pub side: String,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            mode: SmoothingMode::Auto,
            alpha: DEFAULT_SMOOTHING_ALPHA,
            dead_zone: DEFAULT_DEAD_ZONE,
            min_update_interval_ms: DEFAULT_MIN_UPDATE_INTERVAL_MS,
            velocity_damping: DEFAULT_VELOCITY_DAMPING,
            max_velocity: DEFAULT_MAX_VELOCITY,
            kalman_process_noise: KALMAN_PROCESS_NOISE,
            kalman_measurement_noise: KALMAN_MEASUREMENT_NOISE,
        }
    }
}

impl SmoothingConfig {
    /// Heavier smoothing used while waiting for the device to be held upright
    #[must_use]
    pub fn orientation_preset() -> Self {
        Self {
            mode: SmoothingMode::Advanced,
            alpha: ORIENTATION_ALPHA,
            dead_zone: ORIENTATION_DEAD_ZONE,
            velocity_damping: ORIENTATION_VELOCITY_DAMPING,
            max_velocity: ORIENTATION_MAX_VELOCITY,
            ..Self::default()
        }
    }

    /// Resolve `Auto` into a concrete filter mode
    #[must_use]
    pub fn effective_mode(&self) -> SmoothingMode {
        match self.mode {
            SmoothingMode::Auto if self.dead_zone > 0.0 || self.velocity_damping < 1.0 => SmoothingMode::Advanced,
            SmoothingMode::Auto => SmoothingMode::LowPass,
            mode => mode,
        }
    }

    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// Returns `FilterError` describing the first out-of-range parameter
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(Error::FilterError("Alpha must be in (0, 1]".to_string()));
        }
        if !(self.dead_zone >= 0.0) {
            return Err(Error::FilterError("Dead zone must be non-negative".to_string()));
        }
        if !(0.0..=1.0).contains(&self.velocity_damping) {
            return Err(Error::FilterError("Velocity damping must be in [0, 1]".to_string()));
        }
        if !(self.max_velocity >= 0.0) {
            return Err(Error::FilterError("Max velocity must be non-negative".to_string()));
        }
        if !(self.kalman_process_noise > 0.0) || !(self.kalman_measurement_noise > 0.0) {
            return Err(Error::FilterError("Kalman noise values must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            threshold: UPRIGHT_THRESHOLD,
            gravity: GRAVITY,
            hold_ms: ORIENTATION_HOLD_MS,
            invert_y: false,
        }
    }
}

impl OrientationConfig {
    #[must_use]
    pub fn classifier(&self) -> OrientationClassifier {
        OrientationClassifier::new(self.threshold, self.gravity, self.invert_y)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            stability_step_ms: STABILITY_STEP_MS,
            stability_required_ms: STABILITY_REQUIRED_MS,
            front_countdown_start: FRONT_COUNTDOWN_START,
            side_countdown_start: SIDE_COUNTDOWN_START,
            countdown_tick_ms: COUNTDOWN_TICK_MS,
            require_orientation_for_side: true,
            keypoint_smoothing: false,
            keypoint_smoothing_window: crate::constants::KEYPOINT_SMOOTHING_WINDOW,
        }
    }
}

impl CaptureConfig {
    /// Countdown start value for the given photo
    #[must_use]
    pub fn countdown_start(&self, kind: PoseKind) -> u32 {
        match kind {
            PoseKind::Front => self.front_countdown_start,
            PoseKind::Side => self.side_countdown_start,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            policy: ValidationPolicy::Zones,
            template_height_ratio: TEMPLATE_HEIGHT_RATIO,
            min_keypoint_score: MIN_KEYPOINT_SCORE,
            offset_max_x: LEGACY_MAX_OFFSET_PX,
            offset_max_y: LEGACY_MAX_OFFSET_PX,
            offset_min_points: LEGACY_MIN_PASSED_POINTS,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            ideal: StreamSettings {
                width: CAMERA_IDEAL_WIDTH,
                height: CAMERA_IDEAL_HEIGHT,
                fps: CAMERA_IDEAL_FPS,
            },
            minimum: StreamSettings {
                width: CAMERA_MIN_WIDTH,
                height: CAMERA_MIN_HEIGHT,
                fps: CAMERA_MIN_FPS,
            },
            mirror_display: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            front: "/front_pose.png".to_string(),
            side: "/side_pose.png".to_string(),
        }
    }
}

impl TemplatesConfig {
    /// Template path for the given photo
    #[must_use]
    pub fn path(&self, kind: PoseKind) -> &str {
        match kind {
            PoseKind::Front => &self.front,
            PoseKind::Side => &self.side,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `ConfigError` if it does not parse
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the text does not parse
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on serialization failure and `Io` on write failure
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build the motion smoother described by the `smoothing` section
    ///
    /// # Errors
    ///
    /// Returns `FilterError` if the smoothing parameters are out of range
    pub fn create_smoother(&self) -> Result<MotionSmoother> {
        MotionSmoother::new(self.smoothing.clone())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        self.smoothing
            .validate()
            .map_err(|e| Error::ConfigError(format!("smoothing: {e}")))?;

        if !(self.orientation.threshold >= 0.0) || !(self.orientation.gravity > 0.0) {
            return Err(Error::ConfigError(
                "Orientation threshold must be non-negative and gravity positive".to_string(),
            ));
        }

        let capture = &self.capture;
        if capture.stability_step_ms == 0 {
            return Err(Error::ConfigError("Stability step must be greater than 0".to_string()));
        }
        if capture.stability_required_ms < capture.stability_step_ms {
            return Err(Error::ConfigError(
                "Required stability time must be at least one step".to_string(),
            ));
        }
        if capture.countdown_tick_ms == 0 {
            return Err(Error::ConfigError("Countdown tick must be greater than 0".to_string()));
        }
        if capture.front_countdown_start == 0 || capture.side_countdown_start == 0 {
            return Err(Error::ConfigError("Countdown must start above 0".to_string()));
        }
        if capture.keypoint_smoothing_window == 0 {
            return Err(Error::ConfigError(
                "Keypoint smoothing window must be greater than 0".to_string(),
            ));
        }

        let validation = &self.validation;
        if !(validation.template_height_ratio > 0.0 && validation.template_height_ratio <= 1.0) {
            return Err(Error::ConfigError(
                "Template height ratio must be in (0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&validation.min_keypoint_score) {
            return Err(Error::ConfigError(
                "Minimum keypoint score must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(validation.offset_max_x >= 0.0) || !(validation.offset_max_y >= 0.0) {
            return Err(Error::ConfigError("Offset tolerances must be non-negative".to_string()));
        }

        let camera = &self.camera;
        if camera.minimum.width > camera.ideal.width
            || camera.minimum.height > camera.ideal.height
            || camera.minimum.fps > camera.ideal.fps
        {
            return Err(Error::ConfigError(
                "Minimum camera settings must not exceed the ideal ones".to_string(),
            ));
        }
        if camera.ideal.width == 0 || camera.ideal.height == 0 {
            return Err(Error::ConfigError("Camera resolution must be non-zero".to_string()));
        }
        if !(1..=100).contains(&camera.jpeg_quality) {
            return Err(Error::ConfigError("JPEG quality must be between 1 and 100".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Guided Pose Capture Configuration

# Motion smoother (accelerometer)
smoothing:
  mode: "auto"            # auto, low_pass, advanced, kalman
  alpha: 0.15
  dead_zone: 0.1
  min_update_interval_ms: 16
  velocity_damping: 0.8
  max_velocity: 2.0
  kalman_process_noise: 0.01
  kalman_measurement_noise: 0.1

# Upright check before the side photo
orientation:
  threshold: 0.5
  gravity: 9.8
  hold_ms: 2000
  invert_y: false

# Capture flow timing
capture:
  stability_step_ms: 100
  stability_required_ms: 2000
  front_countdown_start: 3
  side_countdown_start: 2
  countdown_tick_ms: 1000
  require_orientation_for_side: true
  keypoint_smoothing: false
  keypoint_smoothing_window: 10

# Pose validation
validation:
  policy: "zones"         # zones, offset_threshold
  template_height_ratio: 0.8
  min_keypoint_score: 0.3
  offset_max_x: 50.0
  offset_max_y: 50.0
  offset_min_points: 6

# Camera stream
camera:
  ideal:
    width: 1920
    height: 1080
    fps: 30
  minimum:
    width: 1280
    height: 720
    fps: 24
  mirror_display: true
  jpeg_quality: 95

# Reference templates
templates:
  root: "assets"
  front: "/front_pose.png"
  side: "/side_pose.png"
"#;
