//! Constants used throughout the capture pipeline

/// Number of keypoints produced by the single-pose estimator
pub const NUM_KEYPOINTS: usize = 17;

/// Default low-pass factor for the motion smoother
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.15;
/// Raw acceleration magnitudes below this are treated as zero
pub const DEFAULT_DEAD_ZONE: f64 = 0.1;
/// Minimum time between two accepted sensor samples (~60 Hz)
pub const DEFAULT_MIN_UPDATE_INTERVAL_MS: u64 = 16;
/// Per-step velocity damping factor
pub const DEFAULT_VELOCITY_DAMPING: f64 = 0.8;
/// Velocity clamp
pub const DEFAULT_MAX_VELOCITY: f64 = 2.0;

/// Scalar Kalman process noise
pub const KALMAN_PROCESS_NOISE: f64 = 0.01;
/// Scalar Kalman measurement noise
pub const KALMAN_MEASUREMENT_NOISE: f64 = 0.1;
/// Scalar Kalman initial error covariance
pub const KALMAN_INITIAL_COVARIANCE: f64 = 1.0;

/// Orientation step smoother preset
pub const ORIENTATION_ALPHA: f64 = 0.05;
pub const ORIENTATION_DEAD_ZONE: f64 = 0.2;
pub const ORIENTATION_VELOCITY_DAMPING: f64 = 0.1;
pub const ORIENTATION_MAX_VELOCITY: f64 = 10.0;

/// Standard gravity as reported by device accelerometers (m/s²)
pub const GRAVITY: f64 = 9.8;
/// Angular tolerance around "upright", expressed in m/s²
pub const UPRIGHT_THRESHOLD: f64 = 0.5;

/// Timer granularity for stability and orientation holds
pub const STABILITY_STEP_MS: u64 = 100;
/// Continuous valid time required before the countdown starts
pub const STABILITY_REQUIRED_MS: u64 = 2000;
/// Continuous upright time required to leave the orientation step
pub const ORIENTATION_HOLD_MS: u64 = 2000;

/// Countdown defaults
pub const FRONT_COUNTDOWN_START: u32 = 3;
pub const SIDE_COUNTDOWN_START: u32 = 2;
pub const COUNTDOWN_TICK_MS: u64 = 1000;

/// Template is scaled so its height covers this share of the video height
pub const TEMPLATE_HEIGHT_RATIO: f64 = 0.8;

/// Keypoints scoring below this are considered missing
pub const MIN_KEYPOINT_SCORE: f32 = 0.3;

/// Legacy offset policy: per-axis pixel tolerance
pub const LEGACY_MAX_OFFSET_PX: f64 = 50.0;
/// Legacy offset policy: points that must pass out of the important set
pub const LEGACY_MIN_PASSED_POINTS: usize = 6;

/// Moving-average window for keypoint smoothing
pub const KEYPOINT_SMOOTHING_WINDOW: usize = 10;

/// Camera constraints (ideal and minimum)
pub const CAMERA_IDEAL_WIDTH: u32 = 1920;
pub const CAMERA_IDEAL_HEIGHT: u32 = 1080;
pub const CAMERA_IDEAL_FPS: u32 = 30;
pub const CAMERA_MIN_WIDTH: u32 = 1280;
pub const CAMERA_MIN_HEIGHT: u32 = 720;
pub const CAMERA_MIN_FPS: u32 = 24;

/// Quality used when encoding captured stills
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Sentinel used for absent ids in cache keys
pub const CACHE_KEY_SENTINEL: &str = "none";

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
