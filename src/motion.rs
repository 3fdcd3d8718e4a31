//! Motion smoothing and the "device held upright" check.
//!
//! The smoother rate-limits raw accelerometer samples and runs them through
//! the configured [`MotionFilter`]. The classifier turns a smoothed vector
//! into a boolean: the phone is upright when gravity falls almost entirely on
//! the positive y axis.

use crate::{
    config::{SmoothingConfig, SmoothingMode},
    constants::{GRAVITY, UPRIGHT_THRESHOLD},
    filters::{dead_zone::DeadZoneFilter, kalman::KalmanFilter, low_pass::LowPassFilter, MotionFilter},
    Result,
};
use log::debug;

/// One raw accelerometer reading (acceleration including gravity)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub x: f64,
    pub y: f64,
    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl MotionSample {
    #[must_use]
    pub fn new(x: f64, y: f64, timestamp_ms: u64) -> Self {
        Self { x, y, timestamp_ms }
    }
}

/// Rate-limited motion smoother with a pluggable filter
pub struct MotionSmoother {
    config: SmoothingConfig,
    filter: Box<dyn MotionFilter>,
    last_update_ms: Option<u64>,
}

impl MotionSmoother {
    /// Create a smoother from configuration
    ///
    /// # Errors
    ///
    /// Returns `FilterError` if the configuration is out of range
    pub fn new(config: SmoothingConfig) -> Result<Self> {
        config.validate()?;
        let filter = Self::build_filter(&config);
        debug!("Motion smoother using {}", filter.name());
        Ok(Self {
            config,
            filter,
            last_update_ms: None,
        })
    }

    fn build_filter(config: &SmoothingConfig) -> Box<dyn MotionFilter> {
        match config.effective_mode() {
            SmoothingMode::Kalman => Box::new(KalmanFilter::new(
                config.kalman_process_noise,
                config.kalman_measurement_noise,
            )),
            SmoothingMode::LowPass => Box::new(LowPassFilter::new(config.alpha)),
            SmoothingMode::Advanced | SmoothingMode::Auto => Box::new(DeadZoneFilter::new(
                config.alpha,
                config.dead_zone,
                config.velocity_damping,
                config.max_velocity,
            )),
        }
    }

    /// Smooth one sample.
    ///
    /// Returns `None` when the sample arrives sooner than the minimum update
    /// interval after the previous accepted one; the throttled sample does
    /// not touch the filter state.
    #[allow(clippy::cast_precision_loss)] // sample intervals are small
    pub fn smooth(&mut self, sample: MotionSample) -> Option<(f64, f64)> {
        let dt_ms = match self.last_update_ms {
            Some(last) => {
                let elapsed = sample.timestamp_ms.saturating_sub(last);
                if elapsed < self.config.min_update_interval_ms {
                    return None;
                }
                Some(elapsed as f64)
            }
            None => None,
        };

        self.last_update_ms = Some(sample.timestamp_ms);
        Some(self.filter.apply(sample.x, sample.y, dt_ms))
    }

    /// Zero all internal state
    pub fn reset(&mut self) {
        self.filter.reset();
        self.last_update_ms = None;
    }

    /// Apply a new configuration at runtime.
    ///
    /// The running filter keeps its state and picks up the new parameters.
    /// Only a change of effective mode swaps the filter, which then starts
    /// at rest. The throttle clock is kept either way.
    ///
    /// # Errors
    ///
    /// Returns `FilterError` if the new configuration is out of range; the
    /// current configuration stays in place
    pub fn update_config(&mut self, config: SmoothingConfig) -> Result<()> {
        config.validate()?;
        if config.effective_mode() == self.config.effective_mode() {
            self.filter.retune(&config);
        } else {
            self.filter = Self::build_filter(&config);
            debug!("Motion smoother switched to {}", self.filter.name());
        }
        self.config = config;
        Ok(())
    }

    /// Change individual parameters on top of the current configuration
    ///
    /// # Errors
    ///
    /// See [`update_config`](Self::update_config)
    pub fn adjust(&mut self, edit: impl FnOnce(&mut SmoothingConfig)) -> Result<()> {
        let mut config = self.config.clone();
        edit(&mut config);
        self.update_config(config)
    }

    /// Name of the active filter
    #[must_use]
    pub fn filter_name(&self) -> &str {
        self.filter.name()
    }

    /// Current velocity estimate of the active filter
    #[must_use]
    pub fn velocity(&self) -> (f64, f64) {
        self.filter.velocity()
    }

    #[must_use]
    pub fn last_update_ms(&self) -> Option<u64> {
        self.last_update_ms
    }

    #[must_use]
    pub fn config(&self) -> &SmoothingConfig {
        &self.config
    }
}

/// Result of classifying one smoothed reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    /// Smoothed x, clamped to ±gravity
    pub x: f64,
    /// Smoothed y, clamped to ±gravity
    pub y: f64,
    pub upright: bool,
}

impl Orientation {
    /// Bubble-level offset in [-1, 1] on each axis, 0 meaning perfectly upright
    #[must_use]
    pub fn level_offset(&self, gravity: f64) -> (f64, f64) {
        if gravity <= 0.0 {
            return (0.0, 0.0);
        }
        let dx = (self.x / gravity).clamp(-1.0, 1.0);
        let dy = ((gravity - self.y) / gravity).clamp(-1.0, 1.0);
        (dx, dy)
    }
}

/// Decides whether a smoothed acceleration vector means "held upright"
#[derive(Debug, Clone, Copy)]
pub struct OrientationClassifier {
    threshold: f64,
    gravity: f64,
    invert_y: bool,
}

impl Default for OrientationClassifier {
    fn default() -> Self {
        Self::new(UPRIGHT_THRESHOLD, GRAVITY, false)
    }
}

impl OrientationClassifier {
    #[must_use]
    pub fn new(threshold: f64, gravity: f64, invert_y: bool) -> Self {
        Self {
            threshold,
            gravity,
            invert_y,
        }
    }

    /// Raw y as the rest of the pipeline expects it. Some platforms report
    /// the y axis with the opposite sign.
    #[must_use]
    pub fn normalize_raw(&self, sample: MotionSample) -> MotionSample {
        if self.invert_y {
            MotionSample { y: -sample.y, ..sample }
        } else {
            sample
        }
    }

    #[must_use]
    pub fn classify(&self, smoothed: (f64, f64)) -> Orientation {
        let x = smoothed.0.clamp(-self.gravity, self.gravity);
        let y = smoothed.1.clamp(-self.gravity, self.gravity);
        let upright = x.abs() <= self.threshold && (y.abs() - self.gravity).abs() <= self.threshold && y > 0.0;
        Orientation { x, y, upright }
    }

    #[must_use]
    pub fn gravity(&self) -> f64 {
        self.gravity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smoother(mode: SmoothingMode) -> MotionSmoother {
        MotionSmoother::new(SmoothingConfig {
            mode,
            ..SmoothingConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_throttle_within_interval() {
        let mut s = smoother(SmoothingMode::Advanced);
        assert!(s.smooth(MotionSample::new(1.0, 9.8, 1000)).is_some());
        assert!(s.smooth(MotionSample::new(1.0, 9.8, 1010)).is_none());
        assert!(s.smooth(MotionSample::new(1.0, 9.8, 1016)).is_some());
    }

    #[test]
    fn test_throttled_sample_does_not_move_clock() {
        let mut s = smoother(SmoothingMode::LowPass);
        s.smooth(MotionSample::new(0.0, 0.0, 100));
        s.smooth(MotionSample::new(0.0, 0.0, 110));
        assert_eq!(s.last_update_ms(), Some(100));
    }

    #[test]
    fn test_auto_mode_selection() {
        let plain = MotionSmoother::new(SmoothingConfig {
            dead_zone: 0.0,
            velocity_damping: 1.0,
            ..SmoothingConfig::default()
        })
        .unwrap();
        assert_eq!(plain.filter_name(), "LowPassFilter");

        let advanced = MotionSmoother::new(SmoothingConfig::default()).unwrap();
        assert_eq!(advanced.filter_name(), "DeadZoneFilter");

        assert_eq!(smoother(SmoothingMode::Kalman).filter_name(), "KalmanFilter");
    }

    #[test]
    fn test_reset_clears_clock_and_state() {
        let mut s = smoother(SmoothingMode::LowPass);
        s.smooth(MotionSample::new(5.0, 5.0, 0));
        s.reset();
        assert_eq!(s.last_update_ms(), None);
        let first = s.smooth(MotionSample::new(0.0, 0.0, 1)).unwrap();
        assert_eq!(first, (0.0, 0.0));
    }

    #[test]
    fn test_update_config_switches_mode() {
        let mut s = smoother(SmoothingMode::LowPass);
        s.update_config(SmoothingConfig {
            mode: SmoothingMode::Kalman,
            ..SmoothingConfig::default()
        })
        .unwrap();
        assert_eq!(s.filter_name(), "KalmanFilter");
        assert!(s.update_config(SmoothingConfig {
            alpha: 0.0,
            ..SmoothingConfig::default()
        })
        .is_err());
        assert_eq!(s.config().mode, SmoothingMode::Kalman);
    }

    #[test]
    fn test_update_config_keeps_filter_state() {
        let mut s = smoother(SmoothingMode::LowPass);
        let mut last = (0.0, 0.0);
        for i in 0..50 {
            last = s.smooth(MotionSample::new(0.0, 9.8, i * 20)).unwrap();
        }

        s.adjust(|c| c.alpha = 0.5).unwrap();
        assert_eq!(s.filter_name(), "LowPassFilter");
        assert_eq!(s.last_update_ms(), Some(980));
        assert_eq!(s.config().mode, SmoothingMode::LowPass);
        assert!((s.config().alpha - 0.5).abs() < f64::EPSILON);

        // Continues from the settled value instead of ramping up from rest
        let (_, y) = s.smooth(MotionSample::new(0.0, 9.8, 1000)).unwrap();
        assert!((y - 0.5f64.mul_add(9.8 - last.1, last.1)).abs() < 1e-9);
        assert!(y > 9.0);
    }

    #[test]
    fn test_upright_classification() {
        let c = OrientationClassifier::default();
        assert!(c.classify((0.2, 9.6)).upright);
        assert!(c.classify((0.0, 12.0)).upright); // clamped to 9.8
        assert!(!c.classify((0.6, 9.8)).upright);
        assert!(!c.classify((0.0, 9.0)).upright);
        assert!(!c.classify((0.0, -9.8)).upright);
    }

    #[test]
    fn test_invert_y() {
        let c = OrientationClassifier::new(0.5, 9.8, true);
        let s = c.normalize_raw(MotionSample::new(0.1, -9.8, 5));
        assert_eq!(s.y, 9.8);
        assert_eq!(s.timestamp_ms, 5);
    }

    #[test]
    fn test_level_offset() {
        let o = OrientationClassifier::default().classify((0.0, 9.8));
        assert_eq!(o.level_offset(9.8), (0.0, 0.0));
    }
}
