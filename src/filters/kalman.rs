use super::MotionFilter;
use crate::config::SmoothingConfig;
use crate::constants::KALMAN_INITIAL_COVARIANCE;

/// One-dimensional Kalman filter for a slowly varying scalar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarKalman {
    /// Current state estimate
    pub estimate: f64,
    /// Error covariance of the estimate
    pub error_covariance: f64,
    process_noise: f64,
    measurement_noise: f64,
}

impl ScalarKalman {
    #[must_use]
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            estimate: 0.0,
            error_covariance: KALMAN_INITIAL_COVARIANCE,
            process_noise,
            measurement_noise,
        }
    }

    /// Predict + update with one measurement, returning the new estimate
    pub fn update(&mut self, measurement: f64) -> f64 {
        // Predict
        self.error_covariance += self.process_noise;

        // Update
        let gain = self.error_covariance / (self.error_covariance + self.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.error_covariance *= 1.0 - gain;

        self.estimate
    }

    pub fn reset(&mut self) {
        self.estimate = 0.0;
        self.error_covariance = KALMAN_INITIAL_COVARIANCE;
    }

    /// Change the noise model; the estimate and covariance carry over
    pub fn set_noise(&mut self, process_noise: f64, measurement_noise: f64) {
        self.process_noise = process_noise;
        self.measurement_noise = measurement_noise;
    }
}

/// Independent scalar Kalman filters on each axis
pub struct KalmanFilter {
    x: ScalarKalman,
    y: ScalarKalman,
}

impl KalmanFilter {
    #[must_use]
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            x: ScalarKalman::new(process_noise, measurement_noise),
            y: ScalarKalman::new(process_noise, measurement_noise),
        }
    }

    /// Per-axis filter state
    #[must_use]
    pub fn axes(&self) -> (&ScalarKalman, &ScalarKalman) {
        (&self.x, &self.y)
    }
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(
            crate::constants::KALMAN_PROCESS_NOISE,
            crate::constants::KALMAN_MEASUREMENT_NOISE,
        )
    }
}

impl MotionFilter for KalmanFilter {
    fn apply(&mut self, x: f64, y: f64, _dt_ms: Option<f64>) -> (f64, f64) {
        (self.x.update(x), self.y.update(y))
    }

    fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }

    fn retune(&mut self, config: &SmoothingConfig) {
        for axis in [&mut self.x, &mut self.y] {
            axis.set_noise(config.kalman_process_noise, config.kalman_measurement_noise);
        }
    }

    fn name(&self) -> &str {
        "KalmanFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_kalman_first_step() {
        let mut k = ScalarKalman::new(0.01, 0.1);
        let estimate = k.update(10.0);
        // P = 1.01, K = 1.01 / 1.11
        let gain = 1.01 / 1.11;
        assert!((estimate - 10.0 * gain).abs() < 1e-12);
        assert!((k.error_covariance - (1.0 - gain) * 1.01).abs() < 1e-12);
    }

    #[test]
    fn test_kalman_filter_converges() {
        let mut filter = KalmanFilter::default();
        let mut out = (0.0, 0.0);
        for _ in 0..100 {
            out = filter.apply(1.0, -2.0, Some(16.0));
        }
        assert!((out.0 - 1.0).abs() < 0.01);
        assert!((out.1 + 2.0).abs() < 0.01);
    }

    #[test]
    fn test_reset_restores_covariance() {
        let mut filter = KalmanFilter::default();
        filter.apply(5.0, 5.0, None);
        filter.reset();
        let (x, y) = filter.axes();
        assert_eq!(x.estimate, 0.0);
        assert_eq!(y.error_covariance, KALMAN_INITIAL_COVARIANCE);
    }
}
