use super::MotionFilter;
use crate::config::SmoothingConfig;

/// First-order low-pass filter.
///
/// The state starts at rest (0, 0), so the output ramps up from zero rather
/// than jumping to the first sample.
pub struct LowPassFilter {
    alpha: f64,
    smoothed_x: f64,
    smoothed_y: f64,
}

impl LowPassFilter {
    /// Create a new first-order low-pass filter
    ///
    /// # Panics
    ///
    /// Panics if alpha is not in the range (0, 1]
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        Self {
            alpha,
            smoothed_x: 0.0,
            smoothed_y: 0.0,
        }
    }
}

impl MotionFilter for LowPassFilter {
    fn apply(&mut self, x: f64, y: f64, _dt_ms: Option<f64>) -> (f64, f64) {
        self.smoothed_x = self.alpha.mul_add(x - self.smoothed_x, self.smoothed_x);
        self.smoothed_y = self.alpha.mul_add(y - self.smoothed_y, self.smoothed_y);
        (self.smoothed_x, self.smoothed_y)
    }

    fn reset(&mut self) {
        self.smoothed_x = 0.0;
        self.smoothed_y = 0.0;
    }

    fn retune(&mut self, config: &SmoothingConfig) {
        self.alpha = config.alpha;
    }

    fn name(&self) -> &str {
        "LowPassFilter"
    }
}
