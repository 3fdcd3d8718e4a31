use super::MotionFilter;
use crate::config::SmoothingConfig;

/// Low-pass filter with a dead zone and a damped velocity term.
///
/// Raw components whose magnitude is below `dead_zone` are zeroed. The
/// velocity is the raw delta over elapsed time, clamped to `max_velocity`
/// and then damped, and is added on top of the low-pass output so the
/// filtered signal keeps up with deliberate motion.
pub struct DeadZoneFilter {
    alpha: f64,
    dead_zone: f64,
    velocity_damping: f64,
    max_velocity: f64,

    smoothed_x: f64,
    smoothed_y: f64,
    velocity_x: f64,
    velocity_y: f64,
    last_raw_x: f64,
    last_raw_y: f64,
}

impl DeadZoneFilter {
    /// # Panics
    ///
    /// Panics if alpha is not in (0, 1], damping is not in [0, 1],
    /// or either the dead zone or max velocity is negative.
    #[must_use]
    pub fn new(alpha: f64, dead_zone: f64, velocity_damping: f64, max_velocity: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        assert!(dead_zone >= 0.0, "Dead zone must be non-negative");
        assert!(
            (0.0..=1.0).contains(&velocity_damping),
            "Velocity damping must be in [0, 1]"
        );
        assert!(max_velocity >= 0.0, "Max velocity must be non-negative");

        Self {
            alpha,
            dead_zone,
            velocity_damping,
            max_velocity,
            smoothed_x: 0.0,
            smoothed_y: 0.0,
            velocity_x: 0.0,
            velocity_y: 0.0,
            last_raw_x: 0.0,
            last_raw_y: 0.0,
        }
    }

    fn gate(&self, value: f64) -> f64 {
        if value.abs() < self.dead_zone {
            0.0
        } else {
            value
        }
    }

    fn axis_velocity(&self, filtered: f64, last: f64, dt_secs: Option<f64>) -> f64 {
        let raw = match dt_secs {
            Some(dt) if dt > 0.0 => (filtered - last) / dt,
            _ => 0.0,
        };
        let clamped = if raw.is_nan() {
            0.0
        } else {
            raw.clamp(-self.max_velocity, self.max_velocity)
        };
        clamped * self.velocity_damping
    }
}

impl MotionFilter for DeadZoneFilter {
    fn apply(&mut self, x: f64, y: f64, dt_ms: Option<f64>) -> (f64, f64) {
        let filtered_x = self.gate(x);
        let filtered_y = self.gate(y);

        let dt_secs = dt_ms.map(|ms| ms / 1000.0);
        self.velocity_x = self.axis_velocity(filtered_x, self.last_raw_x, dt_secs);
        self.velocity_y = self.axis_velocity(filtered_y, self.last_raw_y, dt_secs);

        let step = dt_secs.unwrap_or(0.0);
        self.smoothed_x = self.alpha.mul_add(filtered_x, (1.0 - self.alpha) * self.smoothed_x) + self.velocity_x * step;
        self.smoothed_y = self.alpha.mul_add(filtered_y, (1.0 - self.alpha) * self.smoothed_y) + self.velocity_y * step;

        self.last_raw_x = filtered_x;
        self.last_raw_y = filtered_y;

        (self.smoothed_x, self.smoothed_y)
    }

    fn reset(&mut self) {
        self.smoothed_x = 0.0;
        self.smoothed_y = 0.0;
        self.velocity_x = 0.0;
        self.velocity_y = 0.0;
        self.last_raw_x = 0.0;
        self.last_raw_y = 0.0;
    }

    fn retune(&mut self, config: &SmoothingConfig) {
        self.alpha = config.alpha;
        self.dead_zone = config.dead_zone;
        self.velocity_damping = config.velocity_damping;
        self.max_velocity = config.max_velocity;
    }

    fn name(&self) -> &str {
        "DeadZoneFilter"
    }

    fn velocity(&self) -> (f64, f64) {
        (self.velocity_x, self.velocity_y)
    }
}
