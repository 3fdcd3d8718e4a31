use super::stability::StabilityTimer;
use crate::config::{Config, SmoothingConfig};
use crate::motion::{MotionSample, MotionSmoother, Orientation, OrientationClassifier};
use crate::Result;

/// Waits until the device has been held upright long enough
pub struct OrientationGate {
    smoother: MotionSmoother,
    classifier: OrientationClassifier,
    timer: StabilityTimer,
    last: Option<Orientation>,
}

impl OrientationGate {
    /// Build a gate with the heavy orientation smoothing preset
    ///
    /// # Errors
    ///
    /// Returns `FilterError` if the smoothing parameters are out of range
    pub fn new(config: &Config) -> Result<Self> {
        let smoothing = SmoothingConfig {
            min_update_interval_ms: config.smoothing.min_update_interval_ms,
            ..SmoothingConfig::orientation_preset()
        };
        Ok(Self {
            smoother: MotionSmoother::new(smoothing)?,
            classifier: config.orientation.classifier(),
            timer: StabilityTimer::new(config.capture.stability_step_ms, config.orientation.hold_ms),
            last: None,
        })
    }

    /// Feed a raw sensor sample. Returns the new classification, or `None`
    /// if the sample was throttled.
    ///
    /// A non-upright classification drops the hold immediately, even if the
    /// device is upright again by the next tick.
    pub fn on_sample(&mut self, sample: MotionSample) -> Option<Orientation> {
        let sample = self.classifier.normalize_raw(sample);
        let smoothed = self.smoother.smooth(sample)?;
        let orientation = self.classifier.classify(smoothed);
        if !orientation.upright {
            self.timer.reset();
        }
        self.last = Some(orientation);
        Some(orientation)
    }

    /// One timer step. Returns `true` once, when the hold time is reached.
    pub fn tick(&mut self) -> bool {
        let upright = self.last.is_some_and(|o| o.upright);
        self.timer.tick(upright)
    }

    pub fn reset(&mut self) {
        self.smoother.reset();
        self.timer.reset();
        self.last = None;
    }

    #[must_use]
    pub fn last(&self) -> Option<Orientation> {
        self.last
    }

    #[must_use]
    pub fn held_ms(&self) -> u64 {
        self.timer.accumulated_ms()
    }

    /// Bubble-level offset of the latest reading
    #[must_use]
    pub fn level_offset(&self) -> Option<(f64, f64)> {
        self.last.map(|o| o.level_offset(self.classifier.gravity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed `count` samples 20 ms apart starting at `t0`
    fn feed(gate: &mut OrientationGate, x: f64, y: f64, t0: u64, count: u64) {
        for i in 0..count {
            gate.on_sample(MotionSample::new(x, y, t0 + i * 20));
        }
    }

    #[test]
    fn test_upright_after_hold() {
        let mut gate = OrientationGate::new(&Config::default()).unwrap();
        feed(&mut gate, 0.0, 9.8, 0, 150);
        assert!(gate.last().unwrap().upright);
        let fired: Vec<u32> = (1..=25).filter(|_| gate.tick()).collect();
        assert_eq!(fired, vec![20]);
    }

    #[test]
    fn test_tilt_resets_hold() {
        let mut gate = OrientationGate::new(&Config::default()).unwrap();
        feed(&mut gate, 0.0, 9.8, 0, 150);
        for _ in 0..10 {
            gate.tick();
        }
        assert_eq!(gate.held_ms(), 1000);
        feed(&mut gate, 6.0, 7.0, 3000, 150);
        assert!(!gate.last().unwrap().upright);
        assert!(!gate.tick());
        assert_eq!(gate.held_ms(), 0);
    }

    #[test]
    fn test_tilt_between_ticks_resets_hold() {
        let mut gate = OrientationGate::new(&Config::default()).unwrap();
        feed(&mut gate, 0.0, 9.8, 0, 150);
        assert!((0..15).all(|_| !gate.tick()));
        assert_eq!(gate.held_ms(), 1500);

        // Brief tilt, then upright again before the next tick
        let tilted: Vec<bool> = (0..5)
            .filter_map(|i| gate.on_sample(MotionSample::new(9.8, 9.8, 3000 + i * 20)))
            .map(|o| o.upright)
            .collect();
        assert!(tilted.contains(&false));
        assert_eq!(gate.held_ms(), 0);
        feed(&mut gate, 0.0, 9.8, 3100, 60);
        assert!(gate.last().unwrap().upright);

        let fired: Vec<u32> = (1..=25).filter(|_| gate.tick()).collect();
        assert_eq!(fired, vec![20]);
    }

    #[test]
    fn test_no_samples_never_fires() {
        let mut gate = OrientationGate::new(&Config::default()).unwrap();
        assert!((0..50).all(|_| !gate.tick()));
        assert!(gate.level_offset().is_none());
    }
}
