//! Signal filtering algorithms for smoothing device motion samples.
//!
//! Accelerometer readings are noisy and arrive at irregular rates. The filters
//! here turn a raw `(x, y)` pair into a stable signal for the upright check.
//! All of them share the [`MotionFilter`] trait so callers can swap modes by
//! configuration without changing code.

/// Dead zone + velocity-compensated low-pass filter
pub mod dead_zone;

/// Per-axis scalar Kalman filter
pub mod kalman;

/// Plain first-order low-pass filter
pub mod low_pass;

use crate::config::SmoothingConfig;
use crate::{Error, Result};

/// Trait for all motion filters
pub trait MotionFilter: Send + Sync {
    /// Filter one raw sample.
    ///
    /// `dt_ms` is the time since the previous accepted sample, or `None` for
    /// the first sample after construction or reset.
    fn apply(&mut self, x: f64, y: f64, dt_ms: Option<f64>) -> (f64, f64);

    /// Reset filter state
    fn reset(&mut self);

    /// Adopt the parameters in `config` that apply to this filter, keeping
    /// the current state. `config` is already validated.
    fn retune(&mut self, config: &SmoothingConfig);

    /// Get filter name
    fn name(&self) -> &str;

    /// Current velocity estimate, for filters that track one
    fn velocity(&self) -> (f64, f64) {
        (0.0, 0.0)
    }
}

fn parse_param(filter_type: &str, value: Option<&str>, default: f64) -> Result<f64> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| Error::FilterError(format!("Invalid parameter '{raw}' for {filter_type}"))),
    }
}

fn check_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha <= 1.0 {
        Ok(())
    } else {
        Err(Error::FilterError(format!("Alpha must be in (0, 1], got {alpha}")))
    }
}

/// Create a motion filter by type name.
///
/// Parameters may follow the name separated by colons:
/// `lowpass:0.3`, `advanced:0.15:0.1`, `kalman:0.01:0.1`.
pub fn create_filter(spec: &str) -> Result<Box<dyn MotionFilter>> {
    use crate::constants::{
        DEFAULT_DEAD_ZONE, DEFAULT_MAX_VELOCITY, DEFAULT_SMOOTHING_ALPHA, DEFAULT_VELOCITY_DAMPING,
        KALMAN_MEASUREMENT_NOISE, KALMAN_PROCESS_NOISE,
    };

    let mut parts = spec.split(':');
    let name = parts.next().unwrap_or_default().to_lowercase();
    let first = parts.next();
    let second = parts.next();

    match name.as_str() {
        "lowpass" | "low_pass" => {
            let alpha = parse_param(&name, first, DEFAULT_SMOOTHING_ALPHA)?;
            check_alpha(alpha)?;
            Ok(Box::new(low_pass::LowPassFilter::new(alpha)))
        }
        "advanced" | "deadzone" | "dead_zone" => {
            let alpha = parse_param(&name, first, DEFAULT_SMOOTHING_ALPHA)?;
            let dead_zone = parse_param(&name, second, DEFAULT_DEAD_ZONE)?;
            check_alpha(alpha)?;
            if dead_zone < 0.0 {
                return Err(Error::FilterError("Dead zone must be non-negative".to_string()));
            }
            Ok(Box::new(dead_zone::DeadZoneFilter::new(
                alpha,
                dead_zone,
                DEFAULT_VELOCITY_DAMPING,
                DEFAULT_MAX_VELOCITY,
            )))
        }
        "kalman" => {
            let q = parse_param(&name, first, KALMAN_PROCESS_NOISE)?;
            let r = parse_param(&name, second, KALMAN_MEASUREMENT_NOISE)?;
            if q < 0.0 || r <= 0.0 {
                return Err(Error::FilterError(
                    "Kalman noise must be non-negative (measurement noise positive)".to_string(),
                ));
            }
            Ok(Box::new(kalman::KalmanFilter::new(q, r)))
        }
        _ => Err(Error::FilterError(format!("Unknown filter type: {spec}"))),
    }
}
