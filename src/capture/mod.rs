//! The guided capture state machine and its timers.
//!
//! A [`CaptureFlow`] walks one photo through orientation, live pose
//! validation, the stability hold, the countdown and the review step.

pub mod countdown;
pub mod flow;
pub mod orientation;
pub mod stability;

pub use countdown::{Countdown, CountdownEvent};
pub use flow::{CaptureEvent, CaptureFlow, CaptureSession, CaptureState};
pub use orientation::OrientationGate;
pub use stability::{StabilityTimer, StepClock};
