//! Pose estimator boundary.
//!
//! The keypoint model itself lives outside this crate. Anything that can turn
//! a [`Frame`] into at most one [`Pose`] plugs in through [`PoseEstimator`].

use crate::camera::Frame;
use crate::keypoint::Pose;
use crate::{Error, Result};
use log::{debug, info};
use std::collections::VecDeque;

/// Single-person keypoint detector
pub trait PoseEstimator: Send {
    /// Load the model. Calling again after success is a no-op.
    ///
    /// # Errors
    ///
    /// `EstimatorInitError` if the model cannot be loaded
    fn init(&mut self) -> Result<()>;

    /// Detect zero or one pose in the frame
    ///
    /// # Errors
    ///
    /// `FrameProcessingError` if inference fails for this frame
    fn estimate(&mut self, frame: &Frame) -> Result<Option<Pose>>;

    /// Release the model. Safe to call when never initialized.
    fn stop(&mut self);

    /// Get estimator name
    fn name(&self) -> &str;
}

/// One scripted estimator response
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Pose(Pose),
    NoPose,
    Fail(String),
}

/// Replays a fixed list of responses, then repeats the last one.
///
/// Used by the CLI demo and by tests to drive the capture flow without a model.
#[derive(Debug, Default)]
pub struct ScriptedEstimator {
    script: VecDeque<ScriptedResponse>,
    last: Option<ScriptedResponse>,
    init_error: Option<String>,
    initialized: bool,
    init_calls: usize,
    frames: u64,
}

impl ScriptedEstimator {
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Estimator that returns the same pose for every frame
    #[must_use]
    pub fn constant(pose: Pose) -> Self {
        Self::new([ScriptedResponse::Pose(pose)])
    }

    /// Make `init` fail with the given reason
    #[must_use]
    pub fn fail_init(mut self, reason: impl Into<String>) -> Self {
        self.init_error = Some(reason.into());
        self
    }

    /// Queue more responses
    pub fn push(&mut self, response: ScriptedResponse) {
        self.script.push_back(response);
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// How many times `init` actually loaded
    #[must_use]
    pub fn init_calls(&self) -> usize {
        self.init_calls
    }

    #[must_use]
    pub fn frames_estimated(&self) -> u64 {
        self.frames
    }
}

impl PoseEstimator for ScriptedEstimator {
    fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        if let Some(reason) = &self.init_error {
            return Err(Error::EstimatorInitError(reason.clone()));
        }
        self.initialized = true;
        self.init_calls += 1;
        info!("Scripted estimator ready ({} responses queued)", self.script.len());
        Ok(())
    }

    fn estimate(&mut self, frame: &Frame) -> Result<Option<Pose>> {
        if !self.initialized {
            return Err(Error::FrameProcessingError("Estimator is not initialized".to_string()));
        }
        self.frames += 1;
        if let Some(next) = self.script.pop_front() {
            self.last = Some(next);
        }
        debug!("Estimating frame {} ({}x{})", frame.sequence, frame.width(), frame.height());
        match &self.last {
            Some(ScriptedResponse::Pose(pose)) => Ok(Some(pose.clone())),
            Some(ScriptedResponse::NoPose) | None => Ok(None),
            Some(ScriptedResponse::Fail(reason)) => Err(Error::FrameProcessingError(reason.clone())),
        }
    }

    fn stop(&mut self) {
        self.initialized = false;
    }

    fn name(&self) -> &str {
        "ScriptedEstimator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn frame() -> Frame {
        Frame {
            image: RgbImage::new(4, 4),
            sequence: 1,
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut est = ScriptedEstimator::new([]);
        est.init().unwrap();
        est.init().unwrap();
        assert_eq!(est.init_calls(), 1);
    }

    #[test]
    fn test_stop_without_start() {
        let mut est = ScriptedEstimator::new([]);
        est.stop();
        assert!(!est.is_initialized());
    }

    #[test]
    fn test_requires_init() {
        let mut est = ScriptedEstimator::new([ScriptedResponse::NoPose]);
        assert!(matches!(est.estimate(&frame()), Err(Error::FrameProcessingError(_))));
    }

    #[test]
    fn test_init_failure() {
        let mut est = ScriptedEstimator::new([]).fail_init("model missing");
        assert!(matches!(est.init(), Err(Error::EstimatorInitError(_))));
    }

    #[test]
    fn test_script_repeats_last() {
        let mut est = ScriptedEstimator::new([ScriptedResponse::NoPose, ScriptedResponse::Pose(Pose::default())]);
        est.init().unwrap();
        assert!(est.estimate(&frame()).unwrap().is_none());
        assert!(est.estimate(&frame()).unwrap().is_some());
        assert!(est.estimate(&frame()).unwrap().is_some());
        assert_eq!(est.frames_estimated(), 3);
    }

    #[test]
    fn test_scripted_failure() {
        let mut est = ScriptedEstimator::new([ScriptedResponse::Fail("boom".into())]);
        est.init().unwrap();
        assert!(est.estimate(&frame()).is_err());
    }
}
