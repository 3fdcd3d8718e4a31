//! Moving-average smoothing of keypoint sets across frames.

use crate::keypoint::Keypoint;
use std::collections::VecDeque;

/// Averages each keypoint's position and score over the last N frames
pub struct KeypointSmoother {
    window_size: usize,
    buffers: Vec<VecDeque<Keypoint>>,
}

impl KeypointSmoother {
    /// # Panics
    ///
    /// Panics if `window_size` is zero
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        assert!(window_size > 0, "Window size must be greater than 0");
        Self {
            window_size,
            buffers: Vec::new(),
        }
    }

    /// Push a frame's keypoints and return the smoothed set
    pub fn smooth(&mut self, keypoints: &[Keypoint]) -> Vec<Keypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }
        let window = self.window_size;
        if self.buffers.len() < keypoints.len() {
            self.buffers.resize_with(keypoints.len(), || VecDeque::with_capacity(window));
        }

        keypoints
            .iter()
            .zip(self.buffers.iter_mut())
            .map(|(kp, buffer)| {
                if buffer.len() >= window {
                    buffer.pop_front();
                }
                buffer.push_back(*kp);

                #[allow(clippy::cast_precision_loss)]
                let n = buffer.len() as f64;
                let x = buffer.iter().map(|k| k.x).sum::<f64>() / n;
                let y = buffer.iter().map(|k| k.y).sum::<f64>() / n;
                #[allow(clippy::cast_possible_truncation)]
                let score = (buffer.iter().map(|k| f64::from(k.score)).sum::<f64>() / n) as f32;

                Keypoint { x, y, score, name: kp.name }
            })
            .collect()
    }

    /// Drop all history
    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    #[must_use]
    pub fn buffer_len(&self, index: usize) -> usize {
        self.buffers.get(index).map_or(0, VecDeque::len)
    }

    #[must_use]
    pub fn is_buffer_full(&self, index: usize) -> bool {
        self.buffer_len(index) >= self.window_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoint::KeypointName;

    fn kp(x: f64, score: f32) -> Keypoint {
        Keypoint::new(KeypointName::Nose, x, x * 2.0, score)
    }

    #[test]
    fn test_moving_average() {
        let mut smoother = KeypointSmoother::new(3);
        assert_eq!(smoother.smooth(&[kp(10.0, 1.0)])[0].x, 10.0);
        assert_eq!(smoother.smooth(&[kp(20.0, 0.0)])[0].x, 15.0);
        let third = smoother.smooth(&[kp(30.0, 0.5)])[0];
        assert_eq!(third.x, 20.0);
        assert_eq!(third.y, 40.0);
        assert!((third.score - 0.5).abs() < 1e-6);

        // Window is full, oldest value should be dropped
        assert_eq!(smoother.smooth(&[kp(40.0, 0.5)])[0].x, 30.0);
        assert!(smoother.is_buffer_full(0));
    }

    #[test]
    fn test_clear() {
        let mut smoother = KeypointSmoother::new(5);
        smoother.smooth(&[kp(10.0, 1.0), kp(5.0, 1.0)]);
        assert_eq!(smoother.buffer_len(1), 1);
        smoother.clear();
        assert_eq!(smoother.buffer_len(0), 0);
        assert_eq!(smoother.smooth(&[kp(1.0, 1.0)])[0].x, 1.0);
    }

    #[test]
    fn test_empty_input() {
        let mut smoother = KeypointSmoother::new(2);
        assert!(smoother.smooth(&[]).is_empty());
    }

    #[test]
    #[should_panic(expected = "Window size must be greater than 0")]
    fn test_zero_window() {
        let _ = KeypointSmoother::new(0);
    }
}
