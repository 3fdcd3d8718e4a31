//! Offset-threshold pose check.
//!
//! An older, more lenient policy: a pose passes when enough of the important
//! keypoints sit within a pixel tolerance of a reference layout. The reference
//! is scaled to the full video height and mirrored like the live view.

use super::{reference::IMPORTANT_KEYPOINTS, PoseCheck, ReferencePose, TemplateTransform, ValidationReport};
use crate::config::ValidationConfig;
use crate::keypoint::Pose;
use log::debug;

/// Counts important keypoints within tolerance of a reference pose
#[derive(Debug, Clone)]
pub struct OffsetThresholdValidator {
    reference: &'static ReferencePose,
    max_offset_x: f64,
    max_offset_y: f64,
    min_points: usize,
    min_score: f32,
}

impl OffsetThresholdValidator {
    #[must_use]
    pub fn new(reference: &'static ReferencePose, config: &ValidationConfig) -> Self {
        Self {
            reference,
            max_offset_x: config.offset_max_x,
            max_offset_y: config.offset_max_y,
            min_points: config.offset_min_points,
            min_score: config.min_keypoint_score,
        }
    }

    /// Offset of each important keypoint from its reference position, in
    /// video pixels. Missing or low-confidence keypoints are `None`.
    #[must_use]
    pub fn offsets(&self, pose: &Pose, frame_width: u32, frame_height: u32) -> Vec<Option<(f64, f64)>> {
        let Some(transform) = TemplateTransform::new(
            (self.reference.width, self.reference.height),
            (frame_width, frame_height),
            1.0,
        ) else {
            return vec![None; IMPORTANT_KEYPOINTS.len()];
        };

        IMPORTANT_KEYPOINTS
            .iter()
            .map(|&name| {
                let kp = pose.by_name(name).filter(|kp| kp.is_confident(self.min_score))?;
                let (rx, ry) = self.reference.point(name);
                let (tx, ty) = transform.template_to_video(rx, ry);
                Some(((kp.x - tx).abs(), (kp.y - ty).abs()))
            })
            .collect()
    }
}

impl PoseCheck for OffsetThresholdValidator {
    fn evaluate(&self, pose: Option<&Pose>, frame_width: u32, frame_height: u32) -> ValidationReport {
        let Some(pose) = pose else {
            return ValidationReport::invalid(IMPORTANT_KEYPOINTS.iter().map(|k| k.as_str()).collect());
        };

        let mut report = ValidationReport::default();
        for (name, offset) in IMPORTANT_KEYPOINTS
            .iter()
            .zip(self.offsets(pose, frame_width, frame_height))
        {
            match offset {
                Some((dx, dy)) if dx <= self.max_offset_x && dy <= self.max_offset_y => {
                    report.satisfied.push(name.as_str());
                }
                _ => report.unsatisfied.push(name.as_str()),
            }
        }

        report.is_valid = report.satisfied.len() >= self.min_points;
        debug!(
            "Offset check: {}/{} keypoints within tolerance",
            report.satisfied.len(),
            IMPORTANT_KEYPOINTS.len()
        );
        report
    }

    fn name(&self) -> &str {
        "OffsetThreshold"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoint::{Keypoint, KeypointName};
    use crate::validation::reference::FRONT_REFERENCE;

    /// Front reference keypoints as they appear in a 1280x960 video
    fn matching_pose(shift: f64) -> Pose {
        // Height scale 2, no horizontal offset, mirrored
        let keypoints = KeypointName::ALL
            .iter()
            .map(|&name| {
                let (x, y) = FRONT_REFERENCE.point(name);
                Keypoint::new(name, 1280.0 - x * 2.0 + shift, y * 2.0, 0.9)
            })
            .collect();
        Pose::new(keypoints)
    }

    fn validator() -> OffsetThresholdValidator {
        OffsetThresholdValidator::new(&FRONT_REFERENCE, &ValidationConfig::default())
    }

    #[test]
    fn test_exact_match_passes() {
        let report = validator().evaluate(Some(&matching_pose(0.0)), 1280, 960);
        assert!(report.is_valid);
        assert_eq!(report.satisfied.len(), 8);
    }

    #[test]
    fn test_large_shift_fails() {
        let report = validator().evaluate(Some(&matching_pose(60.0)), 1280, 960);
        assert!(!report.is_valid);
        assert!(report.satisfied.is_empty());
    }

    #[test]
    fn test_six_of_eight_is_enough() {
        let mut pose = matching_pose(0.0);
        pose.keypoints[KeypointName::LeftAnkle.index()].x += 100.0;
        pose.keypoints[KeypointName::RightAnkle.index()].score = 0.0;
        let report = validator().evaluate(Some(&pose), 1280, 960);
        assert!(report.is_valid);
        assert_eq!(report.unsatisfied, vec!["left_ankle", "right_ankle"]);

        pose.keypoints[KeypointName::LeftWrist.index()].y += 100.0;
        assert!(!validator().evaluate(Some(&pose), 1280, 960).is_valid);
    }

    #[test]
    fn test_no_pose() {
        let report = validator().evaluate(None, 1280, 960);
        assert!(!report.is_valid);
        assert_eq!(report.unsatisfied.len(), 8);
    }
}
