//! Reference keypoint layouts used by the offset-threshold policy.

use crate::constants::NUM_KEYPOINTS;
use crate::keypoint::KeypointName;
use crate::template::PoseKind;

/// Keypoint positions of a correctly posed person on a reference canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePose {
    pub width: u32,
    pub height: u32,
    /// (x, y) per keypoint, in estimator order
    pub points: [(f64, f64); NUM_KEYPOINTS],
}

impl ReferencePose {
    #[must_use]
    pub fn for_kind(kind: PoseKind) -> &'static Self {
        match kind {
            PoseKind::Front => &FRONT_REFERENCE,
            PoseKind::Side => &SIDE_REFERENCE,
        }
    }

    #[must_use]
    pub fn point(&self, name: KeypointName) -> (f64, f64) {
        self.points[name.index()]
    }
}

/// Keypoints the offset policy checks
pub const IMPORTANT_KEYPOINTS: [KeypointName; 8] = [
    KeypointName::LeftShoulder,
    KeypointName::RightShoulder,
    KeypointName::LeftWrist,
    KeypointName::RightWrist,
    KeypointName::LeftHip,
    KeypointName::RightHip,
    KeypointName::LeftAnkle,
    KeypointName::RightAnkle,
];

pub const FRONT_REFERENCE: ReferencePose = ReferencePose {
    width: 640,
    height: 480,
    points: [
        (320.0, 60.0),
        (312.0, 55.0),
        (328.0, 55.0),
        (308.0, 70.0),
        (332.0, 70.0),
        (280.0, 110.0),
        (360.0, 110.0),
        (265.0, 170.0),
        (375.0, 170.0),
        (245.0, 240.0),
        (395.0, 240.0),
        (290.0, 220.0),
        (350.0, 220.0),
        (295.0, 320.0),
        (345.0, 320.0),
        (288.0, 395.0),
        (352.0, 395.0),
    ],
};

pub const SIDE_REFERENCE: ReferencePose = ReferencePose {
    width: 343,
    height: 275,
    points: [
        (183.17, 50.56),
        (180.75, 46.00),
        (180.90, 46.36),
        (170.89, 47.11),
        (171.29, 47.00),
        (167.79, 67.18),
        (165.78, 66.68),
        (165.77, 102.76),
        (166.84, 102.58),
        (174.53, 137.12),
        (173.99, 135.32),
        (167.17, 134.39),
        (168.92, 134.29),
        (167.97, 182.20),
        (172.75, 178.99),
        (161.73, 230.38),
        (168.22, 218.03),
    ],
};
