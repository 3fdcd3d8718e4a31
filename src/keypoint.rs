//! Body keypoints as produced by a single-pose estimator (17-point COCO layout).

use crate::constants::NUM_KEYPOINTS;
use serde::{Deserialize, Serialize};

/// Named keypoint, in estimator output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum KeypointName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointName {
    pub const ALL: [Self; NUM_KEYPOINTS] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

impl std::fmt::Display for KeypointName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single detected keypoint in video pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    /// Confidence in [0, 1]
    #[serde(default)]
    pub score: f32,
    pub name: KeypointName,
}

impl Keypoint {
    #[must_use]
    pub fn new(name: KeypointName, x: f64, y: f64, score: f32) -> Self {
        Self { x, y, score, name }
    }

    /// Whether the keypoint is confident enough to be used
    #[must_use]
    pub fn is_confident(&self, threshold: f32) -> bool {
        self.score >= threshold && self.x.is_finite() && self.y.is_finite()
    }
}

/// One detected pose: keypoints in estimator order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    #[must_use]
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// Look up a keypoint by position in the estimator output
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Keypoint> {
        self.keypoints.get(index)
    }

    #[must_use]
    pub fn by_name(&self, name: KeypointName) -> Option<&Keypoint> {
        self.keypoints
            .get(name.index())
            .filter(|kp| kp.name == name)
            .or_else(|| self.keypoints.iter().find(|kp| kp.name == name))
    }

    /// Mean confidence over all keypoints
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_score(&self) -> f32 {
        if self.keypoints.is_empty() {
            return 0.0;
        }
        self.keypoints.iter().map(|k| k.score).sum::<f32>() / self.keypoints.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_name_from_index() {
        assert_eq!(KeypointName::from_index(0), Some(KeypointName::Nose));
        assert_eq!(KeypointName::from_index(16), Some(KeypointName::RightAnkle));
        assert_eq!(KeypointName::from_index(17), None);
        assert_eq!(KeypointName::RightHip.index(), 12);
    }

    #[test]
    fn test_confidence() {
        let kp = Keypoint::new(KeypointName::Nose, 10.0, 10.0, 0.4);
        assert!(kp.is_confident(0.3));
        assert!(!kp.is_confident(0.5));
        let nan = Keypoint::new(KeypointName::Nose, f64::NAN, 10.0, 1.0);
        assert!(!nan.is_confident(0.0));
    }

    #[test]
    fn test_by_name_falls_back_to_search() {
        let pose = Pose::new(vec![Keypoint::new(KeypointName::LeftWrist, 1.0, 2.0, 0.9)]);
        assert_eq!(pose.by_name(KeypointName::LeftWrist).map(|k| k.x), Some(1.0));
        assert!(pose.by_name(KeypointName::Nose).is_none());
    }

    #[test]
    fn test_serde_names() {
        let yaml = "x: 1.0\ny: 2.0\nscore: 0.5\nname: left_shoulder\n";
        let kp: Keypoint = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(kp.name, KeypointName::LeftShoulder);
    }
}
