use super::Rgb;
use crate::keypoint::KeypointName;
use serde::{Deserialize, Serialize};

/// A named template region and the keypoints expected to land inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationZone {
    pub name: &'static str,
    pub accepted_colors: &'static [Rgb],
    pub required_keypoints: &'static [KeypointName],
}

impl ValidationZone {
    #[must_use]
    pub fn accepts(&self, color: Rgb) -> bool {
        self.accepted_colors.contains(&color)
    }
}

const SHOULDER: Rgb = Rgb::new(1, 1, 1);
const LEFT_HAND: Rgb = Rgb::new(2, 2, 2);
const RIGHT_HAND: Rgb = Rgb::new(3, 3, 3);
const HIP: Rgb = Rgb::new(4, 4, 4);
const LEFT_FOOT: Rgb = Rgb::new(5, 5, 5);
const RIGHT_FOOT: Rgb = Rgb::new(6, 6, 6);

/// Zones for the front-facing template. Hands rest against the hips, so the
/// hip zone also accepts both hand colors.
pub const FRONT_POSE_ZONES: &[ValidationZone] = &[
    ValidationZone {
        name: "shoulder",
        accepted_colors: &[SHOULDER],
        required_keypoints: &[KeypointName::LeftShoulder, KeypointName::RightShoulder],
    },
    ValidationZone {
        name: "hip",
        accepted_colors: &[HIP, RIGHT_HAND, LEFT_HAND],
        required_keypoints: &[KeypointName::LeftHip, KeypointName::RightHip],
    },
    ValidationZone {
        name: "left_wrist",
        accepted_colors: &[LEFT_HAND],
        required_keypoints: &[KeypointName::LeftWrist],
    },
    ValidationZone {
        name: "right_wrist",
        accepted_colors: &[RIGHT_HAND],
        required_keypoints: &[KeypointName::RightWrist],
    },
    ValidationZone {
        name: "left_ankle",
        accepted_colors: &[LEFT_FOOT],
        required_keypoints: &[KeypointName::LeftAnkle],
    },
    ValidationZone {
        name: "right_ankle",
        accepted_colors: &[RIGHT_FOOT],
        required_keypoints: &[KeypointName::RightAnkle],
    },
];

/// Zones for the side-facing template. Only the camera-facing body side is checked.
pub const SIDE_POSE_ZONES: &[ValidationZone] = &[
    ValidationZone {
        name: "shoulder",
        accepted_colors: &[SHOULDER],
        required_keypoints: &[KeypointName::RightShoulder],
    },
    ValidationZone {
        name: "hip",
        accepted_colors: &[HIP, RIGHT_HAND],
        required_keypoints: &[KeypointName::RightHip],
    },
    ValidationZone {
        name: "wrist",
        accepted_colors: &[RIGHT_HAND],
        required_keypoints: &[KeypointName::RightWrist],
    },
    ValidationZone {
        name: "ankle",
        accepted_colors: &[RIGHT_FOOT],
        required_keypoints: &[KeypointName::RightAnkle],
    },
];

/// Which guided photo is being taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseKind {
    Front,
    Side,
}

impl PoseKind {
    #[must_use]
    pub fn zones(self) -> &'static [ValidationZone] {
        match self {
            Self::Front => FRONT_POSE_ZONES,
            Self::Side => SIDE_POSE_ZONES,
        }
    }

    /// Tag used when persisting the accepted photo
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Side => "side",
        }
    }
}

impl std::fmt::Display for PoseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PoseKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "front" => Ok(Self::Front),
            "side" => Ok(Self::Side),
            other => Err(crate::Error::InvalidInput(format!("Unknown pose kind: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_has_six_zones() {
        assert_eq!(FRONT_POSE_ZONES.len(), 6);
        assert_eq!(SIDE_POSE_ZONES.len(), 4);
    }

    #[test]
    fn test_every_zone_requires_keypoints_and_colors() {
        for zone in FRONT_POSE_ZONES.iter().chain(SIDE_POSE_ZONES) {
            assert!(!zone.accepted_colors.is_empty(), "{} has no colors", zone.name);
            assert!(!zone.required_keypoints.is_empty(), "{} has no keypoints", zone.name);
        }
    }

    #[test]
    fn test_hip_accepts_hand_colors() {
        let hip = FRONT_POSE_ZONES.iter().find(|z| z.name == "hip").unwrap();
        assert!(hip.accepts(Rgb::new(2, 2, 2)));
        assert!(!hip.accepts(Rgb::new(1, 1, 1)));
    }

    #[test]
    fn test_pose_kind_parse() {
        assert_eq!("Side".parse::<PoseKind>().unwrap(), PoseKind::Side);
        assert!("back".parse::<PoseKind>().is_err());
    }
}
