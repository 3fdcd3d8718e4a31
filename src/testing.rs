//! Synthetic templates and poses for tests and benchmarks.
//!
//! Both layouts are 60x100 with one solid marker block per zone color.
//! [`matching_pose`] places every keypoint a pose type requires in the middle
//! of its block, mapped to [`VIDEO`] resolution.

use crate::keypoint::{Keypoint, KeypointName, Pose};
use crate::template::{PoseKind, PoseTemplate};
use crate::validation::TemplateTransform;
use crate::{Error, Result};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

pub const TEMPLATE_WIDTH: u32 = 60;
pub const TEMPLATE_HEIGHT: u32 = 100;
pub const VIDEO: (u32, u32) = (640, 480);
pub const HEIGHT_RATIO: f64 = 0.8;

/// `(x, y, width, height, gray level)`
type Block = (u32, u32, u32, u32, u8);

const FRONT_BLOCKS: &[Block] = &[
    (0, 10, 60, 10, 1),  // shoulders
    (10, 40, 40, 10, 4), // hips
    (0, 50, 10, 10, 2),  // left hand
    (50, 50, 10, 10, 3), // right hand
    (10, 85, 10, 10, 5), // left foot
    (40, 85, 10, 10, 6), // right foot
];

// Right profile: a single column of markers
const SIDE_BLOCKS: &[Block] = &[
    (20, 10, 20, 10, 1), // shoulder
    (20, 40, 20, 10, 4), // hip
    (25, 50, 10, 10, 3), // hand against the thigh
    (20, 85, 20, 10, 6), // foot
];

/// Encode an RGBA image as PNG
///
/// # Errors
///
/// Returns `Image` if encoding fails
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Paint an opaque gray block
pub fn fill(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32, v: u8) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.put_pixel(x, y, Rgba([v, v, v, 255]));
        }
    }
}

/// PNG bytes of the layout for `kind`
///
/// # Errors
///
/// Returns `Image` if encoding fails
pub fn template_png(kind: PoseKind) -> Result<Vec<u8>> {
    let blocks = match kind {
        PoseKind::Front => FRONT_BLOCKS,
        PoseKind::Side => SIDE_BLOCKS,
    };
    let mut img = RgbaImage::new(TEMPLATE_WIDTH, TEMPLATE_HEIGHT);
    for &(x, y, w, h, v) in blocks {
        fill(&mut img, x, y, w, h, v);
    }
    encode_png(&img)
}

/// # Errors
///
/// Returns `Image` if the layout cannot be encoded or decoded
pub fn template(kind: PoseKind) -> Result<PoseTemplate> {
    PoseTemplate::decode(&template_png(kind)?, kind.zones())
}

/// Template-space point inside the block each keypoint belongs to.
/// Keypoints no zone of `kind` requires sit on a transparent pixel.
#[must_use]
pub fn target(kind: PoseKind, name: KeypointName) -> (f64, f64) {
    match (kind, name) {
        (PoseKind::Front, KeypointName::LeftShoulder) => (15.0, 15.0),
        (PoseKind::Front, KeypointName::RightShoulder) => (45.0, 15.0),
        (PoseKind::Front, KeypointName::LeftHip) => (20.0, 45.0),
        (PoseKind::Front, KeypointName::RightHip) => (40.0, 45.0),
        (PoseKind::Front, KeypointName::LeftWrist) => (5.0, 55.0),
        (PoseKind::Front, KeypointName::RightWrist) => (55.0, 55.0),
        (PoseKind::Front, KeypointName::LeftAnkle) => (15.0, 90.0),
        (PoseKind::Front, KeypointName::RightAnkle) => (45.0, 90.0),
        (PoseKind::Side, KeypointName::RightShoulder) => (30.0, 15.0),
        (PoseKind::Side, KeypointName::RightHip) => (30.0, 45.0),
        (PoseKind::Side, KeypointName::RightWrist) => (30.0, 55.0),
        (PoseKind::Side, KeypointName::RightAnkle) => (30.0, 90.0),
        _ => (30.0, 2.0),
    }
}

/// A full pose that satisfies every zone of `kind` on its own layout
///
/// # Errors
///
/// Returns `InvalidInput` if the fixture sizes give no usable transform
pub fn matching_pose(kind: PoseKind) -> Result<Pose> {
    let transform = TemplateTransform::new((TEMPLATE_WIDTH, TEMPLATE_HEIGHT), VIDEO, HEIGHT_RATIO)
        .ok_or_else(|| Error::InvalidInput("Degenerate fixture transform".to_string()))?;
    let keypoints = KeypointName::ALL
        .iter()
        .map(|&name| {
            let (tx, ty) = target(kind, name);
            let (vx, vy) = transform.template_to_video(tx, ty);
            Keypoint::new(name, vx, vy, 0.9)
        })
        .collect();
    Ok(Pose::new(keypoints))
}

/// [`matching_pose`] with one keypoint moved to the top-left corner of the frame
///
/// # Errors
///
/// See [`matching_pose`]
pub fn pose_missing(kind: PoseKind, name: KeypointName) -> Result<Pose> {
    let mut pose = matching_pose(kind)?;
    if let Some(keypoint) = pose.keypoints.get_mut(name.index()) {
        keypoint.x = 0.0;
        keypoint.y = 0.0;
    }
    Ok(pose)
}
