//! Helper functions and fixtures for integration tests
#![allow(dead_code)]

use pose_capture::camera::{Camera, SyntheticCamera};
use pose_capture::capture::CaptureFlow;
use pose_capture::config::Config;
use pose_capture::estimator::ScriptedEstimator;
use pose_capture::keypoint::{KeypointName, Pose};
use pose_capture::template::{MemoryTemplateSource, PoseKind, PoseTemplate};
use pose_capture::testing;
use pose_capture::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub use pose_capture::testing::{encode_png, fill, VIDEO};

pub fn front_png() -> Vec<u8> {
    testing::template_png(PoseKind::Front).unwrap()
}

pub fn side_png() -> Vec<u8> {
    testing::template_png(PoseKind::Side).unwrap()
}

pub fn front_template() -> Result<PoseTemplate> {
    testing::template(PoseKind::Front)
}

/// Front pose with every zone satisfied
pub fn matching_pose() -> Pose {
    testing::matching_pose(PoseKind::Front).unwrap()
}

/// Side pose with every zone satisfied on the side layout
pub fn side_pose() -> Pose {
    testing::matching_pose(PoseKind::Side).unwrap()
}

/// Pose for `kind` with one keypoint moved to the top-left corner of the frame
pub fn pose_missing(kind: PoseKind, name: KeypointName) -> Pose {
    testing::pose_missing(kind, name).unwrap()
}

/// Defaults with a camera profile the synthetic device satisfies
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.camera.ideal.width = VIDEO.0;
    config.camera.ideal.height = VIDEO.1;
    config.camera.minimum.width = VIDEO.0;
    config.camera.minimum.height = VIDEO.1;
    config
}

/// Template source serving each layout under its configured path
pub fn template_source(config: &Config) -> MemoryTemplateSource {
    let mut source = MemoryTemplateSource::new();
    source.insert(config.templates.path(PoseKind::Front), front_png());
    source.insert(config.templates.path(PoseKind::Side), side_png());
    source
}

/// A flow over a synthetic camera, with the layout for `kind` selected,
/// plus the camera's streaming flag
pub fn build_flow(
    kind: PoseKind,
    estimator: ScriptedEstimator,
    motion_available: bool,
) -> Result<(CaptureFlow, Arc<AtomicBool>)> {
    let config = test_config();
    let device = SyntheticCamera::new(VIDEO.0, VIDEO.1, 30);
    let streaming = device.streaming_flag();
    let camera = Camera::new(Box::new(device), config.camera.clone());
    let mut flow = CaptureFlow::new(kind, config, camera, Box::new(estimator), motion_available)?;
    flow.select_template(Arc::new(testing::template(kind)?))?;
    Ok((flow, streaming))
}
