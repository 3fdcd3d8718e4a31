//! End-to-end tests of the guided capture flow over a synthetic camera

mod test_helpers;

use pose_capture::capture::{CaptureEvent, CaptureFlow, CaptureState};
use pose_capture::estimator::{ScriptedEstimator, ScriptedResponse};
use pose_capture::keypoint::KeypointName;
use pose_capture::motion::MotionSample;
use pose_capture::store::{ImageStore, MemoryImageStore};
use pose_capture::template::{PoseKind, TemplateCache};
use pose_capture::Error;
use std::sync::atomic::Ordering;
use test_helpers::{build_flow, matching_pose, pose_missing, side_pose, template_source, test_config};

/// Run `steps` rounds of one frame plus `step_ms` of time
fn run(flow: &mut CaptureFlow, steps: usize, step_ms: u64) -> Vec<CaptureEvent> {
    let mut events = Vec::new();
    for _ in 0..steps {
        flow.process_frame().ok();
        events.extend(flow.advance(step_ms));
    }
    events
}

fn captured_count(events: &[CaptureEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, CaptureEvent::Captured { .. }))
        .count()
}

#[test]
fn test_side_countdown_two_one_captures_once() {
    let (mut flow, _) = build_flow(PoseKind::Side, ScriptedEstimator::constant(side_pose()), false).unwrap();
    flow.start().unwrap();

    let events = run(&mut flow, 100, 100);
    assert_eq!(
        events,
        vec![
            CaptureEvent::CountdownStarted(2),
            CaptureEvent::CountdownTick(1),
            CaptureEvent::CountdownCheck,
            CaptureEvent::Captured { width: 640, height: 480 },
        ]
    );
    assert_eq!(captured_count(&events), 1);
    assert_eq!(flow.state(), CaptureState::Reviewing);
    assert_eq!(flow.last_report().satisfied, vec!["shoulder", "hip", "wrist", "ankle"]);
}

#[test]
fn test_side_zone_unmet_never_counts_down() {
    for (missing, zone) in [
        (KeypointName::RightShoulder, "shoulder"),
        (KeypointName::RightHip, "hip"),
        (KeypointName::RightWrist, "wrist"),
        (KeypointName::RightAnkle, "ankle"),
    ] {
        let (mut flow, _) = build_flow(
            PoseKind::Side,
            ScriptedEstimator::constant(pose_missing(PoseKind::Side, missing)),
            false,
        )
        .unwrap();
        flow.start().unwrap();
        let events = run(&mut flow, 200, 100);
        assert!(events.is_empty(), "{missing} missing still produced {events:?}");
        assert_eq!(flow.state(), CaptureState::AwaitingPose);
        let report = flow.last_report();
        assert!(!report.is_valid);
        assert_eq!(report.satisfied.len(), 3);
        assert_eq!(report.unsatisfied, vec![zone]);
    }
}

#[test]
fn test_front_pose_fails_side_layout() {
    let (mut flow, _) = build_flow(PoseKind::Side, ScriptedEstimator::constant(matching_pose()), false).unwrap();
    flow.start().unwrap();
    assert!(run(&mut flow, 60, 100).is_empty());
    assert!(!flow.last_report().is_valid);
}

#[test]
fn test_left_side_keypoints_ignored_on_side_layout() {
    let mut pose = side_pose();
    for name in [KeypointName::LeftShoulder, KeypointName::LeftWrist, KeypointName::LeftAnkle] {
        pose.keypoints[name.index()].score = 0.0;
    }
    let (mut flow, _) = build_flow(PoseKind::Side, ScriptedEstimator::constant(pose), false).unwrap();
    flow.start().unwrap();
    assert_eq!(captured_count(&run(&mut flow, 100, 100)), 1);
}

#[test]
fn test_five_of_six_zones_never_counts_down() {
    for missing in [
        KeypointName::LeftShoulder,
        KeypointName::RightHip,
        KeypointName::LeftWrist,
        KeypointName::RightAnkle,
    ] {
        let (mut flow, _) = build_flow(
            PoseKind::Front,
            ScriptedEstimator::constant(pose_missing(PoseKind::Front, missing)),
            false,
        )
        .unwrap();
        flow.start().unwrap();
        let events = run(&mut flow, 200, 100);
        assert!(events.is_empty(), "{missing} missing still produced {events:?}");
        let report = flow.last_report();
        assert!(!report.is_valid);
        assert_eq!(report.satisfied.len(), 5);
        assert_eq!(report.unsatisfied.len(), 1);
    }
}

#[test]
fn test_drop_at_1900ms_needs_fresh_two_seconds() {
    // 19 valid frames, one invalid, then valid again
    let mut script: Vec<ScriptedResponse> = (0..19).map(|_| ScriptedResponse::Pose(matching_pose())).collect();
    script.push(ScriptedResponse::NoPose);
    script.push(ScriptedResponse::Pose(matching_pose()));
    let (mut flow, _) = build_flow(PoseKind::Front, ScriptedEstimator::new(script), false).unwrap();
    flow.start().unwrap();

    assert!(run(&mut flow, 19, 100).is_empty());
    assert_eq!(flow.session().pose_stable_ms, 1900);

    assert!(run(&mut flow, 1, 100).is_empty());
    assert_eq!(flow.session().pose_stable_ms, 0);

    assert!(run(&mut flow, 19, 100).is_empty());
    assert_eq!(run(&mut flow, 1, 100), vec![CaptureEvent::CountdownStarted(3)]);
}

#[test]
fn test_cancel_releases_camera_and_detection() {
    let (mut flow, streaming) =
        build_flow(PoseKind::Front, ScriptedEstimator::constant(matching_pose()), false).unwrap();
    flow.start().unwrap();
    run(&mut flow, 5, 100);
    assert!(streaming.load(Ordering::SeqCst));

    flow.cancel();
    assert!(!streaming.load(Ordering::SeqCst));
    assert!(!flow.detection().is_running());
    assert!(flow.process_frame().unwrap().is_none());
    assert!(run(&mut flow, 50, 100).is_empty());
}

#[test]
fn test_dropping_flow_releases_camera() {
    let (mut flow, streaming) =
        build_flow(PoseKind::Front, ScriptedEstimator::constant(matching_pose()), false).unwrap();
    flow.start().unwrap();
    assert!(streaming.load(Ordering::SeqCst));
    drop(flow);
    assert!(!streaming.load(Ordering::SeqCst));
}

#[test]
fn test_side_accept_replaces_previous_side_photo() {
    let mut store = MemoryImageStore::new();
    store.init().unwrap();
    let front = store.save(vec![1], PoseKind::Front).unwrap();
    let old_side = store.save(vec![2], PoseKind::Side).unwrap();

    let (mut flow, _) = build_flow(PoseKind::Side, ScriptedEstimator::constant(side_pose()), false).unwrap();
    flow.start().unwrap();
    run(&mut flow, 60, 100);
    let new_side = flow.accept(&mut store).unwrap();

    assert!(store.get(old_side).unwrap().is_none());
    assert!(store.get(front).unwrap().is_some());
    assert_eq!(store.get_latest(PoseKind::Side).unwrap().unwrap().id, new_side);
    assert_eq!(flow.accepted_id(), Some(new_side));
}

#[test]
fn test_front_accept_keeps_earlier_photos() {
    let mut store = MemoryImageStore::new();
    store.init().unwrap();
    let earlier = store.save(vec![1], PoseKind::Front).unwrap();

    let (mut flow, _) = build_flow(PoseKind::Front, ScriptedEstimator::constant(matching_pose()), false).unwrap();
    flow.start().unwrap();
    run(&mut flow, 60, 100);
    let id = flow.accept(&mut store).unwrap();

    assert!(store.get(earlier).unwrap().is_some());
    let saved = store.get(id).unwrap().unwrap();
    // JPEG magic
    assert_eq!(&saved.data[..2], &[0xFF, 0xD8]);
}

#[test]
fn test_retake_then_capture_again() {
    let (mut flow, streaming) =
        build_flow(PoseKind::Front, ScriptedEstimator::constant(matching_pose()), false).unwrap();
    flow.start().unwrap();
    assert_eq!(captured_count(&run(&mut flow, 60, 100)), 1);
    assert!(!streaming.load(Ordering::SeqCst));

    flow.retake().unwrap();
    assert!(streaming.load(Ordering::SeqCst));
    assert_eq!(flow.state(), CaptureState::AwaitingPose);
    assert_eq!(captured_count(&run(&mut flow, 60, 100)), 1);
    assert!(flow.still().is_some());
}

#[test]
fn test_camera_read_failure_surfaces_frame_error() {
    let config = test_config();
    let device = pose_capture::camera::SyntheticCamera::new(640, 480, 30).fail_after(3);
    let camera = pose_capture::camera::Camera::new(Box::new(device), config.camera.clone());
    let mut flow = CaptureFlow::new(
        PoseKind::Front,
        config,
        camera,
        Box::new(ScriptedEstimator::constant(matching_pose())),
        false,
    )
    .unwrap();
    flow.start().unwrap();

    for _ in 0..3 {
        flow.process_frame().unwrap();
    }
    assert!(matches!(flow.process_frame(), Err(Error::FrameProcessingError(_))));
    assert_eq!(flow.state(), CaptureState::AwaitingPose);
    assert!(!flow.detection().is_running());
    assert!(flow.session().last_error.is_some());
}

#[test]
fn test_permission_denied_is_terminal() {
    let config = test_config();
    let device = pose_capture::camera::SyntheticCamera::new(640, 480, 30).deny_permission();
    let streaming = device.streaming_flag();
    let camera = pose_capture::camera::Camera::new(Box::new(device), config.camera.clone());
    let mut flow = CaptureFlow::new(
        PoseKind::Front,
        config,
        camera,
        Box::new(ScriptedEstimator::constant(matching_pose())),
        false,
    )
    .unwrap();

    assert!(matches!(flow.start(), Err(Error::PermissionDenied)));
    assert_eq!(flow.state(), CaptureState::Failed);
    assert!(!streaming.load(Ordering::SeqCst));
    assert!(flow.retake().is_err());
}

#[test]
fn test_template_loaded_through_cache() {
    let config = test_config();
    let source = template_source(&config);
    let mut cache = TemplateCache::new();

    for _ in 0..2 {
        let (mut flow, _) =
            build_flow(PoseKind::Front, ScriptedEstimator::constant(matching_pose()), false).unwrap();
        flow.load_template(&mut cache, &source).unwrap();
        flow.start().unwrap();
        assert_eq!(captured_count(&run(&mut flow, 60, 100)), 1);
    }
    assert_eq!(cache.len(), 1);

    let (mut side, _) = build_flow(PoseKind::Side, ScriptedEstimator::constant(side_pose()), false).unwrap();
    side.load_template(&mut cache, &source).unwrap();
    side.start().unwrap();
    assert_eq!(captured_count(&run(&mut side, 60, 100)), 1);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_side_orientation_then_pose() {
    let (mut flow, streaming) =
        build_flow(PoseKind::Side, ScriptedEstimator::constant(side_pose()), true).unwrap();
    flow.start().unwrap();
    assert_eq!(flow.state(), CaptureState::AwaitingOrientation);
    assert!(!streaming.load(Ordering::SeqCst));

    // Tilted: never confirmed
    for i in 0..100 {
        flow.on_motion(MotionSample::new(5.0, 8.0, i * 20));
    }
    assert!(flow.advance(3000).is_empty());
    assert!(flow.level_offset().is_some());

    for i in 100..400 {
        flow.on_motion(MotionSample::new(0.0, 9.8, i * 20));
    }
    let events = flow.advance(2000);
    assert_eq!(events, vec![CaptureEvent::OrientationConfirmed]);
    assert!(streaming.load(Ordering::SeqCst));

    let events = run(&mut flow, 60, 100);
    assert_eq!(captured_count(&events), 1);
}
