use super::countdown::{Countdown, CountdownEvent};
use super::orientation::OrientationGate;
use super::stability::{StabilityTimer, StepClock};
use crate::camera::{Camera, Frame, Still};
use crate::config::Config;
use crate::detection::{DetectionLoop, FrameTicket, SessionId};
use crate::estimator::PoseEstimator;
use crate::keypoint::Pose;
use crate::keypoint_smoothing::KeypointSmoother;
use crate::motion::{MotionSample, Orientation};
use crate::store::{ImageId, ImageStore};
use crate::template::{PoseKind, PoseTemplate, TemplateCache, TemplateSource};
use crate::validation::{create_check, PoseCheck, ValidationReport};
use crate::{Error, Result};
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;

/// Where a guided capture currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureState {
    /// Constructed, `start()` not called yet
    Idle,
    /// Waiting for the device to be held upright
    AwaitingOrientation,
    /// Validating the live pose and accumulating stable time
    AwaitingPose,
    CountingDown,
    /// Still captured, waiting for accept or retake
    Reviewing,
    Accepted,
    Canceled,
    /// Camera, template or estimator could not be acquired
    Failed,
}

impl CaptureState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Canceled | Self::Failed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingOrientation => "awaiting orientation",
            Self::AwaitingPose => "awaiting pose",
            Self::CountingDown => "counting down",
            Self::Reviewing => "reviewing",
            Self::Accepted => "accepted",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications produced while time passes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    OrientationConfirmed,
    /// The pose was stable long enough; the countdown shows this value
    CountdownStarted(u32),
    CountdownTick(u32),
    /// The check mark is shown and the still is taken
    CountdownCheck,
    Captured { width: u32, height: u32 },
    /// The flow entered the failed state
    Failed(String),
}

/// Snapshot of one guided capture attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSession {
    pub kind: PoseKind,
    pub state: CaptureState,
    pub pose_stable_ms: u64,
    pub is_counting_down: bool,
    pub countdown_value: Option<u32>,
    pub has_still: bool,
    pub orientation_held_ms: u64,
    pub detection_session: Option<SessionId>,
    pub last_report: ValidationReport,
    pub last_error: Option<String>,
}

fn invalid(from: CaptureState, action: &str) -> Error {
    Error::InvalidTransition {
        from: from.to_string(),
        action: action.to_string(),
    }
}

fn as_frame_error(e: Error) -> Error {
    match e {
        Error::FrameProcessingError(_) => e,
        other => Error::FrameProcessingError(other.to_string()),
    }
}

/// Guided capture of one photo.
///
/// Owns the camera and estimator for its whole lifetime. Time is driven from
/// outside: call [`process_frame`](Self::process_frame) once per display
/// frame and [`advance`](Self::advance) with the wall time that passed.
pub struct CaptureFlow {
    kind: PoseKind,
    config: Config,
    camera: Camera,
    estimator: Box<dyn PoseEstimator>,
    check: Box<dyn PoseCheck>,
    detection: DetectionLoop,
    orientation: Option<OrientationGate>,
    stability: StabilityTimer,
    clock: StepClock,
    countdown: Countdown,
    keypoint_smoother: Option<KeypointSmoother>,
    state: CaptureState,
    pose_valid: bool,
    last_report: ValidationReport,
    still: Option<Still>,
    last_error: Option<String>,
    accepted_id: Option<ImageId>,
}

impl CaptureFlow {
    /// Create a flow. The orientation step runs only for the side photo, when
    /// enabled in the configuration and the device has motion sensors.
    ///
    /// Until a template is loaded every pose is treated as invalid.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid configuration
    pub fn new(
        kind: PoseKind,
        config: Config,
        camera: Camera,
        estimator: Box<dyn PoseEstimator>,
        motion_available: bool,
    ) -> Result<Self> {
        config.validate()?;

        let orientation = if kind == PoseKind::Side && config.capture.require_orientation_for_side && motion_available {
            Some(OrientationGate::new(&config)?)
        } else {
            None
        };
        let capture = &config.capture;
        let keypoint_smoother = capture
            .keypoint_smoothing
            .then(|| KeypointSmoother::new(capture.keypoint_smoothing_window));

        Ok(Self {
            kind,
            check: create_check(&config.validation, kind, None),
            detection: DetectionLoop::new(),
            orientation,
            stability: StabilityTimer::new(capture.stability_step_ms, capture.stability_required_ms),
            clock: StepClock::new(capture.stability_step_ms),
            countdown: Countdown::new(capture.countdown_start(kind), capture.countdown_tick_ms),
            keypoint_smoother,
            state: CaptureState::Idle,
            pose_valid: false,
            last_report: ValidationReport::default(),
            still: None,
            last_error: None,
            accepted_id: None,
            camera,
            estimator,
            config,
        })
    }

    /// Replace the pose check, e.g. with a custom policy
    #[must_use]
    pub fn with_check(mut self, check: Box<dyn PoseCheck>) -> Self {
        self.check = check;
        self
    }

    /// Load the configured template for this photo. A load failure is
    /// terminal: the flow moves to `Failed` and releases everything.
    ///
    /// # Errors
    ///
    /// `TemplateLoadError` if the template cannot be fetched or decoded
    pub fn load_template(&mut self, cache: &mut TemplateCache, source: &dyn TemplateSource) -> Result<()> {
        let path = self.config.templates.path(self.kind).to_string();
        match cache.load(source, &path, self.kind.zones()) {
            Ok(template) => {
                self.check = create_check(&self.config.validation, self.kind, Some(template));
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Switch to another template variant. Stability and any running
    /// countdown start over.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` once a still has been captured or the flow ended
    pub fn select_template(&mut self, template: Arc<PoseTemplate>) -> Result<()> {
        match self.state {
            CaptureState::Idle | CaptureState::AwaitingOrientation | CaptureState::AwaitingPose => {}
            CaptureState::CountingDown => {
                info!("Template changed during countdown, restarting stability check");
                self.state = CaptureState::AwaitingPose;
            }
            state => return Err(invalid(state, "select template")),
        }
        self.check = create_check(&self.config.validation, self.kind, Some(template));
        self.reset_pose_tracking();
        Ok(())
    }

    /// Begin the flow
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if already started; camera or estimator errors,
    /// which also move the flow to `Failed`
    pub fn start(&mut self) -> Result<()> {
        if self.state != CaptureState::Idle {
            return Err(invalid(self.state, "start"));
        }
        if let Some(gate) = self.orientation.as_mut() {
            gate.reset();
            self.clock.reset();
            self.state = CaptureState::AwaitingOrientation;
            info!("{} capture waiting for upright orientation", self.kind);
            return Ok(());
        }
        self.begin_pose_step()
    }

    fn begin_pose_step(&mut self) -> Result<()> {
        let started = self.camera.start().and_then(|_| self.estimator.init());
        if let Err(e) = started {
            self.fail(&e);
            return Err(e);
        }
        self.reset_pose_tracking();
        let session = self.detection.start();
        self.state = CaptureState::AwaitingPose;
        info!(
            "{} capture validating pose with {} (session {})",
            self.kind,
            self.check.name(),
            session.value()
        );
        Ok(())
    }

    fn reset_pose_tracking(&mut self) {
        self.stability.reset();
        self.clock.reset();
        self.countdown.cancel();
        self.pose_valid = false;
        self.last_report = ValidationReport::default();
        if let Some(smoother) = self.keypoint_smoother.as_mut() {
            smoother.clear();
        }
    }

    fn release(&mut self) {
        self.detection.stop();
        self.countdown.cancel();
        self.camera.stop();
        self.estimator.stop();
    }

    fn fail(&mut self, e: &Error) {
        error!("{} capture failed: {}", self.kind, e);
        self.release();
        self.still = None;
        self.last_error = Some(e.to_string());
        self.state = CaptureState::Failed;
    }

    fn frame_error(&mut self, e: &Error) {
        warn!("Detection stopped: {e}");
        self.detection.stop();
        self.pose_valid = false;
        self.stability.reset();
        self.last_error = Some(e.to_string());
    }

    /// Feed a raw accelerometer sample. Ignored outside the orientation step.
    pub fn on_motion(&mut self, sample: MotionSample) -> Option<Orientation> {
        if self.state != CaptureState::AwaitingOrientation {
            return None;
        }
        self.orientation.as_mut()?.on_sample(sample)
    }

    /// Grab the next frame and reserve the estimator for it.
    ///
    /// Returns `None` when no estimation should run now: outside the pose
    /// step, after detection stopped, or while an earlier frame is in flight.
    ///
    /// # Errors
    ///
    /// `FrameProcessingError` if the camera read fails; detection stops
    pub fn begin_frame(&mut self) -> Result<Option<(FrameTicket, Frame)>> {
        match self.state {
            CaptureState::AwaitingPose => {}
            CaptureState::CountingDown => {
                // Keep the preview fresh for the still
                if let Err(e) = self.camera.next_frame() {
                    warn!("Preview frame lost during countdown: {e}");
                }
                return Ok(None);
            }
            _ => return Ok(None),
        }

        let Some(ticket) = self.detection.request_frame() else {
            return Ok(None);
        };
        match self.camera.next_frame() {
            Ok(frame) => Ok(Some((ticket, frame))),
            Err(e) => {
                self.detection.settle(ticket, ());
                let e = as_frame_error(e);
                self.frame_error(&e);
                Err(e)
            }
        }
    }

    /// Apply an estimation result. Results for stale tickets are dropped.
    ///
    /// # Errors
    ///
    /// `FrameProcessingError` if the estimation failed; detection stops but
    /// the flow stays usable through [`restart_detection`](Self::restart_detection)
    pub fn complete_frame(
        &mut self,
        ticket: FrameTicket,
        frame_size: (u32, u32),
        result: Result<Option<Pose>>,
    ) -> Result<Option<ValidationReport>> {
        let Some(result) = self.detection.settle(ticket, result) else {
            return Ok(None);
        };
        if self.state != CaptureState::AwaitingPose {
            return Ok(None);
        }

        let pose = match result {
            Ok(pose) => pose,
            Err(e) => {
                let e = as_frame_error(e);
                self.frame_error(&e);
                return Err(e);
            }
        };
        let pose = match (pose, self.keypoint_smoother.as_mut()) {
            (Some(pose), Some(smoother)) => Some(Pose::new(smoother.smooth(&pose.keypoints))),
            (pose, _) => pose,
        };

        let report = self.check.evaluate(pose.as_ref(), frame_size.0, frame_size.1);
        if report.is_valid != self.pose_valid {
            debug!(
                "Pose became {} (unsatisfied: {:?})",
                if report.is_valid { "valid" } else { "invalid" },
                report.unsatisfied
            );
        }
        self.pose_valid = report.is_valid;
        if !report.is_valid {
            self.stability.reset();
        }
        self.last_report = report.clone();
        Ok(Some(report))
    }

    /// Run one detection frame synchronously
    ///
    /// # Errors
    ///
    /// See [`begin_frame`](Self::begin_frame) and [`complete_frame`](Self::complete_frame)
    pub fn process_frame(&mut self) -> Result<Option<ValidationReport>> {
        let Some((ticket, frame)) = self.begin_frame()? else {
            return Ok(None);
        };
        let result = self.estimator.estimate(&frame);
        self.complete_frame(ticket, (frame.width(), frame.height()), result)
    }

    /// Let `elapsed_ms` of wall time pass
    pub fn advance(&mut self, elapsed_ms: u64) -> Vec<CaptureEvent> {
        let mut events = Vec::new();
        match self.state {
            CaptureState::AwaitingOrientation => {
                let steps = self.clock.advance(elapsed_ms);
                let confirmed = match self.orientation.as_mut() {
                    Some(gate) => (0..steps).any(|_| gate.tick()),
                    None => true,
                };
                if confirmed {
                    info!("Device held upright");
                    events.push(CaptureEvent::OrientationConfirmed);
                    if let Err(e) = self.begin_pose_step() {
                        events.push(CaptureEvent::Failed(e.to_string()));
                    }
                }
            }
            CaptureState::AwaitingPose => {
                let steps = self.clock.advance(elapsed_ms);
                for _ in 0..steps {
                    if self.stability.tick(self.pose_valid) {
                        let first = self.countdown.begin();
                        self.state = CaptureState::CountingDown;
                        info!("Pose stable, counting down from {first}");
                        events.push(CaptureEvent::CountdownStarted(first));
                        break;
                    }
                }
            }
            CaptureState::CountingDown => {
                for event in self.countdown.advance(elapsed_ms) {
                    match event {
                        CountdownEvent::Tick(n) => events.push(CaptureEvent::CountdownTick(n)),
                        CountdownEvent::Check => {
                            events.push(CaptureEvent::CountdownCheck);
                            match self.capture() {
                                Ok(event) => events.push(event),
                                Err(e) => events.push(CaptureEvent::Failed(e.to_string())),
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        events
    }

    fn capture(&mut self) -> Result<CaptureEvent> {
        match self.camera.capture_still() {
            Ok(still) => {
                let event = CaptureEvent::Captured {
                    width: still.width,
                    height: still.height,
                };
                self.still = Some(still);
                self.detection.stop();
                self.camera.stop();
                self.estimator.stop();
                self.state = CaptureState::Reviewing;
                info!("{} photo captured", self.kind);
                Ok(event)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Persist the reviewed still and finish. A new side photo replaces the
    /// previous one.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside review; store errors, after which the
    /// still is kept for another attempt
    pub fn accept(&mut self, store: &mut dyn ImageStore) -> Result<ImageId> {
        if self.state != CaptureState::Reviewing {
            return Err(invalid(self.state, "accept"));
        }
        let Some(still) = self.still.take() else {
            return Err(invalid(self.state, "accept without a still"));
        };

        match self.persist(store, &still) {
            Ok(id) => {
                info!("{} photo accepted as image {}", self.kind, id);
                self.accepted_id = Some(id);
                self.state = CaptureState::Accepted;
                Ok(id)
            }
            Err(e) => {
                warn!("Failed to persist {} photo: {}", self.kind, e);
                self.still = Some(still);
                Err(e)
            }
        }
    }

    fn persist(&self, store: &mut dyn ImageStore, still: &Still) -> Result<ImageId> {
        if self.kind == PoseKind::Side {
            if let Some(previous) = store.get_latest(PoseKind::Side)? {
                debug!("Replacing side image {}", previous.id);
                store.delete(previous.id)?;
            }
        }
        store.save(still.jpeg.clone(), self.kind)
    }

    /// Discard the still and go back to live validation
    ///
    /// # Errors
    ///
    /// `InvalidTransition` outside review; camera or estimator errors, which
    /// move the flow to `Failed`
    pub fn retake(&mut self) -> Result<()> {
        if self.state != CaptureState::Reviewing {
            return Err(invalid(self.state, "retake"));
        }
        self.still = None;
        info!("Retaking {} photo", self.kind);
        self.begin_pose_step()
    }

    /// Resume detection after a per-frame error
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless waiting for a pose with detection stopped;
    /// camera errors, which move the flow to `Failed`
    pub fn restart_detection(&mut self) -> Result<()> {
        if self.state != CaptureState::AwaitingPose || self.detection.is_running() {
            return Err(invalid(self.state, "restart detection"));
        }
        if let Err(e) = self.camera.start() {
            self.fail(&e);
            return Err(e);
        }
        self.last_error = None;
        self.reset_pose_tracking();
        self.detection.start();
        Ok(())
    }

    /// Abandon the flow, releasing the camera and stopping detection.
    /// No-op once the flow has ended.
    pub fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        info!("{} capture canceled in state {}", self.kind, self.state);
        self.release();
        self.still = None;
        self.state = CaptureState::Canceled;
    }

    #[must_use]
    pub fn state(&self) -> CaptureState {
        self.state
    }

    #[must_use]
    pub fn kind(&self) -> PoseKind {
        self.kind
    }

    #[must_use]
    pub fn is_pose_valid(&self) -> bool {
        self.pose_valid
    }

    #[must_use]
    pub fn last_report(&self) -> &ValidationReport {
        &self.last_report
    }

    /// The captured photo while reviewing
    #[must_use]
    pub fn still(&self) -> Option<&Still> {
        self.still.as_ref()
    }

    #[must_use]
    pub fn accepted_id(&self) -> Option<ImageId> {
        self.accepted_id
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[must_use]
    pub fn detection(&self) -> &DetectionLoop {
        &self.detection
    }

    /// Bubble-level offset during the orientation step
    #[must_use]
    pub fn level_offset(&self) -> Option<(f64, f64)> {
        self.orientation.as_ref()?.level_offset()
    }

    #[must_use]
    pub fn session(&self) -> CaptureSession {
        CaptureSession {
            kind: self.kind,
            state: self.state,
            pose_stable_ms: self.stability.accumulated_ms(),
            is_counting_down: self.state == CaptureState::CountingDown,
            countdown_value: self.countdown.remaining(),
            has_still: self.still.is_some(),
            orientation_held_ms: self.orientation.as_ref().map_or(0, OrientationGate::held_ms),
            detection_session: self.detection.session(),
            last_report: self.last_report.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

impl Drop for CaptureFlow {
    fn drop(&mut self) {
        self.release();
    }
}
