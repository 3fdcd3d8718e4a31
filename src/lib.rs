//! Guided photo capture with template-based body pose validation.
//!
//! The library walks a user through taking a front or side photo:
//! - A camera source streams mirrored preview frames
//! - An external pose estimator turns each frame into 17 keypoints
//! - A validator maps the keypoints onto a color-coded reference template
//! - A state machine waits for a stable valid pose, counts down and captures
//!
//! The side photo can additionally require the device to be held upright,
//! which is detected from smoothed accelerometer samples.
//!
//! # Examples
//!
//! ## Validating a pose against a template
//!
//! ```no_run
//! use pose_capture::config::ValidationConfig;
//! use pose_capture::template::{PoseKind, PoseTemplate};
//! use pose_capture::validation::{PoseCheck, PoseValidator};
//! use pose_capture::keypoint::Pose;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("assets/front_pose.png")?;
//! let template = PoseTemplate::decode(&bytes, PoseKind::Front.zones())?;
//! let validator = PoseValidator::new(Some(Arc::new(template)), &ValidationConfig::default());
//!
//! // Keypoints come from the pose estimator
//! let pose = Pose::default();
//! let report = validator.evaluate(Some(&pose), 640, 480);
//! println!("valid: {}, missing zones: {:?}", report.is_valid, report.unsatisfied);
//! # Ok(())
//! # }
//! ```
//!
//! ## Smoothing accelerometer samples
//!
//! ```no_run
//! use pose_capture::config::Config;
//! use pose_capture::motion::MotionSample;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut smoother = config.create_smoother()?;
//! let classifier = config.orientation.classifier();
//!
//! if let Some(smoothed) = smoother.smooth(MotionSample::new(0.1, 9.7, 0)) {
//!     let orientation = classifier.classify(smoothed);
//!     println!("upright: {}", orientation.upright);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Running a capture flow
//!
//! ```no_run
//! use pose_capture::camera::{Camera, SyntheticCamera};
//! use pose_capture::capture::{CaptureEvent, CaptureFlow, CaptureState};
//! use pose_capture::config::Config;
//! use pose_capture::estimator::ScriptedEstimator;
//! use pose_capture::keypoint::Pose;
//! use pose_capture::store::{ImageStore, MemoryImageStore};
//! use pose_capture::template::{FsTemplateSource, PoseKind, TemplateCache};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let camera = Camera::new(Box::new(SyntheticCamera::new(1280, 720, 30)), config.camera.clone());
//! let estimator = ScriptedEstimator::constant(Pose::default());
//! let mut flow = CaptureFlow::new(PoseKind::Front, config.clone(), camera, Box::new(estimator), false)?;
//!
//! let mut templates = TemplateCache::new();
//! flow.load_template(&mut templates, &FsTemplateSource::new(&config.templates.root))?;
//! flow.start()?;
//!
//! while flow.state() != CaptureState::Reviewing {
//!     flow.process_frame()?;
//!     for event in flow.advance(33) {
//!         if let CaptureEvent::CountdownTick(n) = event {
//!             println!("{n}");
//!         }
//!     }
//! }
//!
//! let mut store = MemoryImageStore::new();
//! store.init()?;
//! let id = flow.accept(&mut store)?;
//! println!("Saved photo {id}");
//! # Ok(())
//! # }
//! ```

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

/// Pluggable two-axis filters for sensor smoothing
pub mod filters;

/// Motion smoothing and upright orientation detection
pub mod motion;

/// Body keypoints as produced by the pose estimator
pub mod keypoint;

/// Moving-average smoothing of keypoint sets
pub mod keypoint_smoothing;

/// Reference template decoding and validation zones
pub mod template;

/// Pose validation against templates or reference keypoints
pub mod validation;

/// Camera source with mirrored preview and still capture
pub mod camera;

/// Pose estimator adapter
pub mod estimator;

/// Detection loop bookkeeping: session guard and in-flight frames
pub mod detection;

/// Guided capture state machine
pub mod capture;

/// Image and settings persistence
pub mod store;

/// Try-on result cache
pub mod cache;

#[doc(hidden)]
pub mod testing;

pub use error::{Error, Result};
