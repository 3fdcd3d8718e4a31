//! Pose validation against a reference template.
//!
//! Keypoints arrive in mirrored video space. Each one is rounded, mapped into
//! template space through [`TemplateTransform`], and looked up in the
//! template's pixel index. A zone is satisfied only when every one of its
//! required keypoints lands on one of the zone's accepted colors; the pose is
//! valid only when every zone is satisfied.

/// Legacy offset-threshold policy
pub mod offset;

/// Reference keypoint layouts
pub mod reference;

/// Video ↔ template coordinate mapping
pub mod transform;

use crate::config::{ValidationConfig, ValidationPolicy};
use crate::keypoint::{Keypoint, Pose};
use crate::template::{PoseKind, PoseTemplate, ValidationZone};
use log::debug;
use std::sync::Arc;

pub use offset::OffsetThresholdValidator;
pub use reference::{ReferencePose, FRONT_REFERENCE, IMPORTANT_KEYPOINTS, SIDE_REFERENCE};
pub use transform::TemplateTransform;

/// Outcome of one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub is_valid: bool,
    /// Zones (or keypoints, for the offset policy) that passed
    pub satisfied: Vec<&'static str>,
    /// Zones (or keypoints) that did not
    pub unsatisfied: Vec<&'static str>,
}

impl ValidationReport {
    /// A failing report with everything unsatisfied
    #[must_use]
    pub fn invalid(unsatisfied: Vec<&'static str>) -> Self {
        Self {
            is_valid: false,
            satisfied: Vec::new(),
            unsatisfied,
        }
    }
}

/// A per-frame pose validity check
pub trait PoseCheck: Send + Sync {
    /// Evaluate the current frame's pose. `None` means nothing was detected.
    fn evaluate(&self, pose: Option<&Pose>, frame_width: u32, frame_height: u32) -> ValidationReport;

    /// Get the check's name
    fn name(&self) -> &str;
}

/// Zone/color validator
#[derive(Debug, Clone)]
pub struct PoseValidator {
    template: Option<Arc<PoseTemplate>>,
    height_ratio: f64,
    min_score: f32,
}

impl PoseValidator {
    /// Create a validator. A `None` template makes every pose invalid.
    #[must_use]
    pub fn new(template: Option<Arc<PoseTemplate>>, config: &ValidationConfig) -> Self {
        Self {
            template,
            height_ratio: config.template_height_ratio,
            min_score: config.min_keypoint_score,
        }
    }

    /// Swap the template, e.g. after the user picks another pose variant
    pub fn set_template(&mut self, template: Option<Arc<PoseTemplate>>) {
        self.template = template;
    }

    #[must_use]
    pub fn template(&self) -> Option<&Arc<PoseTemplate>> {
        self.template.as_ref()
    }

    /// Transform for the current template and frame size
    #[must_use]
    pub fn transform(&self, frame_width: u32, frame_height: u32) -> Option<TemplateTransform> {
        let template = self.template.as_ref()?;
        TemplateTransform::new(
            (template.width(), template.height()),
            (frame_width, frame_height),
            self.height_ratio,
        )
    }

    /// Whether one keypoint lands on an accepted color of `zone`
    #[must_use]
    pub fn validate_keypoint(
        &self,
        template: &PoseTemplate,
        transform: &TemplateTransform,
        keypoint: &Keypoint,
        zone: &ValidationZone,
    ) -> bool {
        if !keypoint.is_confident(self.min_score) {
            return false;
        }
        let (tx, ty) = transform.video_to_template(keypoint.x.round(), keypoint.y.round());
        match template.pixel_color_at(tx, ty) {
            Some(color) if zone.accepts(color) => true,
            Some(color) => {
                debug!(
                    "{} in zone {} hit color {} at ({:.0}, {:.0})",
                    keypoint.name, zone.name, color, tx, ty
                );
                false
            }
            None => {
                debug!("{} in zone {} maps outside the template", keypoint.name, zone.name);
                false
            }
        }
    }

    fn zone_satisfied(
        &self,
        template: &PoseTemplate,
        transform: &TemplateTransform,
        pose: &Pose,
        zone: &ValidationZone,
    ) -> bool {
        zone.required_keypoints.iter().all(|&name| {
            pose.by_name(name)
                .is_some_and(|kp| self.validate_keypoint(template, transform, kp, zone))
        })
    }
}

impl PoseCheck for PoseValidator {
    fn evaluate(&self, pose: Option<&Pose>, frame_width: u32, frame_height: u32) -> ValidationReport {
        let Some(template) = self.template.as_deref() else {
            return ValidationReport::default();
        };
        let all_zones = || -> Vec<&'static str> { template.zones().iter().map(|z| z.name).collect() };
        let Some(pose) = pose else {
            return ValidationReport::invalid(all_zones());
        };
        let Some(transform) = self.transform(frame_width, frame_height) else {
            return ValidationReport::invalid(all_zones());
        };

        let mut report = ValidationReport::default();
        for zone in template.zones() {
            if self.zone_satisfied(template, &transform, pose, zone) {
                report.satisfied.push(zone.name);
            } else {
                report.unsatisfied.push(zone.name);
            }
        }
        report.is_valid = report.unsatisfied.is_empty() && !report.satisfied.is_empty();
        report
    }

    fn name(&self) -> &str {
        "Zones"
    }
}

/// Build the configured check for one photo
#[must_use]
pub fn create_check(config: &ValidationConfig, kind: PoseKind, template: Option<Arc<PoseTemplate>>) -> Box<dyn PoseCheck> {
    match config.policy {
        ValidationPolicy::Zones => Box::new(PoseValidator::new(template, config)),
        ValidationPolicy::OffsetThreshold => {
            Box::new(OffsetThresholdValidator::new(ReferencePose::for_kind(kind), config))
        }
    }
}
