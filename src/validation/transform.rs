//! Mapping between live video coordinates and template coordinates.
//!
//! The template is scaled so its height covers a fixed share of the video
//! height, centered in both axes, and mirrored horizontally to match the
//! mirrored self-view. As a homogeneous 2D affine map (template → video):
//!
//! ```text
//! | -s  0  W - offX |
//! |  0  s  offY     |
//! |  0  0  1        |
//! ```

use nalgebra::{Matrix3, Point2};

/// Affine transform between template and video space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateTransform {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    to_video: Matrix3<f64>,
    to_template: Matrix3<f64>,
}

impl TemplateTransform {
    /// Build the transform for a template of `template_size` shown over a
    /// video of `video_size`, with the template height scaled to
    /// `height_ratio` of the video height.
    ///
    /// Returns `None` when any dimension is zero or the map is degenerate.
    #[must_use]
    pub fn new(template_size: (u32, u32), video_size: (u32, u32), height_ratio: f64) -> Option<Self> {
        let (tw, th) = (f64::from(template_size.0), f64::from(template_size.1));
        let (vw, vh) = (f64::from(video_size.0), f64::from(video_size.1));
        if tw <= 0.0 || th <= 0.0 || vw <= 0.0 || vh <= 0.0 {
            return None;
        }

        let scale = vh * height_ratio / th;
        let offset_x = (vw - tw * scale) / 2.0;
        let offset_y = (vh - th * scale) / 2.0;

        #[rustfmt::skip]
        let to_video = Matrix3::new(
            -scale, 0.0,   vw - offset_x,
            0.0,    scale, offset_y,
            0.0,    0.0,   1.0,
        );
        let to_template = to_video.try_inverse()?;

        Some(Self {
            scale,
            offset_x,
            offset_y,
            to_video,
            to_template,
        })
    }

    /// Video pixel → template pixel (not rounded)
    #[must_use]
    pub fn video_to_template(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.to_template.transform_point(&Point2::new(x, y));
        (p.x, p.y)
    }

    /// Template pixel → video pixel, used to overlay zones on the live view
    #[must_use]
    pub fn template_to_video(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.to_video.transform_point(&Point2::new(x, y));
        (p.x, p.y)
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[must_use]
    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn test_scale_and_offsets() {
        // 100x200 template over 640x480 video: 480 * 0.8 / 200 = 1.92
        let t = TemplateTransform::new((100, 200), (640, 480), 0.8).unwrap();
        assert!((t.scale() - 1.92).abs() < 1e-12);
        let (ox, oy) = t.offset();
        assert!((ox - (640.0 - 192.0) / 2.0).abs() < 1e-9);
        assert!((oy - (480.0 - 384.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_inverse_matches_closed_form() {
        let t = TemplateTransform::new((100, 200), (640, 480), 0.8).unwrap();
        let (ox, oy) = t.offset();
        let s = t.scale();
        let (vx, vy) = (300.0, 250.0);
        let expected = ((640.0 - vx - ox) / s, (vy - oy) / s);
        assert!(close(t.video_to_template(vx, vy), expected));
    }

    #[test]
    fn test_mirroring() {
        // Template's left edge lands on the video's right side
        let t = TemplateTransform::new((100, 100), (400, 100), 1.0).unwrap();
        assert!(close(t.template_to_video(0.0, 0.0), (250.0, 0.0)));
        assert!(close(t.template_to_video(100.0, 0.0), (150.0, 0.0)));
    }

    #[test]
    fn test_round_trip() {
        let t = TemplateTransform::new((343, 275), (1280, 720), 0.8).unwrap();
        let v = t.template_to_video(12.5, 200.0);
        assert!(close(t.video_to_template(v.0, v.1), (12.5, 200.0)));
    }

    #[test]
    fn test_degenerate_sizes() {
        assert!(TemplateTransform::new((0, 10), (640, 480), 0.8).is_none());
        assert!(TemplateTransform::new((10, 10), (640, 0), 0.8).is_none());
        assert!(TemplateTransform::new((10, 10), (640, 480), 0.0).is_none());
    }
}
