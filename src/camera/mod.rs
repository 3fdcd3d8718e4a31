//! Camera source: stream acquisition, mirrored self-view and still capture.
//!
//! The live display frame is flipped horizontally so the user sees a mirror.
//! Stills are drawn back through the same flip, so stored photos are never
//! mirrored.

/// Deterministic in-memory camera
pub mod synthetic;

/// Live camera through `OpenCV`
#[cfg(feature = "opencv")]
pub mod opencv_backend;

use crate::config::{CameraConfig, StreamSettings};
use crate::{Error, Result};
use image::{codecs::jpeg::JpegEncoder, imageops, RgbImage};
use log::{debug, info, warn};

pub use synthetic::SyntheticCamera;

/// A device that can deliver RGB frames
pub trait CameraBackend: Send {
    /// Whether any camera API or device exists at all
    fn is_available(&self) -> bool;

    /// Open a front-facing stream. `None` means "any settings".
    ///
    /// Returns the negotiated frame size.
    ///
    /// # Errors
    ///
    /// `ConstraintsUnsatisfied` if the device cannot meet `constraints`,
    /// `PermissionDenied` or `DeviceError` otherwise
    fn open(&mut self, constraints: Option<&StreamSettings>) -> Result<(u32, u32)>;

    /// Read the next raw (unmirrored) frame
    ///
    /// # Errors
    ///
    /// `DeviceError` if the stream is closed or the read fails
    fn read_frame(&mut self) -> Result<RgbImage>;

    /// Release the stream. Safe to call when not open.
    fn close(&mut self);
}

/// One frame as shown to the user
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// Increments with every frame read since `start()`
    pub sequence: u64,
}

impl Frame {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Encoded still photo, never mirrored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Still {
    /// JPEG bytes
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Owns one camera stream on behalf of a capture flow
pub struct Camera {
    backend: Box<dyn CameraBackend>,
    config: CameraConfig,
    resolution: Option<(u32, u32)>,
    last_display: Option<RgbImage>,
    sequence: u64,
}

impl Camera {
    #[must_use]
    pub fn new(backend: Box<dyn CameraBackend>, config: CameraConfig) -> Self {
        Self {
            backend,
            config,
            resolution: None,
            last_display: None,
            sequence: 0,
        }
    }

    /// Start streaming, trying ideal constraints, then the minimum, then none
    ///
    /// # Errors
    ///
    /// `CameraUnavailable`, `PermissionDenied` or `DeviceError`
    pub fn start(&mut self) -> Result<(u32, u32)> {
        if let Some(resolution) = self.resolution {
            return Ok(resolution);
        }
        if !self.backend.is_available() {
            return Err(Error::CameraUnavailable("No camera device found".to_string()));
        }

        let ladder = [Some(self.config.ideal), Some(self.config.minimum), None];
        for constraints in &ladder {
            match self.backend.open(constraints.as_ref()) {
                Ok(resolution) => {
                    info!("Camera started at {}x{}", resolution.0, resolution.1);
                    self.resolution = Some(resolution);
                    self.sequence = 0;
                    return Ok(resolution);
                }
                Err(Error::ConstraintsUnsatisfied(reason)) => {
                    debug!("Camera constraints {constraints:?} rejected: {reason}");
                }
                Err(e) => {
                    self.backend.close();
                    return Err(e);
                }
            }
        }

        self.backend.close();
        Err(Error::DeviceError("No usable stream configuration".to_string()))
    }

    /// Stop streaming and drop the last frame. Idempotent.
    pub fn stop(&mut self) {
        if self.resolution.take().is_some() {
            info!("Camera stopped");
        }
        self.backend.close();
        self.last_display = None;
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.resolution.is_some()
    }

    #[must_use]
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    /// Read the next frame in display orientation
    ///
    /// # Errors
    ///
    /// `DeviceError` if the camera is not streaming or the read fails
    pub fn next_frame(&mut self) -> Result<Frame> {
        if !self.is_streaming() {
            return Err(Error::DeviceError("Camera is not started".to_string()));
        }
        let raw = self.backend.read_frame()?;
        let display = if self.config.mirror_display {
            imageops::flip_horizontal(&raw)
        } else {
            raw
        };
        self.sequence += 1;
        self.last_display = Some(display.clone());
        Ok(Frame {
            image: display,
            sequence: self.sequence,
        })
    }

    /// Capture the most recent frame as an unmirrored JPEG
    ///
    /// # Errors
    ///
    /// `DeviceError` if no frame was read yet, `Image` if encoding fails
    pub fn capture_still(&self) -> Result<Still> {
        let Some(display) = self.last_display.as_ref() else {
            warn!("Still requested before any frame was read");
            return Err(Error::DeviceError("No frame available for capture".to_string()));
        };
        let still = if self.config.mirror_display {
            imageops::flip_horizontal(display)
        } else {
            display.clone()
        };
        let jpeg = encode_jpeg(&still, self.config.jpeg_quality)?;
        debug!("Captured still {}x{} ({} bytes)", still.width(), still.height(), jpeg.len());
        Ok(Still {
            jpeg,
            width: still.width(),
            height: still.height(),
        })
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Encode an RGB image as JPEG
///
/// # Errors
///
/// Returns `Error::Image` if encoding fails
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(image)?;
    Ok(bytes)
}
