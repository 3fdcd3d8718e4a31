use super::CameraBackend;
use crate::config::StreamSettings;
use crate::{Error, Result};
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Camera that renders a gradient pattern instead of reading a device.
///
/// Pixel `(x, y)` of the raw frame is `[x, y, frame]` (each wrapped to a byte),
/// so orientation is easy to check after mirroring.
#[derive(Debug)]
pub struct SyntheticCamera {
    capability: StreamSettings,
    available: bool,
    permission: bool,
    fail_after: Option<u64>,
    frames_read: u64,
    size: Option<(u32, u32)>,
    streaming: Arc<AtomicBool>,
}

impl SyntheticCamera {
    /// A device whose best mode is `width`x`height` at `fps`
    #[must_use]
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            capability: StreamSettings { width, height, fps },
            available: true,
            permission: true,
            fail_after: None,
            frames_read: 0,
            size: None,
            streaming: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A platform with no camera at all
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(0, 0, 0)
        }
    }

    /// Make every `open` fail as if the user refused the prompt
    #[must_use]
    pub fn deny_permission(mut self) -> Self {
        self.permission = false;
        self
    }

    /// Make reads fail once `frames` frames have been delivered
    #[must_use]
    pub fn fail_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Shared flag that is true while the stream is open
    #[must_use]
    pub fn streaming_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.streaming)
    }

    fn satisfies(&self, wanted: &StreamSettings) -> bool {
        wanted.width <= self.capability.width
            && wanted.height <= self.capability.height
            && wanted.fps <= self.capability.fps
    }
}

impl CameraBackend for SyntheticCamera {
    fn is_available(&self) -> bool {
        self.available
    }

    fn open(&mut self, constraints: Option<&StreamSettings>) -> Result<(u32, u32)> {
        if !self.permission {
            return Err(Error::PermissionDenied);
        }
        let size = match constraints {
            Some(wanted) if !self.satisfies(wanted) => {
                return Err(Error::ConstraintsUnsatisfied(format!(
                    "{}x{}@{} exceeds device mode {}x{}@{}",
                    wanted.width,
                    wanted.height,
                    wanted.fps,
                    self.capability.width,
                    self.capability.height,
                    self.capability.fps
                )));
            }
            Some(wanted) => (wanted.width, wanted.height),
            None => (self.capability.width, self.capability.height),
        };
        if size.0 == 0 || size.1 == 0 {
            return Err(Error::DeviceError("Device reports an empty frame size".to_string()));
        }
        self.size = Some(size);
        self.frames_read = 0;
        self.streaming.store(true, Ordering::SeqCst);
        Ok(size)
    }

    #[allow(clippy::cast_possible_truncation)] // wrapping is intended
    fn read_frame(&mut self) -> Result<RgbImage> {
        let Some((width, height)) = self.size else {
            return Err(Error::DeviceError("Stream is not open".to_string()));
        };
        if self.fail_after.is_some_and(|limit| self.frames_read >= limit) {
            return Err(Error::DeviceError("Synthetic read failure".to_string()));
        }
        let frame = self.frames_read as u8;
        self.frames_read += 1;
        Ok(RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, frame])))
    }

    fn close(&mut self) {
        self.size = None;
        self.streaming.store(false, Ordering::SeqCst);
    }
}
