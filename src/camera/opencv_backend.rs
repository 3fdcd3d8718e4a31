use super::CameraBackend;
use crate::config::StreamSettings;
use crate::{Error, Result};
use image::{Rgb, RgbImage};
use log::{debug, info};
use opencv::{
    core::{Mat, Vec3b},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};

fn device_error(e: opencv::Error) -> Error {
    Error::DeviceError(e.to_string())
}

/// Webcam read through `OpenCV`'s `VideoCapture`
pub struct OpenCvCamera {
    index: i32,
    capture: Option<VideoCapture>,
}

impl OpenCvCamera {
    #[must_use]
    pub fn new(index: i32) -> Self {
        Self { index, capture: None }
    }
}

impl CameraBackend for OpenCvCamera {
    fn is_available(&self) -> bool {
        true
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn open(&mut self, constraints: Option<&StreamSettings>) -> Result<(u32, u32)> {
        self.close();

        let mut cap = VideoCapture::new(self.index, videoio::CAP_ANY).map_err(device_error)?;
        if !cap.is_opened().map_err(device_error)? {
            return Err(Error::CameraUnavailable(format!("Cannot open camera {}", self.index)));
        }
        // Keep latency low
        cap.set(CAP_PROP_BUFFERSIZE, 1.0).map_err(device_error)?;

        if let Some(wanted) = constraints {
            cap.set(CAP_PROP_FRAME_WIDTH, f64::from(wanted.width)).map_err(device_error)?;
            cap.set(CAP_PROP_FRAME_HEIGHT, f64::from(wanted.height)).map_err(device_error)?;
            cap.set(CAP_PROP_FPS, f64::from(wanted.fps)).map_err(device_error)?;
        }

        let width = cap.get(CAP_PROP_FRAME_WIDTH).map_err(device_error)? as u32;
        let height = cap.get(CAP_PROP_FRAME_HEIGHT).map_err(device_error)? as u32;
        let fps = cap.get(CAP_PROP_FPS).map_err(device_error)?;
        debug!("Camera {} negotiated {}x{}@{:.0}", self.index, width, height, fps);

        if let Some(wanted) = constraints {
            // Some drivers report 0 fps; only reject on a known-lower rate
            let fps_short = fps > 0.0 && fps < f64::from(wanted.fps);
            if width < wanted.width || height < wanted.height || fps_short {
                cap.release().map_err(device_error)?;
                return Err(Error::ConstraintsUnsatisfied(format!(
                    "got {width}x{height}@{fps:.0}, wanted {}x{}@{}",
                    wanted.width, wanted.height, wanted.fps
                )));
            }
        }

        info!("Opened camera {} at {}x{}", self.index, width, height);
        self.capture = Some(cap);
        Ok((width, height))
    }

    #[allow(clippy::cast_sign_loss)]
    fn read_frame(&mut self) -> Result<RgbImage> {
        let cap = self
            .capture
            .as_mut()
            .ok_or_else(|| Error::DeviceError("Stream is not open".to_string()))?;

        let mut mat = Mat::default();
        if !cap.read(&mut mat).map_err(device_error)? || mat.empty() {
            return Err(Error::DeviceError("Failed to read frame".to_string()));
        }

        let (rows, cols) = (mat.rows(), mat.cols());
        let mut image = RgbImage::new(cols as u32, rows as u32);
        for row in 0..rows {
            for col in 0..cols {
                let bgr = mat.at_2d::<Vec3b>(row, col).map_err(device_error)?;
                image.put_pixel(col as u32, row as u32, Rgb([bgr[2], bgr[1], bgr[0]]));
            }
        }
        Ok(image)
    }

    fn close(&mut self) {
        if let Some(mut cap) = self.capture.take() {
            if let Err(e) = cap.release() {
                log::warn!("Failed to release camera {}: {}", self.index, e);
            }
        }
    }
}
