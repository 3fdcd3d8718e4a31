//! Error types for the guided capture pipeline.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// The user (or platform policy) refused camera access
    #[error("Camera permission denied")]
    PermissionDenied,

    /// No camera API or device is available on this platform
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// Any other failure while acquiring or reading the camera
    #[error("Camera device error: {0}")]
    DeviceError(String),

    /// The requested stream constraints cannot be met by the device
    #[error("Camera constraints not satisfied: {0}")]
    ConstraintsUnsatisfied(String),

    /// Reference template could not be fetched or decoded
    #[error("Failed to load pose template {path}: {reason}")]
    TemplateLoadError {
        /// Template path as requested by the caller
        path: String,
        /// Underlying cause
        reason: String,
    },

    /// Pose estimator could not be initialized
    #[error("Pose estimator initialization failed: {0}")]
    EstimatorInitError(String),

    /// A single frame could not be processed
    #[error("Frame processing error: {0}")]
    FrameProcessingError(String),

    /// An action was requested in a state that does not allow it
    #[error("Invalid transition: cannot {action} while {from}")]
    InvalidTransition {
        /// Current state name
        from: String,
        /// Requested action
        action: String,
    },

    /// Image or settings store error
    #[error("Store error: {0}")]
    StoreError(String),

    /// Filter initialization or parameter error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding or decoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Whether the error leaves the capture flow unable to continue.
    ///
    /// Frame-level failures are recoverable by restarting detection; everything
    /// raised while acquiring the camera, template or estimator is not.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::CameraUnavailable(_)
                | Self::DeviceError(_)
                | Self::TemplateLoadError { .. }
                | Self::EstimatorInitError(_)
        )
    }

    pub(crate) fn template(path: &str, reason: impl ToString) -> Self {
        Self::TemplateLoadError {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert!(Error::PermissionDenied.is_terminal());
        assert!(Error::template("/poses/side.png", "404").is_terminal());
        assert!(!Error::FrameProcessingError("timeout".into()).is_terminal());
        assert!(!Error::StoreError("closed".into()).is_terminal());
    }

    #[test]
    fn test_template_error_message() {
        let err = Error::template("/poses/front.png", "bad signature");
        assert_eq!(
            err.to_string(),
            "Failed to load pose template /poses/front.png: bad signature"
        );
    }
}
