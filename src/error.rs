//! Error types for camzoom operations

use thiserror::Error;

/// Result type alias using camzoom's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for camzoom operations
#[derive(Error, Debug)]
pub enum Error {
    /// Camera-related errors
    #[error("Camera error: {0}")]
    Camera(String),

    /// Camera device not found
    #[error("Camera device not found: {0}")]
    CameraNotFound(String),

    /// The platform refused access to the device or its inventory
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The device is held by another stream or process
    #[error("Device busy: {0}")]
    DeviceBusy(String),

    /// The requested constraints cannot be met by the device
    #[error("Constraint unsatisfiable: {0}")]
    ConstraintUnsatisfiable(String),

    /// Device id is not part of the current device list
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// No device has been selected yet
    #[error("No camera selected")]
    NoDeviceSelected,

    /// Operation requires an open stream
    #[error("No active stream")]
    NoActiveStream,

    /// Failed to capture frame from camera
    #[error("Frame capture failed: {0}")]
    FrameCapture(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

// V4L errors are classified manually in the camera module

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}
