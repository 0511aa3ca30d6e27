//! V4L2 backend configuration

use crate::frame::PixelFormat;
use serde::{Deserialize, Serialize};

/// Settings applied by the V4L2 backend when it opens a device.
///
/// Width, height and the device itself come from the stream constraints;
/// everything here is backend tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Highest `/dev/videoN` index probed during enumeration
    pub max_index: usize,

    /// Frames per second
    pub fps: u32,

    /// Pixel format (MJPEG recommended for performance)
    pub format: PixelFormat,

    /// Number of V4L2 buffers to keep mapped (higher = smoother but more memory)
    pub buffer_count: u32,

    /// Raw `zoom_absolute` units per 1.0x of zoom.
    ///
    /// When unset, the control's reported minimum is used so that the device's
    /// widest setting maps to 1.0x.
    pub zoom_unit: Option<f64>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            max_index: 16,
            fps: 30,
            format: PixelFormat::Mjpeg,
            buffer_count: 4,
            zoom_unit: None,
        }
    }
}

/// Convert to a V4L2 FourCC code
pub fn to_fourcc(format: PixelFormat) -> v4l::FourCC {
    match format {
        PixelFormat::Mjpeg => v4l::FourCC::new(b"MJPG"),
        PixelFormat::Yuyv => v4l::FourCC::new(b"YUYV"),
        PixelFormat::Rgb24 => v4l::FourCC::new(b"RGB3"),
    }
}

/// Map a negotiated FourCC back to a decodable pixel format
pub fn from_fourcc(fourcc: v4l::FourCC) -> Option<PixelFormat> {
    match &fourcc.repr {
        b"MJPG" | b"JPEG" => Some(PixelFormat::Mjpeg),
        b"YUYV" => Some(PixelFormat::Yuyv),
        b"RGB3" => Some(PixelFormat::Rgb24),
        _ => None,
    }
}
