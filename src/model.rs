//! Core data model shared by the controllers and the view

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A video input device as listed by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Opaque identifier, stable for the lifetime of the session
    pub id: String,
    /// Human-readable label; empty when the platform withholds it
    pub label: String,
}

impl Device {
    /// Label to show for this device at the given 0-based list position.
    pub fn display_label(&self, position: usize) -> String {
        if self.label.is_empty() {
            format!("Camera {}", position + 1)
        } else {
            self.label.clone()
        }
    }
}

/// Supported capture resolutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// 640x480
    #[serde(rename = "640x480")]
    Vga,
    /// 1280x720
    #[serde(rename = "1280x720")]
    Hd,
    /// 1920x1080
    #[default]
    #[serde(rename = "1920x1080")]
    FullHd,
    /// 3840x2160
    #[serde(rename = "3840x2160")]
    Uhd,
}

impl Resolution {
    /// Every selectable resolution, in display order
    pub const ALL: [Resolution; 4] = [
        Resolution::Vga,
        Resolution::Hd,
        Resolution::FullHd,
        Resolution::Uhd,
    ];

    /// Width in pixels
    pub fn width(self) -> u32 {
        self.dimensions().0
    }

    /// Height in pixels
    pub fn height(self) -> u32 {
        self.dimensions().1
    }

    /// `(width, height)` pair
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Vga => (640, 480),
            Resolution::Hd => (1280, 720),
            Resolution::FullHd => (1920, 1080),
            Resolution::Uhd => (3840, 2160),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        write!(f, "{width}x{height}")
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase().replace('×', "x");
        Resolution::ALL
            .into_iter()
            .find(|res| res.to_string() == normalized)
            .ok_or_else(|| {
                Error::Config(format!(
                    "Unsupported resolution '{value}', expected one of 640x480, 1280x720, 1920x1080, 3840x2160"
                ))
            })
    }
}

/// Lower bound of every zoom range
pub const ZOOM_MIN: f64 = 1.0;

/// Distance within which a stepped level is taken to sit on a bound
const BOUND_TOLERANCE: f64 = 1e-9;

/// Zoom bounds of the active stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    /// Always [`ZOOM_MIN`]
    pub min: f64,
    /// Device-reported maximum, never below `min`
    pub max: f64,
}

impl ZoomRange {
    /// Range of a device without zoom support
    pub fn inert() -> Self {
        Self {
            min: ZOOM_MIN,
            max: ZOOM_MIN,
        }
    }

    /// Range normalised to a floor of 1.0 with the given reported maximum.
    pub fn up_to(max: f64) -> Self {
        let max = if max.is_finite() { max.max(ZOOM_MIN) } else { ZOOM_MIN };
        Self { min: ZOOM_MIN, max }
    }

    /// `true` when min == max and zoom controls are inert
    pub fn is_degenerate(&self) -> bool {
        self.max <= self.min
    }

    /// Clamp a value into the range
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Clamp a stepped level, landing exactly on a bound it is within rounding of.
    pub fn settle(&self, value: f64) -> f64 {
        let value = self.clamp(value);
        if (value - self.min).abs() < BOUND_TOLERANCE {
            self.min
        } else if (self.max - value).abs() < BOUND_TOLERANCE {
            self.max
        } else {
            value
        }
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self::inert()
    }
}

/// Published zoom state: range plus the optimistic current level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    /// Bounds reported by the active track
    pub range: ZoomRange,
    /// Last requested level
    pub level: f64,
}

impl ZoomState {
    /// State with no zoomable stream
    pub fn inert() -> Self {
        Self {
            range: ZoomRange::inert(),
            level: ZOOM_MIN,
        }
    }

    /// Whether a zoom-in request would change the level
    pub fn can_zoom_in(&self) -> bool {
        !self.range.is_degenerate() && self.level < self.range.max
    }

    /// Whether a zoom-out request would change the level
    pub fn can_zoom_out(&self) -> bool {
        !self.range.is_degenerate() && self.level > self.range.min
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::inert()
    }
}

/// Negotiated details of the currently open stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Platform stream identifier
    pub stream_id: String,
    /// Device the stream was opened on
    pub device_id: String,
    /// Resolution that was requested
    pub requested: Resolution,
    /// Width actually delivered by the device
    pub width: u32,
    /// Height actually delivered by the device
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label_placeholder() {
        let unnamed = Device {
            id: "a".into(),
            label: String::new(),
        };
        let named = Device {
            id: "b".into(),
            label: "Front".into(),
        };
        assert_eq!(unnamed.display_label(0), "Camera 1");
        assert_eq!(named.display_label(1), "Front");
    }

    #[test]
    fn test_resolution_parse_and_display() {
        assert_eq!("1280x720".parse::<Resolution>().unwrap(), Resolution::Hd);
        assert_eq!(" 3840X2160 ".parse::<Resolution>().unwrap(), Resolution::Uhd);
        assert_eq!(Resolution::Vga.to_string(), "640x480");
        assert!("800x600".parse::<Resolution>().is_err());
        assert_eq!(Resolution::default(), Resolution::FullHd);
    }

    #[test]
    fn test_zoom_range_normalisation() {
        assert!(ZoomRange::inert().is_degenerate());
        assert!(ZoomRange::up_to(0.5).is_degenerate());
        assert!(ZoomRange::up_to(f64::NAN).is_degenerate());
        let range = ZoomRange::up_to(3.0);
        assert_eq!(range.min, 1.0);
        assert_eq!(range.max, 3.0);
        assert_eq!(range.clamp(7.0), 3.0);
    }

    #[test]
    fn test_zoom_range_settle() {
        let range = ZoomRange::up_to(3.0);
        assert_eq!(range.settle(1.1 - 0.1), 1.0);
        assert_eq!(range.settle(0.9), 1.0);
        assert_eq!(range.settle(3.0000000000000004), 3.0);
        assert_eq!(range.settle(2.9999999999999996), 3.0);
        assert_eq!(range.settle(1.33456789), 1.33456789);
    }

    #[test]
    fn test_zoom_state_buttons() {
        let mut state = ZoomState {
            range: ZoomRange::up_to(3.0),
            level: 1.0,
        };
        assert!(state.can_zoom_in());
        assert!(!state.can_zoom_out());
        state.level = 3.0;
        assert!(!state.can_zoom_in());
        assert!(state.can_zoom_out());

        let inert = ZoomState::inert();
        assert!(!inert.can_zoom_in());
        assert!(!inert.can_zoom_out());
    }
}
