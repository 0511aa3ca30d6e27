//! Host media-device platform abstraction
//!
//! Everything the session needs from the outside world goes through
//! [`MediaDevices`] and [`MediaTrack`]: device enumeration, stream
//! acquisition, capability/settings introspection, constraint application and
//! teardown. The V4L2 backend lives in [`crate::camera`]; an in-memory
//! implementation lives in [`simulated`].

pub mod simulated;

use crate::error::Result;
use crate::frame::Frame;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub use simulated::{PlatformEvent, SimulatedCamera, SimulatedPlatform};

/// Kind tag of an enumerated device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Camera or other video capture source
    VideoInput,
    /// Microphone
    AudioInput,
    /// Speaker or headset
    AudioOutput,
}

/// Device record as reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Stable identifier
    pub device_id: String,
    /// Human label, possibly empty
    pub label: String,
    /// Device class
    pub kind: DeviceKind,
}

/// Constraints for stream acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Device the stream must come from
    pub device_id: String,
    /// Preferred frame width (hint)
    pub width: u32,
    /// Preferred frame height (hint)
    pub height: u32,
    /// Whether an audio track is requested
    pub audio: bool,
}

/// Supported range of a numeric track property
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapabilityRange {
    /// Smallest accepted value
    pub min: f64,
    /// Largest accepted value
    pub max: f64,
    /// Granularity, 0.0 when continuous or unknown
    pub step: f64,
}

/// Capability set of a track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackCapabilities {
    /// Zoom range, when the hardware offers zoom
    pub zoom: Option<CapabilityRange>,
}

/// Current settings of a track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackSettings {
    /// Device the track reads from
    pub device_id: String,
    /// Negotiated frame width
    pub width: Option<u32>,
    /// Negotiated frame height
    pub height: Option<u32>,
    /// Current zoom value, if the device reports one
    pub zoom: Option<f64>,
}

/// One set of advanced constraints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSet {
    /// Requested zoom value
    pub zoom: Option<f64>,
}

/// Constraints applied to a live track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackConstraints {
    /// Advanced constraint sets, applied in order
    pub advanced: Vec<ConstraintSet>,
}

impl TrackConstraints {
    /// Constraints carrying a single advanced zoom value
    pub fn zoom(value: f64) -> Self {
        Self {
            advanced: vec![ConstraintSet { zoom: Some(value) }],
        }
    }

    /// Last zoom value requested across all sets
    pub fn requested_zoom(&self) -> Option<f64> {
        self.advanced.iter().rev().find_map(|set| set.zoom)
    }
}

/// Media kind of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Video frames
    Video,
    /// Audio samples
    Audio,
}

/// A live track inside a [`MediaStream`]
#[async_trait]
pub trait MediaTrack: Send + Sync {
    /// Platform track identifier
    fn id(&self) -> &str;

    /// Media kind
    fn kind(&self) -> TrackKind;

    /// Supported property ranges
    fn capabilities(&self) -> TrackCapabilities;

    /// Current property values
    fn settings(&self) -> TrackSettings;

    /// Request new property values on the live track
    async fn apply_constraints(&self, constraints: &TrackConstraints) -> Result<()>;

    /// Pull the next frame from the track
    async fn grab_frame(&self) -> Result<Frame>;

    /// Release the underlying hardware. Idempotent.
    fn stop(&self);

    /// `false` once [`MediaTrack::stop`] has been called
    fn is_live(&self) -> bool;
}

/// Stream of tracks returned by [`MediaDevices::get_user_media`]
#[derive(Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    /// Wrap tracks into a stream with a fresh id
    pub fn new(tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tracks,
        }
    }

    /// Stream identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Video tracks in order
    pub fn video_tracks(&self) -> impl Iterator<Item = &Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .filter(|track| track.kind() == TrackKind::Video)
    }

    /// First video track, if any
    pub fn first_video_track(&self) -> Option<Arc<dyn MediaTrack>> {
        self.video_tracks().next().cloned()
    }

    /// Stop every track
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field(
                "tracks",
                &self.tracks.iter().map(|t| t.id()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Device inventory and stream acquisition
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// List every device the platform knows about
    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>>;

    /// Acquire a stream matching the constraints
    async fn get_user_media(&self, constraints: &StreamConstraints) -> Result<MediaStream>;
}
