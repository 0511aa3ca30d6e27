//! In-memory media platform with scripted cameras
//!
//! Each simulated camera is an exclusive resource: a second acquisition fails
//! with [`Error::DeviceBusy`] until every track of the first one is stopped.
//! All platform calls are recorded as [`PlatformEvent`]s in call order.

use super::{
    CapabilityRange, DeviceDescriptor, DeviceKind, MediaDevices, MediaStream, MediaTrack,
    StreamConstraints, TrackCapabilities, TrackConstraints, TrackKind, TrackSettings,
};
use crate::error::{Error, Result};
use crate::frame::{Frame, PixelFormat};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const DEFAULT_MODES: [(u32, u32); 3] = [(640, 480), (1280, 720), (1920, 1080)];

/// Scripted camera description
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    /// Device identifier
    pub device_id: String,
    /// Label reported by enumeration
    pub label: String,
    /// Capture modes the camera can deliver
    pub modes: Vec<(u32, u32)>,
    /// Zoom capability, if any
    pub zoom: Option<CapabilityRange>,
    /// Zoom value reported by fresh tracks
    pub initial_zoom: Option<f64>,
}

impl SimulatedCamera {
    /// Camera without zoom support and the default 480p/720p/1080p modes
    pub fn new(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
            modes: DEFAULT_MODES.to_vec(),
            zoom: None,
            initial_zoom: None,
        }
    }

    /// Advertise a zoom capability
    pub fn with_zoom(mut self, min: f64, max: f64, step: f64) -> Self {
        self.zoom = Some(CapabilityRange { min, max, step });
        self
    }

    /// Zoom value reported in track settings after opening
    pub fn with_initial_zoom(mut self, zoom: f64) -> Self {
        self.initial_zoom = Some(zoom);
        self
    }

    /// Replace the supported capture modes
    pub fn with_modes(mut self, modes: impl IntoIterator<Item = (u32, u32)>) -> Self {
        self.modes = modes.into_iter().collect();
        self
    }

    fn closest_mode(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        self.modes
            .iter()
            .copied()
            .min_by_key(|(w, h)| w.abs_diff(width) as u64 + h.abs_diff(height) as u64)
    }
}

/// Observable platform call
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// Device inventory was queried
    Enumerate,
    /// A stream was requested
    Open {
        /// Requested device
        device_id: String,
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },
    /// A live track was stopped
    Stop {
        /// Device the track belonged to
        device_id: String,
        /// Track identifier
        track_id: String,
    },
    /// A zoom constraint reached the device
    ApplyZoom {
        /// Device the track belongs to
        device_id: String,
        /// Requested value
        zoom: f64,
    },
}

#[derive(Default)]
struct Shared {
    cameras: Vec<SimulatedCamera>,
    other_devices: Vec<DeviceDescriptor>,
    events: Vec<PlatformEvent>,
    held: HashSet<String>,
    zoom_levels: HashMap<String, f64>,
    deny_enumeration: bool,
    deny_access: bool,
    reject_zoom: bool,
}

/// Cloneable handle to a simulated platform
#[derive(Clone, Default)]
pub struct SimulatedPlatform {
    shared: Arc<Mutex<Shared>>,
}

impl SimulatedPlatform {
    /// Empty platform with no devices
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform with two demo cameras, one of them zoom-capable
    pub fn demo() -> Self {
        Self::new()
            .with_camera(
                SimulatedCamera::new("sim-0", "Simulated Zoom Camera")
                    .with_zoom(1.0, 4.0, 0.1)
                    .with_initial_zoom(1.0)
                    .with_modes([(640, 480), (1280, 720), (1920, 1080), (3840, 2160)]),
            )
            .with_camera(SimulatedCamera::new("sim-1", ""))
    }

    /// Add a camera
    pub fn with_camera(self, camera: SimulatedCamera) -> Self {
        self.lock().cameras.push(camera);
        self
    }

    /// Add a microphone, which enumeration reports alongside cameras
    pub fn with_audio_input(self, device_id: &str, label: &str) -> Self {
        self.lock().other_devices.push(DeviceDescriptor {
            device_id: device_id.to_string(),
            label: label.to_string(),
            kind: DeviceKind::AudioInput,
        });
        self
    }

    /// Make enumeration fail with [`Error::PermissionDenied`]
    pub fn deny_enumeration(&self, deny: bool) {
        self.lock().deny_enumeration = deny;
    }

    /// Make stream acquisition fail with [`Error::PermissionDenied`]
    pub fn deny_access(&self, deny: bool) {
        self.lock().deny_access = deny;
    }

    /// Make zoom constraint application fail
    pub fn reject_zoom(&self, reject: bool) {
        self.lock().reject_zoom = reject;
    }

    /// Recorded events in call order
    pub fn events(&self) -> Vec<PlatformEvent> {
        self.lock().events.clone()
    }

    /// Unplug a camera; later enumerations no longer report it
    pub fn remove_camera(&self, device_id: &str) {
        self.lock()
            .cameras
            .retain(|camera| camera.device_id != device_id);
    }

    /// Whether a live track currently holds the device
    pub fn is_held(&self, device_id: &str) -> bool {
        self.lock().held.contains(device_id)
    }

    /// Number of devices currently held
    pub fn held_count(&self) -> usize {
        self.lock().held.len()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MediaDevices for SimulatedPlatform {
    async fn enumerate_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        let mut shared = self.lock();
        shared.events.push(PlatformEvent::Enumerate);

        if shared.deny_enumeration {
            return Err(Error::PermissionDenied(
                "device enumeration not permitted".to_string(),
            ));
        }

        let mut devices: Vec<DeviceDescriptor> = shared
            .cameras
            .iter()
            .map(|camera| DeviceDescriptor {
                device_id: camera.device_id.clone(),
                label: camera.label.clone(),
                kind: DeviceKind::VideoInput,
            })
            .collect();
        devices.extend(shared.other_devices.iter().cloned());
        Ok(devices)
    }

    async fn get_user_media(&self, constraints: &StreamConstraints) -> Result<MediaStream> {
        let mut shared = self.lock();
        shared.events.push(PlatformEvent::Open {
            device_id: constraints.device_id.clone(),
            width: constraints.width,
            height: constraints.height,
        });

        if shared.deny_access {
            return Err(Error::PermissionDenied(format!(
                "access to {} denied",
                constraints.device_id
            )));
        }
        if constraints.audio {
            return Err(Error::ConstraintUnsatisfiable(
                "simulated cameras have no audio".to_string(),
            ));
        }

        let camera = shared
            .cameras
            .iter()
            .find(|camera| camera.device_id == constraints.device_id)
            .cloned()
            .ok_or_else(|| Error::CameraNotFound(constraints.device_id.clone()))?;

        if shared.held.contains(&camera.device_id) {
            return Err(Error::DeviceBusy(camera.device_id));
        }

        let (width, height) = camera
            .closest_mode(constraints.width, constraints.height)
            .ok_or_else(|| {
                Error::ConstraintUnsatisfiable(format!(
                    "{} has no capture modes",
                    camera.device_id
                ))
            })?;

        shared.held.insert(camera.device_id.clone());
        // Like hardware controls, zoom survives closing and reopening the device.
        let zoom = shared
            .zoom_levels
            .get(&camera.device_id)
            .copied()
            .or(camera.initial_zoom);
        drop(shared);

        let track = SimulatedTrack {
            id: Uuid::new_v4().to_string(),
            width,
            height,
            zoom_capability: camera.zoom,
            zoom: Mutex::new(zoom),
            device_id: camera.device_id,
            live: AtomicBool::new(true),
            platform: self.clone(),
        };

        Ok(MediaStream::new(vec![Arc::new(track)]))
    }
}

struct SimulatedTrack {
    id: String,
    device_id: String,
    width: u32,
    height: u32,
    zoom_capability: Option<CapabilityRange>,
    zoom: Mutex<Option<f64>>,
    live: AtomicBool,
    platform: SimulatedPlatform,
}

impl SimulatedTrack {
    fn current_zoom(&self) -> Option<f64> {
        *self.zoom.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MediaTrack for SimulatedTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn capabilities(&self) -> TrackCapabilities {
        TrackCapabilities {
            zoom: self.zoom_capability,
        }
    }

    fn settings(&self) -> TrackSettings {
        TrackSettings {
            device_id: self.device_id.clone(),
            width: Some(self.width),
            height: Some(self.height),
            zoom: self.current_zoom(),
        }
    }

    async fn apply_constraints(&self, constraints: &TrackConstraints) -> Result<()> {
        if !self.is_live() {
            return Err(Error::Camera(format!("track {} has ended", self.id)));
        }
        let Some(requested) = constraints.requested_zoom() else {
            return Ok(());
        };
        let Some(range) = self.zoom_capability else {
            return Err(Error::ConstraintUnsatisfiable(format!(
                "{} does not support zoom",
                self.device_id
            )));
        };

        let mut shared = self.platform.lock();
        if shared.reject_zoom {
            return Err(Error::Camera("zoom control rejected".to_string()));
        }
        shared.events.push(PlatformEvent::ApplyZoom {
            device_id: self.device_id.clone(),
            zoom: requested,
        });
        let applied = requested.clamp(range.min, range.max);
        shared.zoom_levels.insert(self.device_id.clone(), applied);
        drop(shared);

        *self.zoom.lock().unwrap_or_else(PoisonError::into_inner) = Some(applied);
        Ok(())
    }

    async fn grab_frame(&self) -> Result<Frame> {
        if !self.is_live() {
            return Err(Error::FrameCapture(format!("track {} has ended", self.id)));
        }

        // Diagonal gradient whose brightness follows the zoom level.
        let zoom = self.current_zoom().unwrap_or(1.0);
        let shade = ((zoom * 40.0).min(255.0)) as u8;
        let (width, height) = (self.width as usize, self.height as usize);
        let mut data = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                data.push((x * 255 / width.max(1)) as u8);
                data.push((y * 255 / height.max(1)) as u8);
                data.push(shade);
            }
        }

        Ok(Frame {
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgb24,
            data: Bytes::from(data),
        })
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            let mut shared = self.platform.lock();
            shared.held.remove(&self.device_id);
            shared.events.push(PlatformEvent::Stop {
                device_id: self.device_id.clone(),
                track_id: self.id.clone(),
            });
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}
