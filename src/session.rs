//! The camera component: lister, stream and zoom controllers behind one handle
//!
//! A [`CameraSession`] is mounted once, mutated through `&mut self` methods
//! and publishes a [`SessionState`] snapshot after every change. Dropping the
//! session, or calling [`CameraSession::shutdown`], releases the camera.

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::lister::DeviceLister;
use crate::model::{Device, Resolution, StreamInfo, ZoomState};
use crate::platform::MediaDevices;
use crate::stream::StreamController;
use crate::view::{RenderedView, ViewModel};
use crate::zoom::ZoomController;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Everything the view renders from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    /// Listed video inputs
    pub devices: Vec<Device>,
    /// Selected device id
    pub selected_device: Option<String>,
    /// Selected capture resolution
    pub resolution: Resolution,
    /// Open stream, if any
    pub stream: Option<StreamInfo>,
    /// Zoom range and level
    pub zoom: ZoomState,
    /// Most recent failure, cleared by the next successful operation
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            selected_device: None,
            resolution: Resolution::default(),
            stream: None,
            zoom: ZoomState::inert(),
            last_error: None,
        }
    }
}

/// Camera picker with live preview and zoom
pub struct CameraSession {
    lister: DeviceLister,
    stream: StreamController,
    zoom: ZoomController,
    resolution: Resolution,
    last_error: Option<String>,
    publisher: watch::Sender<SessionState>,
}

impl CameraSession {
    /// Create the session and enumerate devices once.
    ///
    /// Enumeration failure is recorded in `last_error`; the session still mounts
    /// with an empty device list.
    pub async fn mount(platform: Arc<dyn MediaDevices>, resolution: Resolution) -> Self {
        let (publisher, _) = watch::channel(SessionState {
            resolution,
            ..SessionState::default()
        });

        let mut session = Self {
            lister: DeviceLister::new(Arc::clone(&platform)),
            stream: StreamController::new(platform),
            zoom: ZoomController::inert(),
            resolution,
            last_error: None,
            publisher,
        };

        if let Err(err) = session.refresh_devices().await {
            tracing::warn!(error = %err, "Mounted without cameras");
        }
        session
    }

    /// Subscribe to state snapshots
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.publisher.subscribe()
    }

    /// Current state snapshot
    pub fn state(&self) -> SessionState {
        SessionState {
            devices: self.lister.devices().to_vec(),
            selected_device: self.lister.selected_id().map(str::to_string),
            resolution: self.resolution,
            stream: self.stream.info().cloned(),
            zoom: self.zoom.state(),
            last_error: self.last_error.clone(),
        }
    }

    /// Render the current state
    pub fn render(&self) -> RenderedView {
        ViewModel::from_state(&self.state()).render()
    }

    /// Re-enumerate devices, replacing the list.
    ///
    /// A stream whose device is no longer listed, including after a failed
    /// enumeration, is closed.
    pub async fn refresh_devices(&mut self) -> Result<()> {
        let result = self.lister.refresh().await.map(|_| ());
        let orphaned = self
            .stream
            .info()
            .is_some_and(|info| self.lister.find(&info.device_id).is_none());
        if orphaned {
            tracing::warn!("Streaming device is no longer listed, closing stream");
            self.stream.close();
            self.zoom = ZoomController::inert();
        }
        self.settle(result)
    }

    /// Select a listed device by id
    pub fn select_device(&mut self, id: &str) -> Result<()> {
        let result = self.lister.select(id).map(|_| ());
        self.settle(result)
    }

    /// Select a listed device by 1-based position
    pub fn select_position(&mut self, position: usize) -> Result<()> {
        let id = position
            .checked_sub(1)
            .and_then(|index| self.lister.devices().get(index))
            .map(|device| device.id.clone())
            .ok_or_else(|| Error::UnknownDevice(format!("#{position}")));
        let result = id.and_then(|id| self.lister.select(&id).map(|_| ()));
        self.settle(result)
    }

    /// Change the resolution used by the next [`CameraSession::start`]
    pub fn select_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
        self.publish();
    }

    /// Open a stream for the selected device and resolution
    pub async fn start(&mut self) -> Result<()> {
        let Some(device) = self.lister.selected().cloned() else {
            return self.settle(Err(Error::NoDeviceSelected));
        };

        // A failed open has already closed the previous stream.
        let result = self.stream.open(&device, self.resolution).await;
        self.zoom = match &result {
            Ok(zoom) => *zoom,
            Err(_) => ZoomController::inert(),
        };
        self.settle(result.map(|_| ()))
    }

    /// Close the stream without tearing the session down
    pub fn stop(&mut self) {
        self.stream.close();
        self.zoom = ZoomController::inert();
        self.publish();
    }

    /// Step zoom towards the maximum; returns the new level if it changed
    pub async fn zoom_in(&mut self) -> Option<f64> {
        let level = self.zoom.zoom_in(self.stream.video_track()).await;
        if level.is_some() {
            self.publish();
        }
        level
    }

    /// Step zoom towards 1.0; returns the new level if it changed
    pub async fn zoom_out(&mut self) -> Option<f64> {
        let level = self.zoom.zoom_out(self.stream.video_track()).await;
        if level.is_some() {
            self.publish();
        }
        level
    }

    /// Grab a frame from the live video surface
    pub async fn grab_frame(&self) -> Result<Frame> {
        self.stream.surface().grab_frame().await
    }

    /// `true` while a stream is open
    pub fn is_streaming(&self) -> bool {
        self.stream.current().is_some()
    }

    /// Release the camera and end the session
    pub fn shutdown(mut self) {
        self.stop();
        tracing::info!("Camera session shut down");
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        self.last_error = result.as_ref().err().map(|err| err.to_string());
        self.publish();
        result
    }

    fn publish(&self) {
        let state = self.state();
        self.publisher.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stream.close();
    }
}
