//! Capture stream lifecycle and the video surface it feeds

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::model::{Device, Resolution, StreamInfo};
use crate::platform::{MediaDevices, MediaStream, MediaTrack, StreamConstraints};
use crate::zoom::ZoomController;
use std::sync::Arc;

/// Stop every track of a stream. No-op for `None`.
pub fn close(stream: Option<&MediaStream>) {
    if let Some(stream) = stream {
        tracing::debug!(stream = stream.id(), "Stopping stream tracks");
        stream.stop_all();
    }
}

/// Where the active video track is displayed
#[derive(Default)]
pub struct VideoSurface {
    source: Option<Arc<dyn MediaTrack>>,
}

impl VideoSurface {
    /// Attach a track as the playback source
    pub fn bind(&mut self, track: Arc<dyn MediaTrack>) {
        self.source = Some(track);
    }

    /// Detach the current source
    pub fn unbind(&mut self) {
        self.source = None;
    }

    /// `true` while a live track is bound
    pub fn has_feed(&self) -> bool {
        self.source.as_ref().is_some_and(|track| track.is_live())
    }

    /// Bound track
    pub fn source(&self) -> Option<&dyn MediaTrack> {
        self.source.as_deref()
    }

    /// Pull the next frame from the bound track
    pub async fn grab_frame(&self) -> Result<Frame> {
        match &self.source {
            Some(track) => track.grab_frame().await,
            None => Err(Error::NoActiveStream),
        }
    }
}

/// Owns the single open capture stream.
pub struct StreamController {
    platform: Arc<dyn MediaDevices>,
    current: Option<MediaStream>,
    info: Option<StreamInfo>,
    surface: VideoSurface,
}

impl StreamController {
    /// Controller with no open stream
    pub fn new(platform: Arc<dyn MediaDevices>) -> Self {
        Self {
            platform,
            current: None,
            info: None,
            surface: VideoSurface::default(),
        }
    }

    /// Release the current stream, then acquire one for `device` at `resolution`.
    ///
    /// On success the first video track is bound to the surface and the zoom
    /// controller for it is returned. On failure nothing is left open.
    pub async fn open(
        &mut self,
        device: &Device,
        resolution: Resolution,
    ) -> Result<ZoomController> {
        self.close();

        let constraints = StreamConstraints {
            device_id: device.id.clone(),
            width: resolution.width(),
            height: resolution.height(),
            audio: false,
        };

        let stream = match self.platform.get_user_media(&constraints).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::error!(
                    device = %device.id,
                    %resolution,
                    error = %err,
                    "Error accessing the camera"
                );
                return Err(err);
            }
        };

        let Some(track) = stream.first_video_track() else {
            close(Some(&stream));
            let err = Error::Camera(format!("{} returned no video track", device.id));
            tracing::error!(device = %device.id, error = %err, "Error accessing the camera");
            return Err(err);
        };

        let settings = track.settings();
        let info = StreamInfo {
            stream_id: stream.id().to_string(),
            device_id: device.id.clone(),
            requested: resolution,
            width: settings.width.unwrap_or(resolution.width()),
            height: settings.height.unwrap_or(resolution.height()),
        };
        tracing::info!(
            stream = %info.stream_id,
            device = %info.device_id,
            width = info.width,
            height = info.height,
            "Stream opened"
        );

        let zoom = ZoomController::for_track(track.as_ref());
        self.surface.bind(track);
        self.current = Some(stream);
        self.info = Some(info);
        Ok(zoom)
    }

    /// Stop and drop the current stream, if any
    pub fn close(&mut self) {
        self.surface.unbind();
        self.info = None;
        if let Some(stream) = self.current.take() {
            close(Some(&stream));
            tracing::info!(stream = stream.id(), "Stream closed");
        }
    }

    /// The open stream
    pub fn current(&self) -> Option<&MediaStream> {
        self.current.as_ref()
    }

    /// Negotiated details of the open stream
    pub fn info(&self) -> Option<&StreamInfo> {
        self.info.as_ref()
    }

    /// Video track bound to the surface
    pub fn video_track(&self) -> Option<&dyn MediaTrack> {
        self.surface.source()
    }

    /// The video surface
    pub fn surface(&self) -> &VideoSurface {
        &self.surface
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PlatformEvent, SimulatedCamera, SimulatedPlatform};

    fn device(id: &str) -> Device {
        Device {
            id: id.to_string(),
            label: String::new(),
        }
    }

    fn platform() -> SimulatedPlatform {
        SimulatedPlatform::new()
            .with_camera(SimulatedCamera::new("a", "").with_zoom(1.0, 3.0, 0.1))
            .with_camera(SimulatedCamera::new("b", ""))
    }

    #[tokio::test]
    async fn test_open_binds_surface() {
        let platform = platform();
        let mut controller = StreamController::new(Arc::new(platform.clone()));
        let zoom = controller.open(&device("a"), Resolution::Hd).await.unwrap();

        assert!(controller.surface().has_feed());
        assert_eq!(zoom.range().max, 3.0);
        let info = controller.info().unwrap();
        assert_eq!((info.width, info.height), (1280, 720));
        assert_eq!(info.device_id, "a");
    }

    #[tokio::test]
    async fn test_reopen_same_device_succeeds() {
        let platform = platform();
        let mut controller = StreamController::new(Arc::new(platform.clone()));
        controller.open(&device("a"), Resolution::Hd).await.unwrap();
        let first = controller.current().unwrap().id().to_string();

        // The device is exclusive, so this only works if the first stream was released.
        controller.open(&device("a"), Resolution::Hd).await.unwrap();
        assert_ne!(controller.current().unwrap().id(), first);
        assert_eq!(platform.held_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_precedes_next_request() {
        let platform = platform();
        let mut controller = StreamController::new(Arc::new(platform.clone()));
        controller.open(&device("a"), Resolution::Hd).await.unwrap();
        controller.open(&device("b"), Resolution::Vga).await.unwrap();

        let events = platform.events();
        assert!(matches!(&events[0], PlatformEvent::Open { device_id, .. } if device_id == "a"));
        assert!(matches!(&events[1], PlatformEvent::Stop { device_id, .. } if device_id == "a"));
        assert!(matches!(&events[2], PlatformEvent::Open { device_id, .. } if device_id == "b"));
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_open_leaves_nothing_open() {
        let platform = platform();
        let mut controller = StreamController::new(Arc::new(platform.clone()));
        controller.open(&device("a"), Resolution::Hd).await.unwrap();

        platform.deny_access(true);
        let result = controller.open(&device("b"), Resolution::Hd).await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
        assert!(controller.current().is_none());
        assert!(!controller.surface().has_feed());
        assert_eq!(platform.held_count(), 0);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let platform = platform();
        let mut controller = StreamController::new(Arc::new(platform.clone()));
        controller.close();
        close(None);

        controller.open(&device("a"), Resolution::Hd).await.unwrap();
        controller.close();
        controller.close();
        assert!(matches!(
            controller.surface().grab_frame().await,
            Err(Error::NoActiveStream)
        ));
        assert!(!platform.is_held("a"));
    }
}
