//! Step-wise zoom control of the active video track

use crate::model::{ZoomRange, ZoomState};
use crate::platform::{MediaTrack, TrackConstraints};

/// Zoom increment per button press
pub const ZOOM_STEP: f64 = 0.1;

/// Tracks the zoom range of the current stream and the requested level.
///
/// Levels are optimistic: the value shown is the last one requested, not a
/// confirmed reading from the device.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoomController {
    state: ZoomState,
}

impl ZoomController {
    /// Controller for a stream without zoom
    pub fn inert() -> Self {
        Self {
            state: ZoomState::inert(),
        }
    }

    /// Derive range and starting level from a freshly opened track
    pub fn for_track(track: &dyn MediaTrack) -> Self {
        let capabilities = track.capabilities();
        tracing::debug!(track = track.id(), ?capabilities, "Camera capabilities");

        let Some(zoom) = capabilities.zoom else {
            tracing::info!(track = track.id(), "Zoom capability not supported by this camera");
            return Self::inert();
        };

        let range = ZoomRange::up_to(zoom.max);
        let level = range.clamp(track.settings().zoom.unwrap_or(range.min));
        Self {
            state: ZoomState { range, level },
        }
    }

    /// Published zoom state
    pub fn state(&self) -> ZoomState {
        self.state
    }

    /// Current bounds
    pub fn range(&self) -> ZoomRange {
        self.state.range
    }

    /// Last requested level
    pub fn level(&self) -> f64 {
        self.state.level
    }

    /// Step towards the maximum. Returns the new level when one was requested.
    pub async fn zoom_in(&mut self, track: Option<&dyn MediaTrack>) -> Option<f64> {
        if !self.state.can_zoom_in() {
            return None;
        }
        let next = self.state.range.settle(self.state.level + ZOOM_STEP);
        self.apply(track?, next).await
    }

    /// Step towards 1.0. Returns the new level when one was requested.
    pub async fn zoom_out(&mut self, track: Option<&dyn MediaTrack>) -> Option<f64> {
        if !self.state.can_zoom_out() {
            return None;
        }
        let next = self.state.range.settle(self.state.level - ZOOM_STEP);
        self.apply(track?, next).await
    }

    async fn apply(&mut self, track: &dyn MediaTrack, level: f64) -> Option<f64> {
        if !track.is_live() {
            return None;
        }

        self.state.level = level;
        if let Err(err) = track.apply_constraints(&TrackConstraints::zoom(level)).await {
            tracing::warn!(track = track.id(), level, error = %err, "Zoom constraint not applied");
        }
        Some(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{
        MediaDevices, MediaStream, PlatformEvent, SimulatedCamera, SimulatedPlatform,
        StreamConstraints,
    };

    async fn open(camera: SimulatedCamera) -> (SimulatedPlatform, MediaStream) {
        let id = camera.device_id.clone();
        let platform = SimulatedPlatform::new().with_camera(camera);
        let stream = platform
            .get_user_media(&StreamConstraints {
                device_id: id,
                width: 1280,
                height: 720,
                audio: false,
            })
            .await
            .unwrap();
        (platform, stream)
    }

    #[tokio::test]
    async fn test_zoom_in_converges_to_max() {
        let (_, stream) = open(SimulatedCamera::new("a", "").with_zoom(1.0, 1.55, 0.1)).await;
        let track = stream.first_video_track().unwrap();
        let mut zoom = ZoomController::for_track(track.as_ref());
        assert_eq!(zoom.level(), 1.0);

        for _ in 0..20 {
            zoom.zoom_in(Some(track.as_ref())).await;
            assert!(zoom.level() <= 1.55);
        }
        assert_eq!(zoom.level(), 1.55);
        assert!(zoom.zoom_in(Some(track.as_ref())).await.is_none());
    }

    #[tokio::test]
    async fn test_zoom_out_converges_to_one() {
        let (_, stream) = open(
            SimulatedCamera::new("a", "")
                .with_zoom(1.0, 3.0, 0.1)
                .with_initial_zoom(1.35),
        )
        .await;
        let track = stream.first_video_track().unwrap();
        let mut zoom = ZoomController::for_track(track.as_ref());
        assert_eq!(zoom.level(), 1.35);

        let first = zoom.zoom_out(Some(track.as_ref())).await.unwrap();
        assert!((first - 1.25).abs() < 1e-9);
        for _ in 0..10 {
            zoom.zoom_out(Some(track.as_ref())).await;
            assert!(zoom.level() >= 1.0);
        }
        assert_eq!(zoom.level(), 1.0);
        assert!(!zoom.state().can_zoom_out());
    }

    #[tokio::test]
    async fn test_in_then_out_returns_to_exactly_one() {
        let (_, stream) = open(SimulatedCamera::new("a", "").with_zoom(1.0, 3.0, 0.1)).await;
        let track = stream.first_video_track().unwrap();
        let mut zoom = ZoomController::for_track(track.as_ref());

        zoom.zoom_in(Some(track.as_ref())).await;
        zoom.zoom_out(Some(track.as_ref())).await;
        assert_eq!(zoom.level(), 1.0);
        assert!(!zoom.state().can_zoom_out());
    }

    #[tokio::test]
    async fn test_constraint_reaches_track() {
        let (platform, stream) =
            open(SimulatedCamera::new("a", "").with_zoom(1.0, 3.0, 0.1)).await;
        let track = stream.first_video_track().unwrap();
        let mut zoom = ZoomController::for_track(track.as_ref());

        zoom.zoom_in(Some(track.as_ref())).await;
        let applied: Vec<_> = platform
            .events()
            .into_iter()
            .filter_map(|e| match e {
                PlatformEvent::ApplyZoom { zoom, .. } => Some(zoom),
                _ => None,
            })
            .collect();
        assert_eq!(applied.len(), 1);
        assert!((applied[0] - 1.1).abs() < 1e-9);
        assert!((track.settings().zoom.unwrap() - 1.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_constraint_keeps_optimistic_level() {
        let (platform, stream) =
            open(SimulatedCamera::new("a", "").with_zoom(1.0, 3.0, 0.1)).await;
        platform.reject_zoom(true);
        let track = stream.first_video_track().unwrap();
        let mut zoom = ZoomController::for_track(track.as_ref());

        let level = zoom.zoom_in(Some(track.as_ref())).await;
        assert!((level.unwrap() - 1.1).abs() < 1e-9);
        assert!((zoom.level() - 1.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unsupported_zoom_is_inert() {
        let (platform, stream) = open(SimulatedCamera::new("a", "")).await;
        let track = stream.first_video_track().unwrap();
        let mut zoom = ZoomController::for_track(track.as_ref());

        assert!(zoom.range().is_degenerate());
        assert!(zoom.zoom_in(Some(track.as_ref())).await.is_none());
        assert!(zoom.zoom_out(Some(track.as_ref())).await.is_none());
        assert_eq!(zoom.level(), 1.0);
        assert!(
            !platform
                .events()
                .iter()
                .any(|e| matches!(e, PlatformEvent::ApplyZoom { .. }))
        );
    }

    #[tokio::test]
    async fn test_no_track_is_noop() {
        let mut zoom = ZoomController {
            state: ZoomState {
                range: ZoomRange::up_to(2.0),
                level: 1.0,
            },
        };
        assert!(zoom.zoom_in(None).await.is_none());
        assert_eq!(zoom.level(), 1.0);
    }

    #[tokio::test]
    async fn test_reported_zoom_is_clamped() {
        let (_, stream) = open(
            SimulatedCamera::new("a", "")
                .with_zoom(0.5, 2.0, 0.1)
                .with_initial_zoom(0.5),
        )
        .await;
        let zoom = ZoomController::for_track(stream.first_video_track().unwrap().as_ref());
        assert_eq!(zoom.range().min, 1.0);
        assert_eq!(zoom.level(), 1.0);
    }

    #[tokio::test]
    async fn test_off_grid_level_steps_exactly() {
        let (_, stream) = open(
            SimulatedCamera::new("a", "")
                .with_zoom(1.0, 3.0, 0.1)
                .with_initial_zoom(1.23456789),
        )
        .await;
        let track = stream.first_video_track().unwrap();
        let mut zoom = ZoomController::for_track(track.as_ref());

        let level = zoom.zoom_in(Some(track.as_ref())).await.unwrap();
        assert_eq!(level, 1.23456789 + ZOOM_STEP);
        let level = zoom.zoom_out(Some(track.as_ref())).await.unwrap();
        assert_eq!(level, 1.23456789 + ZOOM_STEP - ZOOM_STEP);
    }
}
