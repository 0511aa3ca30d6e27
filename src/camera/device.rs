//! V4L2 capture track

use crate::camera::{CameraConfig, classify_io_error, from_fourcc, to_fourcc};
use crate::error::{Error, Result};
use crate::frame::{Frame, PixelFormat};
use crate::platform::{
    CapabilityRange, MediaTrack, StreamConstraints, TrackCapabilities, TrackConstraints,
    TrackKind, TrackSettings,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;
use v4l::buffer::Type;
use v4l::control::{Control, Value};
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

/// `V4L2_CID_CAMERA_CLASS_BASE + 13`
const V4L2_CID_ZOOM_ABSOLUTE: u32 = 0x009a_090d;

/// Open device resources. Field order makes the stream drop before the device.
struct CaptureInner {
    /// Memory-mapped V4L2 stream kept warm between captures
    stream: MmapStream<'static>,
    /// Owning handle to the V4L device
    device: Box<Device>,
}

/// Mapping between the raw `zoom_absolute` control and zoom factors
#[derive(Debug, Clone, Copy)]
struct ZoomControl {
    minimum: i64,
    maximum: i64,
    step: u64,
    unit: f64,
}

impl ZoomControl {
    fn capability(&self) -> CapabilityRange {
        CapabilityRange {
            min: self.to_factor(self.minimum),
            max: self.to_factor(self.maximum),
            step: self.step as f64 / self.unit,
        }
    }

    fn to_factor(&self, raw: i64) -> f64 {
        raw as f64 / self.unit
    }

    fn to_raw(&self, factor: f64) -> i64 {
        ((factor * self.unit).round() as i64).clamp(self.minimum, self.maximum)
    }
}

/// Video track backed by an open `/dev/videoN` node.
///
/// The device stays exclusively held until [`MediaTrack::stop`] drops it.
pub struct V4l2Track {
    id: String,
    device_id: String,
    format: PixelFormat,
    width: u32,
    height: u32,
    zoom: Option<ZoomControl>,
    zoom_raw: Mutex<Option<i64>>,
    inner: Mutex<Option<CaptureInner>>,
}

impl V4l2Track {
    /// Open the device named by the constraints and start streaming
    pub fn open(constraints: &StreamConstraints, config: &CameraConfig) -> Result<Self> {
        let path = constraints.device_id.as_str();
        tracing::info!(
            device = path,
            width = constraints.width,
            height = constraints.height,
            "Opening V4L2 device"
        );

        let dev = Device::with_path(path).map_err(|e| classify_io_error(path, "open", e))?;

        let caps = dev
            .query_caps()
            .map_err(|e| classify_io_error(path, "query caps of", e))?;
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE)
        {
            return Err(Error::ConstraintUnsatisfiable(format!(
                "{path} is not a video capture device"
            )));
        }

        let mut fmt = dev
            .format()
            .map_err(|e| classify_io_error(path, "get format of", e))?;
        fmt.width = constraints.width;
        fmt.height = constraints.height;
        fmt.fourcc = to_fourcc(config.format);

        // The driver answers with the closest mode it supports.
        let fmt = dev
            .set_format(&fmt)
            .map_err(|e| classify_io_error(path, "set format of", e))?;
        let format = from_fourcc(fmt.fourcc).ok_or_else(|| {
            Error::ConstraintUnsatisfiable(format!(
                "{path} substituted unsupported pixel format {}",
                String::from_utf8_lossy(&fmt.fourcc.repr)
            ))
        })?;

        let mut params = dev
            .params()
            .map_err(|e| classify_io_error(path, "get params of", e))?;
        params.interval = v4l::Fraction::new(1, config.fps.max(1));
        dev.set_params(&params)
            .map_err(|e| classify_io_error(path, "set params of", e))?;

        let zoom = query_zoom(&dev, config);
        let zoom_raw = zoom.and_then(|_| read_zoom(&dev));

        tracing::info!(
            device = path,
            width = fmt.width,
            height = fmt.height,
            fps = config.fps,
            format = format.as_str(),
            zoom = zoom.is_some(),
            "V4L2 device configured"
        );

        // Promote the device to a boxed handle so we can safely extend its lifetime for the stream.
        // SAFETY: The boxed device outlives the mmap stream and both are dropped together inside CaptureInner.
        let device = Box::new(dev);
        let static_device: &'static Device =
            unsafe { mem::transmute::<&Device, &'static Device>(device.as_ref()) };

        let stream =
            MmapStream::with_buffers(static_device, Type::VideoCapture, config.buffer_count.max(2))
                .map_err(|e| classify_io_error(path, "start stream on", e))?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            device_id: path.to_string(),
            format,
            width: fmt.width,
            height: fmt.height,
            zoom,
            zoom_raw: Mutex::new(zoom_raw),
            inner: Mutex::new(Some(CaptureInner { stream, device })),
        })
    }

    fn inner(&self) -> MutexGuard<'_, Option<CaptureInner>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn capture(&self) -> Result<Frame> {
        let mut guard = self.inner();
        let inner = guard
            .as_mut()
            .ok_or_else(|| Error::FrameCapture(format!("track {} has ended", self.id)))?;

        let (buf, meta) = inner
            .stream
            .next()
            .map_err(|e| Error::FrameCapture(format!("Failed to capture: {}", e)))?;

        let used = (meta.bytesused as usize).min(buf.len());
        let data = if used > 0 { &buf[..used] } else { buf };

        Ok(Frame {
            width: self.width,
            height: self.height,
            format: self.format,
            data: Bytes::copy_from_slice(data),
        })
    }

    fn set_zoom(&self, factor: f64) -> Result<()> {
        let control = self.zoom.ok_or_else(|| {
            Error::ConstraintUnsatisfiable(format!("{} does not support zoom", self.device_id))
        })?;
        let raw = control.to_raw(factor);

        let guard = self.inner();
        let inner = guard
            .as_ref()
            .ok_or_else(|| Error::Camera(format!("track {} has ended", self.id)))?;
        inner
            .device
            .set_control(Control {
                id: V4L2_CID_ZOOM_ABSOLUTE,
                value: Value::Integer(raw),
            })
            .map_err(|e| classify_io_error(&self.device_id, "set zoom on", e))?;
        drop(guard);

        *self.zoom_raw.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw);
        tracing::debug!(device = %self.device_id, factor, raw, "Zoom control applied");
        Ok(())
    }
}

fn query_zoom(dev: &Device, config: &CameraConfig) -> Option<ZoomControl> {
    let controls = match dev.query_controls() {
        Ok(controls) => controls,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to query controls");
            return None;
        }
    };

    let desc = controls
        .into_iter()
        .find(|desc| desc.id == V4L2_CID_ZOOM_ABSOLUTE)?;
    let unit = config
        .zoom_unit
        .filter(|unit| *unit > 0.0)
        .unwrap_or(if desc.minimum > 0 {
            desc.minimum as f64
        } else {
            1.0
        });

    Some(ZoomControl {
        minimum: desc.minimum,
        maximum: desc.maximum,
        step: desc.step,
        unit,
    })
}

fn read_zoom(dev: &Device) -> Option<i64> {
    match dev.control(V4L2_CID_ZOOM_ABSOLUTE) {
        Ok(Control {
            value: Value::Integer(raw),
            ..
        }) => Some(raw),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to read zoom control");
            None
        }
    }
}

#[async_trait]
impl MediaTrack for V4l2Track {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn capabilities(&self) -> TrackCapabilities {
        TrackCapabilities {
            zoom: self.zoom.map(|control| control.capability()),
        }
    }

    fn settings(&self) -> TrackSettings {
        let raw = *self.zoom_raw.lock().unwrap_or_else(PoisonError::into_inner);
        TrackSettings {
            device_id: self.device_id.clone(),
            width: Some(self.width),
            height: Some(self.height),
            zoom: self
                .zoom
                .zip(raw)
                .map(|(control, raw)| control.to_factor(raw)),
        }
    }

    async fn apply_constraints(&self, constraints: &TrackConstraints) -> Result<()> {
        match constraints.requested_zoom() {
            Some(factor) => self.set_zoom(factor),
            None => Ok(()),
        }
    }

    async fn grab_frame(&self) -> Result<Frame> {
        self.capture()
    }

    fn stop(&self) {
        if self.inner().take().is_some() {
            tracing::info!(device = %self.device_id, track = %self.id, "Released V4L2 device");
        }
    }

    fn is_live(&self) -> bool {
        self.inner().is_some()
    }
}

impl Drop for V4l2Track {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_control_mapping() {
        let control = ZoomControl {
            minimum: 100,
            maximum: 500,
            step: 10,
            unit: 100.0,
        };
        let cap = control.capability();
        assert_eq!(cap.min, 1.0);
        assert_eq!(cap.max, 5.0);
        assert_eq!(cap.step, 0.1);
        assert_eq!(control.to_raw(1.3), 130);
        assert_eq!(control.to_raw(9.0), 500);
        assert_eq!(control.to_raw(0.5), 100);
    }

    #[tokio::test]
    async fn test_track_open() {
        // This test will only work if a camera is available
        let constraints = StreamConstraints {
            device_id: "/dev/video0".to_string(),
            width: 1280,
            height: 720,
            audio: false,
        };
        match V4l2Track::open(&constraints, &CameraConfig::default()) {
            Ok(track) => {
                println!("Opened camera: {:?}", track.settings());
                track.stop();
                assert!(!track.is_live());
            }
            Err(e) => {
                println!("No camera available (expected on CI): {}", e);
            }
        }
    }
}
