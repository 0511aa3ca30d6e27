//! camzoom - Linux-first camera picker with live preview and zoom controls
//!
//! Pick a connected camera, choose a capture resolution, preview the live feed
//! and step its zoom up and down.
//!
//! # Features
//!
//! - **Camera Integration**: Direct V4L2 access, zoom through `zoom_absolute`
//! - **Single Owner**: At most one stream holds the camera at any time
//! - **Reactive View**: State snapshots published over a `watch` channel
//! - **Simulator**: In-memory platform for tests and demos
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use camzoom::{CameraSession, Resolution, SimulatedPlatform};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let platform = Arc::new(SimulatedPlatform::demo());
//!     let mut session = CameraSession::mount(platform, Resolution::Hd).await;
//!
//!     session.start().await?;
//!     session.zoom_in().await;
//!
//!     for line in session.render().human {
//!         println!("{line}");
//!     }
//!     session.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod frame;
pub mod lister;
pub mod logging;
pub mod model;
pub mod platform;
pub mod session;
pub mod stream;
pub mod view;
pub mod zoom;

#[cfg(feature = "camera")]
#[cfg_attr(docsrs, doc(cfg(feature = "camera")))]
pub mod camera;

// Re-exports for convenience
pub use error::{Error, Result};

#[cfg(feature = "camera")]
pub use camera::{CameraConfig, V4l2Devices};

pub use config::{CameraOptions, CamzoomConfig, LogRotation, LoggingOptions, SessionOptions};
pub use frame::{Frame, PixelFormat};
pub use model::{Device, Resolution, StreamInfo, ZoomRange, ZoomState};
pub use platform::{MediaDevices, MediaStream, MediaTrack, SimulatedCamera, SimulatedPlatform};
pub use session::{CameraSession, SessionState};
pub use view::{RenderedView, ViewModel};
pub use zoom::{ZOOM_STEP, ZoomController};
