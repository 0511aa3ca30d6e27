//! Sweep the zoom range of a camera from 1.0x to its maximum and back
//!
//! Usage: cargo run --example zoom_sweep [-- --simulate]

use camzoom::platform::MediaDevices;
use camzoom::{CameraSession, Resolution, SimulatedPlatform};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let simulate = std::env::args().any(|arg| arg == "--simulate");
    let platform: Arc<dyn MediaDevices> = if simulate || !cfg!(feature = "camera") {
        Arc::new(SimulatedPlatform::demo())
    } else {
        v4l2_platform()
    };

    let mut session = CameraSession::mount(platform, Resolution::Hd).await;
    session.start().await?;

    let zoom = session.state().zoom;
    println!(
        "Zoom range {:.2}x - {:.2}x, starting at {:.2}x",
        zoom.range.min, zoom.range.max, zoom.level
    );
    if zoom.range.is_degenerate() {
        println!("Camera has no zoom control");
        session.shutdown();
        return Ok(());
    }

    while let Some(level) = session.zoom_in().await {
        println!("  in  -> {level:.2}x");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    while let Some(level) = session.zoom_out().await {
        println!("  out -> {level:.2}x");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    session.shutdown();
    Ok(())
}

#[cfg(feature = "camera")]
fn v4l2_platform() -> Arc<dyn MediaDevices> {
    Arc::new(camzoom::V4l2Devices::default())
}

#[cfg(not(feature = "camera"))]
fn v4l2_platform() -> Arc<dyn MediaDevices> {
    Arc::new(SimulatedPlatform::demo())
}
