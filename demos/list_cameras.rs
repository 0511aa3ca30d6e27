//! List V4L2 cameras and their zoom capability
//!
//! Usage: cargo run --example list_cameras

use camzoom::camera::{CameraConfig, list_devices};
use camzoom::platform::{DeviceKind, MediaDevices, StreamConstraints};
use camzoom::V4l2Devices;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = CameraConfig::default();
    let devices = list_devices(config.max_index)?;
    if devices.is_empty() {
        println!("No V4L2 cameras detected");
        return Ok(());
    }

    let platform = V4l2Devices::new(config);
    for (index, dev) in devices.iter().enumerate() {
        if dev.kind != DeviceKind::VideoInput {
            continue;
        }
        let label = if dev.label.is_empty() { "(no access)" } else { &dev.label };
        println!("[{}] {} ({})", index + 1, label, dev.device_id);

        let constraints = StreamConstraints {
            device_id: dev.device_id.clone(),
            width: 640,
            height: 480,
            audio: false,
        };
        match platform.get_user_media(&constraints).await {
            Ok(stream) => {
                if let Some(track) = stream.first_video_track() {
                    match track.capabilities().zoom {
                        Some(zoom) => println!(
                            "    zoom {:.2}x - {:.2}x (step {:.2}), now {:?}",
                            zoom.min,
                            zoom.max,
                            zoom.step,
                            track.settings().zoom
                        ),
                        None => println!("    no zoom control"),
                    }
                }
                stream.stop_all();
            }
            Err(e) => println!("    cannot open: {e}"),
        }
    }
    Ok(())
}
