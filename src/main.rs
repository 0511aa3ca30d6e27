//! camzoom interactive entrypoint

use camzoom::platform::{DeviceKind, MediaDevices};
use camzoom::{
    CameraSession, CamzoomConfig, Error, Resolution, Result, SessionState, SimulatedPlatform,
    ViewModel, logging,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "camzoom",
    version,
    about = "Pick a camera, preview it and control its zoom"
)]
struct Cli {
    /// Optional configuration file (toml/yaml). Defaults to camzoom.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Use simulated cameras instead of V4L2 devices
    #[arg(long)]
    simulate: bool,

    /// List detected cameras and exit
    #[arg(long)]
    list_cameras: bool,

    /// Preselect a camera by id or 1-based position
    #[arg(long, value_name = "ID|N")]
    device: Option<String>,

    /// Preselect a resolution (640x480, 1280x720, 1920x1080, 3840x2160)
    #[arg(long, value_name = "WxH")]
    resolution: Option<String>,

    /// Start the selected camera right away
    #[arg(long)]
    start: bool,

    /// Render the view as JSON instead of text
    #[arg(long)]
    json: bool,
}

/// One line of user input
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Help,
    List,
    Select(String),
    Resolution(Resolution),
    Start,
    Stop,
    ZoomIn,
    ZoomOut,
    Status,
    Snapshot(PathBuf),
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match (head.to_ascii_lowercase().as_str(), arg) {
            ("help" | "?", _) => Command::Help,
            ("list" | "refresh", _) => Command::List,
            ("select", Some(id)) => Command::Select(id.to_string()),
            ("res" | "resolution", Some(value)) => Command::Resolution(value.parse()?),
            ("start", _) => Command::Start,
            ("stop", _) => Command::Stop,
            ("in" | "+", _) => Command::ZoomIn,
            ("out" | "-", _) => Command::ZoomOut,
            ("status", _) => Command::Status,
            ("snapshot", Some(path)) => Command::Snapshot(PathBuf::from(path)),
            ("quit" | "exit" | "q", _) => Command::Quit,
            (other, _) => {
                return Err(Error::Other(format!(
                    "Unknown or incomplete command '{other}', try 'help'"
                )));
            }
        };
        Ok(Some(command))
    }
}

const HELP: &str = "\
Commands:
  list               re-enumerate cameras
  select <id|N>      choose a camera by id or list position
  res <WxH>          choose 640x480, 1280x720, 1920x1080 or 3840x2160
  start              open the selected camera
  stop               close the camera
  in | +             zoom in by 0.1
  out | -            zoom out by 0.1
  status             render the view again
  snapshot <path>    save the current frame (png/jpg)
  quit               close the camera and exit";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CamzoomConfig::load(cli.config.as_deref())?;
    if let Some(ref value) = cli.resolution {
        config.session.resolution = value.parse()?;
    }

    logging::init(&config.logging)?;

    let platform = media_platform(&cli, &config)?;

    if cli.list_cameras {
        return list_cameras(platform.as_ref()).await;
    }

    info!(simulate = cli.simulate, resolution = %config.session.resolution, "Starting camzoom");
    let mut session = CameraSession::mount(platform, config.session.resolution).await;

    if let Some(ref device) = cli.device {
        select(&mut session, device)?;
    }

    print_view(&session.state(), cli.json);
    let renderer = tokio::spawn(render_changes(session.subscribe(), cli.json));

    if cli.start {
        if let Err(err) = session.start().await {
            eprintln!("Failed to start camera: {err}");
        }
    }

    let result = command_loop(&mut session, cli.json).await;

    session.shutdown();
    renderer.abort();
    result
}

fn media_platform(cli: &Cli, config: &CamzoomConfig) -> Result<Arc<dyn MediaDevices>> {
    if cli.simulate {
        return Ok(Arc::new(SimulatedPlatform::demo()));
    }

    #[cfg(feature = "camera")]
    {
        Ok(Arc::new(camzoom::V4l2Devices::new(config.camera_config()?)))
    }

    #[cfg(not(feature = "camera"))]
    {
        let _ = config;
        Err(Error::Config(
            "built without the `camera` feature; run with --simulate".to_string(),
        ))
    }
}

async fn list_cameras(platform: &dyn MediaDevices) -> Result<()> {
    let cameras: Vec<_> = platform
        .enumerate_devices()
        .await?
        .into_iter()
        .filter(|d| d.kind == DeviceKind::VideoInput)
        .collect();

    if cameras.is_empty() {
        println!("No cameras detected");
    } else {
        println!("Discovered cameras:");
        for (index, dev) in cameras.iter().enumerate() {
            let label = if dev.label.is_empty() {
                format!("Camera {}", index + 1)
            } else {
                dev.label.clone()
            };
            println!("  [{}] {} ({})", index + 1, label, dev.device_id);
        }
    }
    Ok(())
}

fn select(session: &mut CameraSession, value: &str) -> Result<()> {
    match value.parse::<usize>() {
        Ok(position) if session.state().devices.iter().all(|d| d.id != value) => {
            session.select_position(position)
        }
        _ => session.select_device(value),
    }
}

async fn command_loop(session: &mut CameraSession, json: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type 'help' for commands.");

    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        // Nothing here ends the loop except `quit` and end of input.
        let outcome = match command {
            Command::Help => {
                println!("{HELP}");
                Ok(())
            }
            Command::List => session.refresh_devices().await,
            Command::Select(value) => select(session, &value),
            Command::Resolution(resolution) => {
                session.select_resolution(resolution);
                Ok(())
            }
            Command::Start => session.start().await,
            Command::Stop => {
                if session.is_streaming() {
                    session.stop();
                } else {
                    println!("Camera is not running");
                }
                Ok(())
            }
            Command::ZoomIn => {
                session.zoom_in().await;
                Ok(())
            }
            Command::ZoomOut => {
                session.zoom_out().await;
                Ok(())
            }
            Command::Status => {
                print_view(&session.state(), json);
                Ok(())
            }
            Command::Snapshot(path) => match session.grab_frame().await {
                Ok(frame) => frame.save(&path).map(|()| println!("Saved {}", path.display())),
                Err(err) => Err(err),
            },
            Command::Quit => break,
        };

        if let Err(err) = outcome {
            eprintln!("{err}");
        }
    }

    Ok(())
}

async fn render_changes(mut changes: watch::Receiver<SessionState>, json: bool) {
    while changes.changed().await.is_ok() {
        let state = changes.borrow_and_update().clone();
        print_view(&state, json);
    }
}

fn print_view(state: &SessionState, json: bool) {
    let rendered = ViewModel::from_state(state).render();
    if json {
        match serde_json::to_string_pretty(&rendered.json) {
            Ok(text) => println!("{text}"),
            Err(err) => eprintln!("Failed to render view: {err}"),
        }
    } else {
        for line in &rendered.human {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  ").unwrap(), None);
        assert_eq!(Command::parse("+").unwrap(), Some(Command::ZoomIn));
        assert_eq!(
            Command::parse("res 1280x720").unwrap(),
            Some(Command::Resolution(Resolution::Hd))
        );
        assert_eq!(
            Command::parse("select 2").unwrap(),
            Some(Command::Select("2".to_string()))
        );
        assert!(Command::parse("res 800x600").is_err());
        assert!(Command::parse("select").is_err());
        assert!(Command::parse("fly").is_err());
    }
}
