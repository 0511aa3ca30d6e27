//! camzoom runtime configuration handling

#[cfg(feature = "camera")]
use crate::camera::CameraConfig;
use crate::error::{Error, Result};
#[cfg(feature = "camera")]
use crate::frame::PixelFormat;
use crate::model::Resolution;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure read from disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CamzoomConfig {
    /// V4L2 backend overrides
    pub camera: CameraOptions,
    /// Session defaults
    pub session: SessionOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl CamzoomConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No camzoom.toml / camzoom.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["camzoom.toml", "camzoom.yaml", "camzoom.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("camzoom");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    fn apply_env_overrides(&mut self) {
        self.camera.apply_env_overrides();
        self.session.apply_env_overrides();
        self.logging.apply_env_overrides();
    }

    /// Produce a fully resolved V4L2 backend configuration.
    #[cfg(feature = "camera")]
    pub fn camera_config(&self) -> Result<CameraConfig> {
        self.camera.to_camera_config()
    }
}

/// V4L2 overrides merged on top of `CameraConfig::default()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraOptions {
    /// Highest `/dev/videoN` index probed
    pub max_index: Option<usize>,
    /// Frames per second
    pub fps: Option<u32>,
    /// Pixel format string (mjpeg/yuyv/rgb24)
    pub format: Option<String>,
    /// Number of V4L2 buffers to allocate
    pub buffer_count: Option<u32>,
    /// Raw zoom control units per 1.0x
    pub zoom_unit: Option<f64>,
}

impl CameraOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(index) = env::var("CAMZOOM_CAMERA_MAX_INDEX") {
            self.max_index = index.parse::<usize>().ok();
        }
        if let Ok(fps) = env::var("CAMZOOM_CAMERA_FPS") {
            self.fps = fps.parse::<u32>().ok();
        }
        if let Ok(format) = env::var("CAMZOOM_CAMERA_FORMAT") {
            self.format = Some(format);
        }
        if let Ok(buffers) = env::var("CAMZOOM_CAMERA_BUFFERS") {
            self.buffer_count = buffers.parse::<u32>().ok();
        }
        if let Ok(unit) = env::var("CAMZOOM_CAMERA_ZOOM_UNIT") {
            self.zoom_unit = unit.parse::<f64>().ok();
        }
    }

    /// Merge overrides onto the default backend configuration.
    #[cfg(feature = "camera")]
    pub fn to_camera_config(&self) -> Result<CameraConfig> {
        let mut config = CameraConfig::default();

        if let Some(max_index) = self.max_index {
            config.max_index = max_index;
        }

        if let Some(fps) = self.fps {
            config.fps = fps.max(1);
        }

        if let Some(format) = &self.format {
            config.format = format.parse::<PixelFormat>()?;
        }

        if let Some(buffers) = self.buffer_count {
            config.buffer_count = buffers.max(2);
        }

        if let Some(unit) = self.zoom_unit {
            if !(unit.is_finite() && unit > 0.0) {
                return Err(Error::Config(format!(
                    "zoom_unit must be a positive number, got {unit}"
                )));
            }
            config.zoom_unit = Some(unit);
        }

        Ok(config)
    }
}

/// Defaults applied when the session mounts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Resolution preselected in the view
    pub resolution: Resolution,
}

impl SessionOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(resolution) = env::var("CAMZOOM_RESOLUTION") {
            match resolution.parse::<Resolution>() {
                Ok(parsed) => self.resolution = parsed,
                Err(e) => tracing::warn!("Ignoring CAMZOOM_RESOLUTION: {e}"),
            }
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `CAMZOOM_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// ANSI colors on the console
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("CAMZOOM_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("CAMZOOM_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Ok(color) = env::var("CAMZOOM_LOG_COLOR") {
            match color.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" => self.color = false,
                "1" | "true" | "on" => self.color = true,
                _ => {}
            }
        }
        if let Ok(rotation) = env::var("CAMZOOM_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::parse(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}
