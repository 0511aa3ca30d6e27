//! Presentation of the session state: selectors, video surface and zoom buttons

use crate::model::Resolution;
use crate::session::SessionState;
use serde::Serialize;
use serde_json::Value;

/// One entry of a selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    /// Value submitted when chosen
    pub value: String,
    /// Text shown to the user
    pub label: String,
    /// Whether this is the current value
    pub selected: bool,
}

/// A clickable control
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    /// Caption
    pub label: &'static str,
    /// Whether clicks are accepted
    pub enabled: bool,
}

/// Video surface status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoView {
    /// Stream bound to the surface
    pub stream_id: Option<String>,
    /// Delivered frame width
    pub width: Option<u32>,
    /// Delivered frame height
    pub height: Option<u32>,
}

/// Everything on screen, derived purely from a [`SessionState`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    /// Camera selector
    pub devices: Vec<SelectOption>,
    /// Resolution selector
    pub resolutions: Vec<SelectOption>,
    /// Start trigger
    pub start: Button,
    /// Live video
    pub video: VideoView,
    /// Zoom-out button
    pub zoom_out: Button,
    /// Zoom-in button
    pub zoom_in: Button,
    /// Current zoom level
    pub zoom_level: f64,
    /// Maximum zoom of the current stream
    pub zoom_max: f64,
    /// Most recent failure
    pub error: Option<String>,
}

/// Combined structured and human-readable representation of the view
#[derive(Debug, Clone)]
pub struct RenderedView {
    /// Structured JSON representation
    pub json: Value,
    /// Lines for terminal presentation
    pub human: Vec<String>,
}

impl ViewModel {
    /// Build the view for a state snapshot
    pub fn from_state(state: &SessionState) -> Self {
        let selected = state.selected_device.as_deref();
        let devices = state
            .devices
            .iter()
            .enumerate()
            .map(|(position, device)| SelectOption {
                value: device.id.clone(),
                label: device.display_label(position),
                selected: Some(device.id.as_str()) == selected,
            })
            .collect();

        let resolutions = Resolution::ALL
            .iter()
            .map(|res| SelectOption {
                value: res.to_string(),
                label: res.to_string(),
                selected: *res == state.resolution,
            })
            .collect();

        let video = match &state.stream {
            Some(info) => VideoView {
                stream_id: Some(info.stream_id.clone()),
                width: Some(info.width),
                height: Some(info.height),
            },
            None => VideoView {
                stream_id: None,
                width: None,
                height: None,
            },
        };

        Self {
            devices,
            resolutions,
            start: Button {
                label: "Start Camera",
                enabled: selected.is_some(),
            },
            video,
            zoom_out: Button {
                label: "Zoom Out",
                enabled: state.zoom.can_zoom_out(),
            },
            zoom_in: Button {
                label: "Zoom In",
                enabled: state.zoom.can_zoom_in(),
            },
            zoom_level: state.zoom.level,
            zoom_max: state.zoom.range.max,
            error: state.last_error.clone(),
        }
    }

    /// Render to JSON and terminal lines
    pub fn render(&self) -> RenderedView {
        let json = serde_json::to_value(self).unwrap_or(Value::Null);
        let mut human = Vec::new();

        human.push("Camera Zoom".to_string());
        if self.devices.is_empty() {
            human.push("  Camera: (none found)".to_string());
        } else {
            human.push("  Camera:".to_string());
            for (index, option) in self.devices.iter().enumerate() {
                human.push(format!(
                    "    {} [{}] {} ({})",
                    marker(option.selected),
                    index + 1,
                    option.label,
                    option.value
                ));
            }
        }

        let resolutions: Vec<String> = self
            .resolutions
            .iter()
            .map(|option| {
                if option.selected {
                    format!("[{}]", option.label)
                } else {
                    option.label.clone()
                }
            })
            .collect();
        human.push(format!("  Resolution: {}", resolutions.join(" ")));
        human.push(format!("  {}", button(&self.start)));

        match (&self.video.stream_id, self.video.width, self.video.height) {
            (Some(id), Some(width), Some(height)) => {
                human.push(format!("  Video: live {width}x{height} (stream {id})"))
            }
            _ => human.push("  Video: no video".to_string()),
        }

        human.push(format!(
            "  {}  {:.2}x / {:.2}x  {}",
            button(&self.zoom_out),
            self.zoom_level,
            self.zoom_max,
            button(&self.zoom_in)
        ));

        if let Some(error) = &self.error {
            human.push(format!("  Error: {error}"));
        }

        RenderedView { json, human }
    }
}

fn marker(selected: bool) -> char {
    if selected { '*' } else { ' ' }
}

fn button(button: &Button) -> String {
    if button.enabled {
        format!("<{}>", button.label)
    } else {
        format!("<{} (disabled)>", button.label)
    }
}
