//! Video input enumeration and device selection

use crate::error::{Error, Result};
use crate::model::Device;
use crate::platform::{DeviceKind, MediaDevices};
use std::sync::Arc;

/// Keeps the current list of cameras and the selected one.
pub struct DeviceLister {
    platform: Arc<dyn MediaDevices>,
    devices: Vec<Device>,
    selected: Option<String>,
}

impl DeviceLister {
    /// Lister with an empty list; call [`DeviceLister::refresh`] to populate.
    pub fn new(platform: Arc<dyn MediaDevices>) -> Self {
        Self {
            platform,
            devices: Vec::new(),
            selected: None,
        }
    }

    /// Query the platform once and replace the device list.
    ///
    /// Keeps the current selection when it is still listed, otherwise selects
    /// the first device. On failure the list is emptied and the error returned.
    pub async fn refresh(&mut self) -> Result<&[Device]> {
        let descriptors = match self.platform.enumerate_devices().await {
            Ok(descriptors) => descriptors,
            Err(err) => {
                tracing::warn!(error = %err, "Device enumeration failed");
                self.devices.clear();
                self.selected = None;
                return Err(err);
            }
        };

        self.devices = descriptors
            .into_iter()
            .filter(|d| d.kind == DeviceKind::VideoInput)
            .map(|d| Device {
                id: d.device_id,
                label: d.label,
            })
            .collect();

        let still_listed = self
            .selected
            .as_deref()
            .is_some_and(|id| self.find(id).is_some());
        if !still_listed {
            self.selected = self.devices.first().map(|d| d.id.clone());
        }

        tracing::info!(
            count = self.devices.len(),
            selected = ?self.selected,
            "Video inputs enumerated"
        );
        Ok(&self.devices)
    }

    /// Current device list in platform order
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Id of the selected device
    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selected device
    pub fn selected(&self) -> Option<&Device> {
        self.selected.as_deref().and_then(|id| self.find(id))
    }

    /// Select a listed device by id
    pub fn select(&mut self, id: &str) -> Result<&Device> {
        let index = self
            .devices
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::UnknownDevice(id.to_string()))?;
        self.selected = Some(id.to_string());
        Ok(&self.devices[index])
    }

    /// Look up a listed device by id
    pub fn find(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{SimulatedCamera, SimulatedPlatform};

    fn two_cameras() -> SimulatedPlatform {
        SimulatedPlatform::new()
            .with_camera(SimulatedCamera::new("a", ""))
            .with_audio_input("mic", "Headset")
            .with_camera(SimulatedCamera::new("b", "Front"))
    }

    #[tokio::test]
    async fn test_refresh_filters_and_selects_first() {
        let mut lister = DeviceLister::new(Arc::new(two_cameras()));
        let ids: Vec<_> = lister
            .refresh()
            .await
            .unwrap()
            .iter()
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(lister.selected_id(), Some("a"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_existing_selection() {
        let mut lister = DeviceLister::new(Arc::new(two_cameras()));
        lister.refresh().await.unwrap();
        lister.select("b").unwrap();
        lister.refresh().await.unwrap();
        assert_eq!(lister.selected_id(), Some("b"));
    }

    #[tokio::test]
    async fn test_refresh_moves_selection_off_removed_device() {
        let platform = two_cameras();
        let mut lister = DeviceLister::new(Arc::new(platform.clone()));
        lister.refresh().await.unwrap();
        lister.select("b").unwrap();

        platform.remove_camera("b");
        lister.refresh().await.unwrap();
        assert_eq!(lister.devices().len(), 1);
        assert_eq!(lister.selected_id(), Some("a"));
    }

    #[tokio::test]
    async fn test_refresh_failure_empties_list() {
        let platform = two_cameras();
        let mut lister = DeviceLister::new(Arc::new(platform.clone()));
        lister.refresh().await.unwrap();

        platform.deny_enumeration(true);
        assert!(matches!(
            lister.refresh().await,
            Err(Error::PermissionDenied(_))
        ));
        assert!(lister.devices().is_empty());
        assert!(lister.selected().is_none());

        platform.deny_enumeration(false);
        lister.refresh().await.unwrap();
        assert_eq!(lister.selected_id(), Some("a"));
    }

    #[tokio::test]
    async fn test_empty_inventory_selects_nothing() {
        let mut lister = DeviceLister::new(Arc::new(SimulatedPlatform::new()));
        assert!(lister.refresh().await.unwrap().is_empty());
        assert!(lister.selected_id().is_none());
    }

    #[tokio::test]
    async fn test_select_unknown_device() {
        let mut lister = DeviceLister::new(Arc::new(two_cameras()));
        lister.refresh().await.unwrap();
        assert!(matches!(lister.select("mic"), Err(Error::UnknownDevice(_))));
        assert_eq!(lister.selected_id(), Some("a"));
    }
}
