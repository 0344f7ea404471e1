//! Device endpoints: listing, lookup, and manager commands.

use serde::Serialize;

use crate::api::normalize_mac;
use crate::client::UnifiClient;
use crate::error::Result;
use crate::models::device::{Device, DeviceName};

/// Command payload for the device manager endpoint.
#[derive(Debug, Serialize)]
struct DeviceCommand<'a> {
    cmd: &'a str,
    mac: &'a str,
}

impl UnifiClient {
    /// Lists all devices known to a site.
    pub async fn list_devices(&self, site: &str) -> Result<Vec<Device>> {
        self.get(self.site_path(site, "stat/device")).await
    }

    /// Fetches a single device by MAC address.
    ///
    /// Returns `None` when the controller reports no device under that MAC.
    /// The MAC is validated and normalized first; a malformed value fails
    /// with a `ValidationError` before any request is sent.
    pub async fn device_by_mac(&self, site: &str, mac: &str) -> Result<Option<Device>> {
        let mac = normalize_mac(mac)?;
        let mut devices: Vec<Device> = self
            .get(self.site_path(site, &format!("stat/device/{mac}")))
            .await?;
        Ok(if devices.is_empty() {
            None
        } else {
            Some(devices.swap_remove(0))
        })
    }

    /// Restarts a device.
    pub async fn restart_device(&self, site: &str, mac: &str) -> Result<()> {
        let mac = normalize_mac(mac)?;
        tracing::info!(%mac, site, "restarting device");
        let _: Vec<serde_json::Value> = self
            .post(
                self.site_path(site, "cmd/devmgr"),
                &DeviceCommand {
                    cmd: "restart",
                    mac: &mac,
                },
            )
            .await?;
        Ok(())
    }

    /// Sets a device's administrator-assigned name.
    ///
    /// Returns the updated device record as reported by the controller.
    pub async fn set_device_name(
        &self,
        site: &str,
        device_id: &str,
        name: &str,
    ) -> Result<Option<Device>> {
        let mut devices: Vec<Device> = self
            .put(
                self.site_path(site, &format!("rest/device/{device_id}")),
                &DeviceName { name },
            )
            .await?;
        Ok(if devices.is_empty() {
            None
        } else {
            Some(devices.swap_remove(0))
        })
    }
}
