//! Station endpoints: listing and the station manager commands.

use serde::Serialize;

use crate::api::normalize_mac;
use crate::client::UnifiClient;
use crate::error::Result;
use crate::models::station::Station;

/// Command payload for the station manager endpoint.
#[derive(Debug, Serialize)]
struct StationCommand<'a> {
    cmd: &'a str,
    mac: &'a str,
}

impl UnifiClient {
    /// Lists the stations currently known to a site.
    pub async fn list_stations(&self, site: &str) -> Result<Vec<Station>> {
        self.get(self.site_path(site, "stat/sta")).await
    }

    /// Blocks a station from the network.
    pub async fn block_station(&self, site: &str, mac: &str) -> Result<()> {
        self.station_command(site, "block-sta", mac).await
    }

    /// Unblocks a previously blocked station.
    pub async fn unblock_station(&self, site: &str, mac: &str) -> Result<()> {
        self.station_command(site, "unblock-sta", mac).await
    }

    /// Kicks (disconnects) a station; it may reconnect immediately.
    pub async fn kick_station(&self, site: &str, mac: &str) -> Result<()> {
        self.station_command(site, "kick-sta", mac).await
    }

    async fn station_command(&self, site: &str, cmd: &str, mac: &str) -> Result<()> {
        let mac = normalize_mac(mac)?;
        tracing::info!(%mac, site, cmd, "station command");
        let _: Vec<serde_json::Value> = self
            .post(
                self.site_path(site, "cmd/stamgr"),
                &StationCommand { cmd, mac: &mac },
            )
            .await?;
        Ok(())
    }
}
