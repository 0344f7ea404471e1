//! Alarm endpoints.

use serde::Serialize;

use crate::client::UnifiClient;
use crate::error::Result;
use crate::models::alarm::Alarm;

/// Command payload for the event manager endpoint.
#[derive(Debug, Serialize)]
struct EventCommand<'a> {
    cmd: &'a str,
}

impl UnifiClient {
    /// Lists a site's alarms, newest first as returned by the controller.
    pub async fn list_alarms(&self, site: &str) -> Result<Vec<Alarm>> {
        self.get(self.site_path(site, "rest/alarm")).await
    }

    /// Archives every active alarm of a site.
    pub async fn archive_all_alarms(&self, site: &str) -> Result<()> {
        tracing::info!(site, "archiving all alarms");
        let _: Vec<serde_json::Value> = self
            .post(
                self.site_path(site, "cmd/evtmgr"),
                &EventCommand {
                    cmd: "archive-all-alarms",
                },
            )
            .await?;
        Ok(())
    }
}
