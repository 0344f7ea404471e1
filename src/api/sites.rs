//! Site endpoints.

use crate::client::UnifiClient;
use crate::error::Result;
use crate::models::site::Site;

impl UnifiClient {
    /// Lists the sites visible to the authenticated account.
    pub async fn list_sites(&self) -> Result<Vec<Site>> {
        self.get("/api/self/sites").await
    }
}
