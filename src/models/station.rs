use serde::Deserialize;

use super::scalars;

/// A client station (wired or wireless) known to a site.
#[derive(Debug, Clone, Deserialize)]
pub struct Station {
    /// Controller-internal identifier.
    #[serde(rename = "_id", default)]
    pub id: String,
    /// Station MAC address.
    pub mac: String,
    /// Hostname reported by the station, if any.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Administrator-assigned alias.
    #[serde(default)]
    pub name: Option<String>,
    /// Current IP address.
    #[serde(default)]
    pub ip: Option<String>,
    /// MAC of the access point or switch the station is attached to.
    #[serde(default)]
    pub ap_mac: Option<String>,
    /// True for wired stations.
    #[serde(default, deserialize_with = "scalars::bool_lenient_default")]
    pub is_wired: bool,
    /// True when the station is currently blocked.
    #[serde(default, deserialize_with = "scalars::bool_lenient_default")]
    pub blocked: bool,
    /// Received signal strength for wireless stations.
    #[serde(default)]
    pub rssi: Option<i64>,
    /// Seconds the station has been associated.
    #[serde(default, deserialize_with = "scalars::opt_u64_lenient")]
    pub uptime: Option<u64>,
}
