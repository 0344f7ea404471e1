use serde::Deserialize;

use super::scalars;

/// An administrative site on the controller.
#[derive(Debug, Clone, Deserialize)]
pub struct Site {
    /// Controller-internal identifier.
    #[serde(rename = "_id", default)]
    pub id: String,
    /// URL-safe site name used in API paths (e.g. "default").
    pub name: String,
    /// Human-readable description shown in the UI.
    #[serde(default)]
    pub desc: Option<String>,
    /// Role of the authenticated user on this site.
    #[serde(default)]
    pub role: Option<String>,
    /// Number of unarchived alarms, when the controller reports it.
    #[serde(default, deserialize_with = "scalars::opt_u64_lenient")]
    pub num_new_alarms: Option<u64>,
}
