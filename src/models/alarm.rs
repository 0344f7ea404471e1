use serde::Deserialize;

use super::scalars;

/// An alarm raised by the controller for a site.
#[derive(Debug, Clone, Deserialize)]
pub struct Alarm {
    /// Controller-internal identifier.
    #[serde(rename = "_id", default)]
    pub id: String,
    /// Alarm key (e.g. "EVT_AP_Lost_Contact").
    #[serde(default)]
    pub key: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub msg: Option<String>,
    /// Site the alarm belongs to.
    #[serde(default)]
    pub site_id: Option<String>,
    /// Epoch milliseconds when the alarm fired.
    #[serde(default, deserialize_with = "scalars::opt_u64_lenient")]
    pub time: Option<u64>,
    /// True once an administrator archived the alarm.
    #[serde(default, deserialize_with = "scalars::bool_lenient_default")]
    pub archived: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_decodes_with_quoted_time() {
        let body = r#"{"_id":"a1","key":"EVT_AP_Lost_Contact","time":"1700000000000","archived":0}"#;
        let alarm: Alarm = serde_json::from_str(body).unwrap();
        assert_eq!(alarm.time, Some(1_700_000_000_000));
        assert!(!alarm.archived);
    }
}
