use serde::Deserialize;

use super::scalars;

/// A network device (access point, switch, or gateway) adopted by or visible
/// to the controller.
///
/// Only the commonly consumed fields are modeled; the controller returns
/// hundreds more, which callers can access by decoding the raw payload
/// themselves.
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    /// Controller-internal identifier.
    #[serde(rename = "_id", default)]
    pub id: String,
    /// Hardware MAC address.
    pub mac: String,
    /// Device model code (e.g. "U7PG2").
    #[serde(default)]
    pub model: Option<String>,
    /// Device type tag: "uap", "usw", or "ugw".
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    /// Administrator-assigned name.
    #[serde(default)]
    pub name: Option<String>,
    /// Current IP address.
    #[serde(default)]
    pub ip: Option<String>,
    /// Firmware version string.
    #[serde(default)]
    pub version: Option<String>,
    /// Whether the device has been adopted by this controller.
    #[serde(default, deserialize_with = "scalars::bool_lenient_default")]
    pub adopted: bool,
    /// Seconds since the device last booted.
    #[serde(default, deserialize_with = "scalars::opt_u64_lenient")]
    pub uptime: Option<u64>,
    /// Provisioning state code.
    #[serde(default, deserialize_with = "scalars::opt_u64_lenient")]
    pub state: Option<u64>,
}

/// Payload for renaming a device via `rest/device/{id}`.
#[derive(Debug, serde::Serialize)]
pub struct DeviceName<'a> {
    /// The new administrator-assigned name.
    pub name: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_decodes_lenient_payload() {
        let body = r#"{
            "_id": "5c1",
            "mac": "aa:bb:cc:dd:ee:ff",
            "model": "U7PG2",
            "type": "uap",
            "adopted": "1",
            "uptime": "86400",
            "state": 1
        }"#;
        let device: Device = serde_json::from_str(body).unwrap();
        assert_eq!(device.id, "5c1");
        assert!(device.adopted);
        assert_eq!(device.uptime, Some(86_400));
        assert_eq!(device.device_type.as_deref(), Some("uap"));
        assert!(device.name.is_none());
    }
}
