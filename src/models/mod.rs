//! Controller Wire Types
//!
//! JSON shapes shared by every endpoint, plus the domain payload modules.
//! The controller wraps logical payloads in a `{ meta, data }` envelope;
//! authentication errors on newer firmwares use a flat `{ code, message }`
//! shape instead. Domain payloads use the lenient scalar decoders from
//! [`scalars`] because the controller serializes numbers and booleans
//! inconsistently across firmware versions.

pub mod alarm;
pub mod device;
pub mod scalars;
pub mod site;
pub mod station;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result marker the controller uses for success.
pub const RC_OK: &str = "ok";

/// The `meta` block of a controller response envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    /// Result code: `"ok"` on success, an error identifier otherwise.
    #[serde(default)]
    pub rc: Option<String>,
    /// Optional human-readable message, usually set on failures.
    #[serde(default)]
    pub msg: Option<String>,
    /// Optional item count on list endpoints.
    #[serde(default, deserialize_with = "scalars::opt_u64_lenient")]
    pub count: Option<u64>,
}

impl Meta {
    /// True when `rc` is present and not `"ok"`.
    pub fn is_error(&self) -> bool {
        matches!(self.rc.as_deref(), Some(rc) if rc != RC_OK)
    }
}

/// The standard `{ meta, data }` response envelope.
///
/// Single-item endpoints still wrap the item in `data[0]`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Response metadata.
    #[serde(default)]
    pub meta: Meta,
    /// Logical payload items.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// An envelope with undecoded payload items, used when only the metadata
/// matters (e.g. command endpoints).
pub type RawEnvelope = Envelope<Value>;

/// Flat error body used by authentication endpoints on newer firmwares.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthErrorBody {
    /// Machine-readable error code (e.g. `api.err.Invalid`).
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

/// Login response envelope: some firmwares add a flat `errors` list next to
/// `meta`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginEnvelope {
    /// Response metadata, absent on firmwares that omit the envelope.
    #[serde(default)]
    pub meta: Option<Meta>,
    /// Flat error list, non-empty on failure.
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

/// Credentials payload for the login endpoint.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    /// Account username.
    pub username: &'a str,
    /// Account password.
    pub password: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_decodes_standard_success() {
        let body = r#"{"meta":{"rc":"ok","count":"2"},"data":[{"x":1},{"x":2}]}"#;
        let envelope: RawEnvelope = serde_json::from_str(body).unwrap();
        assert!(!envelope.meta.is_error());
        assert_eq!(envelope.meta.count, Some(2));
        assert_eq!(envelope.data.len(), 2);
    }

    #[test]
    fn envelope_tolerates_missing_fields() {
        let envelope: RawEnvelope = serde_json::from_str("{}").unwrap();
        assert!(envelope.data.is_empty());
        assert!(!envelope.meta.is_error());
    }

    #[test]
    fn meta_error_detection() {
        let meta: Meta = serde_json::from_str(r#"{"rc":"error","msg":"no"}"#).unwrap();
        assert!(meta.is_error());

        let meta: Meta = serde_json::from_str(r#"{"rc":"ok"}"#).unwrap();
        assert!(!meta.is_error());
    }

    #[test]
    fn auth_error_body_decodes() {
        let body: AuthErrorBody =
            serde_json::from_str(r#"{"code":"api.err.Invalid","message":"Invalid credentials"}"#)
                .unwrap();
        assert_eq!(body.message.as_deref(), Some("Invalid credentials"));
    }
}
