//! Domain Service Facades
//!
//! Typed endpoint methods layered on the core client, one file per domain:
//! - [`sites`]: administrative sites
//! - [`devices`]: adopted network devices (APs, switches, gateways)
//! - [`stations`]: client stations and connection management commands
//! - [`alarms`]: controller alarms
//!
//! Every method follows the same shape: validate inputs locally, ensure an
//! authenticated session, send through the retry wrapper, and unwrap the
//! `{ meta, data }` envelope. All of them are implemented as inherent
//! methods on [`UnifiClient`](crate::client::UnifiClient).

pub mod alarms;
pub mod devices;
pub mod sites;
pub mod stations;

use crate::error::ValidationError;

/// Validates and normalizes a MAC address to lowercase colon-separated form.
///
/// Accepts colon, hyphen, and dot separators as well as bare hex; anything
/// that does not contain exactly twelve hex digits is rejected.
///
/// # Errors
/// Returns a [`ValidationError`] naming the `mac` field.
pub fn normalize_mac(mac: &str) -> Result<String, ValidationError> {
    let digits: String = mac
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .collect();

    if digits.len() != 12 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::new(
            "mac",
            format!("'{mac}' is not a valid MAC address"),
        ));
    }

    let lower = digits.to_ascii_lowercase();
    let pairs: Vec<&str> = (0..6).map(|i| &lower[i * 2..i * 2 + 2]).collect();
    Ok(pairs.join(":"))
}
