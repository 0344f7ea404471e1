//! Lenient Scalar Decoders
//!
//! The controller serializes scalars inconsistently across firmware
//! versions: numbers arrive as numbers or quoted strings, booleans as
//! booleans, strings ("true"/"false"), or 0/1. These deserializer helpers
//! accept every observed shape. Use them with
//! `#[serde(deserialize_with = "...")]` on domain payload fields.

use serde::de::{self, Deserializer, Unexpected};
use serde::Deserialize;
use serde_json::Value;

/// Decodes a `u64` from a number or a quoted decimal string.
pub fn u64_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .ok_or_else(|| de::Error::custom(format!("number out of range for u64: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::invalid_value(Unexpected::Str(&s), &"a decimal integer")),
        other => Err(de::Error::custom(format!(
            "expected number or string, got {other}"
        ))),
    }
}

/// Decodes an optional `u64`; null and missing both yield `None`.
pub fn opt_u64_lenient<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("number out of range for u64: {n}"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::invalid_value(Unexpected::Str(&s), &"a decimal integer")),
        Some(other) => Err(de::Error::custom(format!(
            "expected number or string, got {other}"
        ))),
    }
}

/// Decodes an `i64` from a number or a quoted decimal string.
pub fn i64_lenient<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("number out of range for i64: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::invalid_value(Unexpected::Str(&s), &"a decimal integer")),
        other => Err(de::Error::custom(format!(
            "expected number or string, got {other}"
        ))),
    }
}

/// Decodes a `bool` from a boolean, a "true"/"false" string, or 0/1.
pub fn bool_lenient<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(de::Error::custom(format!("expected 0 or 1, got {n}"))),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(de::Error::invalid_value(
                Unexpected::Str(other),
                &"a boolean-like value",
            )),
        },
        other => Err(de::Error::custom(format!(
            "expected boolean, number, or string, got {other}"
        ))),
    }
}

/// Default-tolerant variant of [`bool_lenient`]: null/missing yields false.
pub fn bool_lenient_default<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(false),
        Some(value) => bool_lenient(value).map_err(de::Error::custom),
    }
}
