//! CSRF Token Holder
//!
//! The controller requires an `X-CSRF-Token` header on every mutating
//! request and rotates the token opportunistically: a fresh value can arrive
//! on any response, either in the `X-CSRF-Token` header or (on some
//! firmwares) in a `csrf_token` cookie. This module provides the shared cell
//! those updates flow through.
//!
//! # Concurrency
//! The holder is read on every outgoing request and written only on login
//! and token rotation, so a read-mostly lock is sufficient. Reads and writes
//! may interleave freely; the last writer wins and no compare-and-swap is
//! needed. The empty string denotes "no token known".

use std::sync::RwLock;

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Response header carrying the current CSRF token.
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

/// Cookie names the token may arrive under, in fallback order.
///
/// The `X-CSRF-Token` cookie variant is only seen on some firmwares; its use
/// is logged so the path can be retired if it never fires in the field.
const CSRF_COOKIE_NAMES: &[&str] = &["csrf_token", "X-CSRF-Token"];

/// Atomically published CSRF token shared by the transport, the auth
/// manager, and the event stream.
#[derive(Debug, Default)]
pub struct CsrfToken {
    inner: RwLock<Option<String>>,
}

impl CsrfToken {
    /// Creates an empty holder (no token known).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current token, or the empty string if none is known.
    pub fn get(&self) -> String {
        self.inner
            .read()
            .expect("CSRF lock poisoned")
            .clone()
            .unwrap_or_default()
    }

    /// Publishes a new token. An empty value clears the holder.
    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        let mut guard = self.inner.write().expect("CSRF lock poisoned");
        *guard = if token.is_empty() { None } else { Some(token) };
    }

    /// Clears the token (used on logout).
    pub fn clear(&self) {
        self.inner.write().expect("CSRF lock poisoned").take();
    }

    /// Harvests a rotated token from a response.
    ///
    /// Prefers the `X-CSRF-Token` header; otherwise inspects `Set-Cookie`
    /// values for the known cookie names and uses the first value found.
    /// Does nothing when the response carries neither.
    pub fn update_from_response(&self, headers: &HeaderMap) {
        if let Some(token) = headers
            .get(CSRF_HEADER_NAME)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
        {
            tracing::trace!("CSRF token rotated via response header");
            self.set(token);
            return;
        }

        if let Some(token) = extract_csrf_cookie(headers) {
            // Cookie-delivered tokens are the exception; keep a trace of it.
            tracing::debug!("CSRF token harvested from Set-Cookie fallback");
            self.set(token);
        }
    }
}

/// Scans `Set-Cookie` headers for a CSRF cookie value.
///
/// Only the leading `name=value` pair of each cookie is considered;
/// attributes (Path, Expires, ...) are ignored.
fn extract_csrf_cookie(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(SET_COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        let pair = raw.split(';').next().unwrap_or("");
        let Some((name, token)) = pair.split_once('=') else {
            continue;
        };
        if CSRF_COOKIE_NAMES.contains(&name.trim()) && !token.trim().is_empty() {
            return Some(token.trim().to_string());
        }
    }
    None
}
