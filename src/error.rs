//! Error Types and Controller Response Classification
//!
//! This module defines the crate-wide error taxonomy for controller
//! interactions. Every failure surfaces either as a classifiable
//! [`ApiError`] (mapped from HTTP status and the controller's response
//! envelope) or as one of the transport/configuration variants of [`Error`].
//!
//! # Taxonomy
//! Controller-reported failures are folded into a flat [`ErrorKind`] set.
//! Identity against a kind is stable across versions: match on
//! [`Error::kind`] or use [`Error::is_kind`] rather than string-comparing
//! messages.
//!
//! # Classification
//! [`ApiError::classify`] implements the mapping table (first match wins):
//! - 401 → `AuthenticationFailed`
//! - 403 with `rc == "error_invalid_csrf_token"` → `InvalidCsrfToken`,
//!   otherwise `PermissionDenied`
//! - 404 → `NotFound`, 409 → `AlreadyExists`, 429 → `RateLimited`
//! - 500/502/503/504 → `ServerError`
//! - remaining `rc` in {"error", "error_invalid"} → `InvalidRequest`
//!
//! Validation failures (e.g. a malformed MAC address) are reported as
//! [`ValidationError`] and deliberately sit outside the taxonomy.

use std::fmt;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The `rc` value some firmwares return for a rejected CSRF token.
const RC_INVALID_CSRF: &str = "error_invalid_csrf_token";

/// Generic `rc` values the controller uses for malformed or rejected requests.
const RC_GENERIC_ERRORS: &[&str] = &["error", "error_invalid"];

/// Controller `msg` values mapped onto connection-state kinds.
///
/// These show up on device/station command endpoints (e.g. kicking a station
/// that already left). The status code alone does not distinguish them, so
/// the message is consulted after the status rules.
const MSG_NOT_CONNECTED: &str = "api.err.NotConnected";
const MSG_ALREADY_CONNECTED: &str = "api.err.AlreadyConnected";

/// Stable classification of controller failures.
///
/// Kinds are compared by identity; new kinds may be added but existing ones
/// never change meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The target device or station is not connected to the controller.
    NotConnected,
    /// The target is already in the requested connection state.
    AlreadyConnected,
    /// Credentials were rejected or the login flow failed.
    AuthenticationFailed,
    /// The session cookie is no longer accepted by the controller.
    SessionExpired,
    /// The CSRF token on a mutating request was rejected.
    InvalidCsrfToken,
    /// The requested resource does not exist.
    NotFound,
    /// The authenticated account lacks permission for the operation.
    PermissionDenied,
    /// The resource being created already exists.
    AlreadyExists,
    /// The controller rejected the request as malformed.
    InvalidRequest,
    /// The controller is shedding load (HTTP 429).
    RateLimited,
    /// The controller reported an internal failure (5xx).
    ServerError,
    /// The request did not complete within the configured timeout.
    Timeout,
    /// The client configuration is unusable.
    InvalidConfig,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotConnected => "not connected",
            Self::AlreadyConnected => "already connected",
            Self::AuthenticationFailed => "authentication failed",
            Self::SessionExpired => "session expired",
            Self::InvalidCsrfToken => "invalid CSRF token",
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::AlreadyExists => "already exists",
            Self::InvalidRequest => "invalid request",
            Self::RateLimited => "rate limited",
            Self::ServerError => "server error",
            Self::Timeout => "timeout",
            Self::InvalidConfig => "invalid configuration",
        };
        f.write_str(name)
    }
}

/// A classified failure reported by the controller.
///
/// Carries everything needed to decide how to react programmatically
/// (`kind`, `status_code`, `rc`) plus the human-readable message the server
/// supplied, verbatim when present.
#[derive(Debug, Clone, Error)]
#[error("{kind} on {endpoint}: {message} (HTTP {status_code})")]
pub struct ApiError {
    /// Taxonomy entry this failure maps to.
    pub kind: ErrorKind,
    /// HTTP status code of the failing response.
    pub status_code: u16,
    /// The controller's `meta.rc` (or error `code`) value, when present.
    pub rc: Option<String>,
    /// Human-readable message, from the server when available.
    pub message: String,
    /// The endpoint path the request was sent to.
    pub endpoint: String,
}

impl ApiError {
    /// Maps a controller response onto the error taxonomy.
    ///
    /// # Arguments
    /// * `status_code` - HTTP status of the response
    /// * `rc` - the envelope's `meta.rc` or auth-error `code`, if any
    /// * `message` - the most specific server-supplied message available
    /// * `endpoint` - request path, kept for diagnostics
    ///
    /// # Mapping
    /// First match wins; see the module documentation for the table. A
    /// response that matches no rule is classified from its status class:
    /// 4xx → `InvalidRequest`, anything else → `ServerError`.
    pub fn classify(
        status_code: u16,
        rc: Option<&str>,
        message: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        let kind = match status_code {
            401 => ErrorKind::AuthenticationFailed,
            403 if rc == Some(RC_INVALID_CSRF) => ErrorKind::InvalidCsrfToken,
            403 => ErrorKind::PermissionDenied,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::AlreadyExists,
            429 => ErrorKind::RateLimited,
            500 | 502 | 503 | 504 => ErrorKind::ServerError,
            _ => Self::classify_from_body(rc, status_code),
        };

        Self {
            kind,
            status_code,
            rc: rc.map(str::to_owned),
            message: message.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Classification fallback for statuses without a dedicated rule.
    fn classify_from_body(rc: Option<&str>, status_code: u16) -> ErrorKind {
        match rc {
            Some(MSG_NOT_CONNECTED) => ErrorKind::NotConnected,
            Some(MSG_ALREADY_CONNECTED) => ErrorKind::AlreadyConnected,
            Some(value) if RC_GENERIC_ERRORS.contains(&value) => ErrorKind::InvalidRequest,
            _ if (400..500).contains(&status_code) => ErrorKind::InvalidRequest,
            _ => ErrorKind::ServerError,
        }
    }

    /// True when this error matches the given taxonomy entry.
    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

/// A rejected input value, reported before any request is sent.
///
/// Not part of the controller taxonomy: validation failures are local and
/// carry the offending field name instead of a status code.
#[derive(Debug, Clone, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    /// Name of the input field that failed validation.
    pub field: String,
    /// Why the value was rejected.
    pub message: String,
}

impl ValidationError {
    /// Builds a validation error for a named field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All failures the client can surface.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A classified failure reported by the controller.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A locally rejected input value.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An I/O or protocol failure while talking to the controller.
    #[error("transport error on {endpoint}: {source}")]
    Transport {
        /// Endpoint the failing request targeted.
        endpoint: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// Every allowed attempt failed with a transport error.
    #[error("request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Total number of tries performed.
        attempts: u32,
        /// The error from the final attempt.
        #[source]
        source: Box<Error>,
    },

    /// The request body could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response body could not be decoded into the expected shape.
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        /// Endpoint whose response failed to parse.
        endpoint: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The WebSocket event stream failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A condition detected by the event stream layer itself.
    #[error("event stream: {0}")]
    EventStream(String),

    /// A concurrent session refresh completed without producing a valid
    /// session.
    #[error("session refresh failed")]
    RefreshFailed,

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns the taxonomy entry this error maps to, when it has one.
    ///
    /// Transport timeouts surface as [`ErrorKind::Timeout`]; other transport
    /// failures have no taxonomy entry and return `None`.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Api(err) => Some(err.kind),
            Self::Transport { source, .. } if source.is_timeout() => Some(ErrorKind::Timeout),
            Self::RetriesExhausted { source, .. } => source.kind(),
            Self::RefreshFailed => Some(ErrorKind::SessionExpired),
            Self::InvalidConfig(_) => Some(ErrorKind::InvalidConfig),
            _ => None,
        }
    }

    /// True when this error matches the given taxonomy entry.
    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == Some(kind)
    }

    /// Builds a transport error tagged with the endpoint it occurred on.
    pub(crate) fn transport(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Builds a decode error tagged with the endpoint it occurred on.
    pub(crate) fn decode(endpoint: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            source,
        }
    }
}
