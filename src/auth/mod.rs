//! Authentication and Session Lifecycle
//!
//! This module owns everything stateful about being logged in:
//! - [`csrf`]: the shared CSRF token cell
//! - [`session`]: the immutable session snapshot and its validity predicates
//! - [`AuthManager`]: login, logout, and the single-flight refresh that
//!   keeps many concurrent callers from stampeding the login endpoint
//!
//! # Single-flight refresh
//! `ensure_authenticated` guarantees that at most one login is in flight at
//! a time. The first caller to find the session missing or near expiry
//! becomes the refresher; it publishes a completion channel, runs the login
//! without holding any lock, and wakes every waiter when done, on every
//! exit path, including panic and future drop, via a drop guard. Waiters
//! park on the channel and re-read the session once it closes: a valid
//! session means the refresh succeeded, anything else is reported as a
//! failed refresh. Dropping a waiter's future never disturbs the refresh.

pub mod csrf;
pub mod session;

use std::sync::{Arc, Mutex, RwLock};

use chrono::{Duration, Utc};
use reqwest::StatusCode;
use tokio::sync::watch;

use crate::config::RetryPolicy;
use crate::error::{ApiError, Error, ErrorKind, Result};
use crate::models::{AuthErrorBody, LoginEnvelope, LoginRequest};
use crate::transport::{retry, ApiRequest, Transport};

use self::csrf::{CsrfToken, CSRF_HEADER_NAME};
use self::session::{Session, COOKIE_SESSION_ID};

/// Login endpoint path.
pub const LOGIN_PATH: &str = "/api/auth/login";

/// Logout endpoint path.
pub const LOGOUT_PATH: &str = "/api/logout";

/// Session lifetime assumed when the controller does not report one.
///
/// The controller's login response carries no expiry; the cookie it sets is
/// long-lived. 24 hours keeps refreshes rare while still exercising the
/// refresh path on long-running processes.
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Orchestrates login, logout, and concurrent session refresh.
pub struct AuthManager {
    transport: Arc<Transport>,
    retry: RetryPolicy,
    username: String,
    password: String,
    csrf: Arc<CsrfToken>,
    /// Current session snapshot, replaced atomically on refresh.
    session: RwLock<Option<Arc<Session>>>,
    /// Single-flight state: `Some(sender)` while a refresh is in flight.
    /// Waiters subscribe to the sender; dropping it wakes them all.
    refresh: Mutex<Option<watch::Sender<()>>>,
}

impl AuthManager {
    /// Creates a manager for the given transport and credentials.
    pub fn new(
        transport: Arc<Transport>,
        retry: RetryPolicy,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let csrf = Arc::clone(transport.csrf());
        Self {
            transport,
            retry,
            username: username.into(),
            password: password.into(),
            csrf,
            session: RwLock::new(None),
            refresh: Mutex::new(None),
        }
    }

    /// The username this manager authenticates as.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// A read-only snapshot of the current session, if any.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.read().expect("session lock poisoned").clone()
    }

    /// True iff the current session is valid.
    pub fn is_authenticated(&self) -> bool {
        self.session().is_some_and(|session| session.is_valid())
    }

    /// True when the session is valid and not yet due for refresh.
    fn session_is_fresh(&self) -> bool {
        self.session()
            .is_some_and(|session| session.is_valid() && !session.needs_refresh())
    }

    /// Unconditionally attempts to obtain a new session.
    ///
    /// POSTs the credentials to the login endpoint (through the retry
    /// wrapper, so transient 5xx responses are absorbed) and interprets the
    /// response:
    /// - 401/403: authentication failure, with the server's `message`
    ///   surfaced verbatim when the `{code,message}` body parses
    /// - other non-2xx: classified via the taxonomy with the most specific
    ///   message available
    /// - 2xx: the envelope (when parseable) must not carry errors; on
    ///   firmwares that omit the envelope, a non-empty `X-CSRF-Token` header
    ///   alone counts as success
    ///
    /// On success the CSRF token is published and a fresh [`Session`] with a
    /// 24-hour default expiry replaces the current one atomically.
    pub async fn login(&self) -> Result<()> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest {
            username: &self.username,
            password: &self.password,
        })?;
        let response = retry::send_with_retry(&self.transport, &self.retry, &request).await?;
        let status = response.status;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let (code, message) = parse_auth_error(&response.body);
            tracing::warn!(status = status.as_u16(), "login rejected by controller");
            return Err(ApiError {
                kind: ErrorKind::AuthenticationFailed,
                status_code: status.as_u16(),
                rc: code,
                message: message.unwrap_or_else(|| "invalid credentials".to_string()),
                endpoint: LOGIN_PATH.to_string(),
            }
            .into());
        }

        if !status.is_success() {
            let (rc, message) = most_specific_failure(&response.body);
            let message =
                message.unwrap_or_else(|| format!("login failed with HTTP {}", status.as_u16()));
            return Err(
                ApiError::classify(status.as_u16(), rc.as_deref(), message, LOGIN_PATH).into(),
            );
        }

        // 2xx from here on. Some firmwares omit the envelope entirely and
        // only hand back the CSRF header.
        let csrf_header = response
            .headers
            .get(CSRF_HEADER_NAME)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        match serde_json::from_slice::<LoginEnvelope>(&response.body) {
            Ok(envelope) => {
                if let Some(first) = envelope
                    .errors
                    .as_ref()
                    .and_then(|errors| errors.first())
                {
                    return Err(login_failure(status.as_u16(), None, first.clone()).into());
                }
                if let Some(meta) = &envelope.meta {
                    if meta.is_error() {
                        let message = meta
                            .msg
                            .clone()
                            .unwrap_or_else(|| "login rejected".to_string());
                        return Err(
                            login_failure(status.as_u16(), meta.rc.clone(), message).into()
                        );
                    }
                }
            }
            Err(err) => {
                if csrf_header.is_empty() {
                    return Err(Error::decode(LOGIN_PATH, err));
                }
                tracing::debug!(
                    "login response body not parseable; accepting on CSRF header presence"
                );
            }
        }

        // Publish the token before the session so that any caller observing
        // the new session also observes the new token.
        if !csrf_header.is_empty() {
            self.csrf.set(csrf_header);
        }
        let now = Utc::now();
        let session = Session::new(
            COOKIE_SESSION_ID,
            self.csrf.get(),
            &self.username,
            now,
            Some(now + Duration::hours(DEFAULT_SESSION_TTL_HOURS)),
        );
        *self.session.write().expect("session lock poisoned") = Some(Arc::new(session));

        tracing::info!(username = %self.username, "login succeeded");
        Ok(())
    }

    /// Best-effort logout.
    ///
    /// POSTs to the logout endpoint, ignoring the outcome, then clears the
    /// local session and CSRF token. Never returns an error; calling it
    /// again is a no-op. The cookie jar is left alone; a caller that needs
    /// a truly fresh identity constructs a new client.
    pub async fn logout(&self) {
        let request = ApiRequest::post(LOGOUT_PATH);
        match self.transport.execute(&request).await {
            Ok(response) => {
                tracing::debug!(status = response.status.as_u16(), "logout request completed")
            }
            Err(err) => {
                tracing::debug!(error = %err, "logout request failed; clearing local state anyway")
            }
        }

        *self.session.write().expect("session lock poisoned") = None;
        self.csrf.clear();
        tracing::info!("logged out");
    }

    /// Ensures a valid, non-expiring session exists, logging in at most once
    /// across any number of concurrent callers.
    ///
    /// # Behavior
    /// - Session valid and not near expiry: returns immediately with no
    ///   network traffic.
    /// - A refresh is already in flight: waits for it to complete, then
    ///   succeeds if it produced a valid session and fails with
    ///   [`Error::RefreshFailed`] otherwise.
    /// - Otherwise this caller becomes the refresher and runs [`login`],
    ///   waking all waiters when done.
    ///
    /// [`login`]: AuthManager::login
    pub async fn ensure_authenticated(&self) -> Result<()> {
        if self.session_is_fresh() {
            return Ok(());
        }

        // Decide our role under the refresh lock: either join the in-flight
        // refresh as a waiter, or install a new completion channel and
        // become the refresher. The lock is never held across an await.
        let waiter = {
            let mut slot = self.refresh.lock().expect("refresh lock poisoned");
            // A refresh may have completed while we were waiting on the lock.
            if self.session_is_fresh() {
                return Ok(());
            }
            match slot.as_ref() {
                Some(sender) => Some(sender.subscribe()),
                None => {
                    let (sender, _) = watch::channel(());
                    *slot = Some(sender);
                    None
                }
            }
        };

        match waiter {
            Some(mut receiver) => {
                tracing::debug!("session refresh already in flight; waiting");
                // The refresher never sends a value; the channel closing is
                // the completion signal.
                let _ = receiver.changed().await;
                if self.is_authenticated() {
                    Ok(())
                } else {
                    Err(Error::RefreshFailed)
                }
            }
            None => {
                tracing::debug!("session invalid or near expiry; refreshing");
                let _guard = RefreshGuard { auth: self };
                self.login().await
            }
        }
    }
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("username", &self.username)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight refresh state when the refresher exits, no matter
/// how. Dropping the stored sender closes the channel and wakes all waiters.
struct RefreshGuard<'a> {
    auth: &'a AuthManager,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.auth.refresh.lock() {
            slot.take();
        }
    }
}

/// Builds the login-specific failure for a 2xx response whose envelope
/// reports an error.
fn login_failure(status_code: u16, rc: Option<String>, message: String) -> ApiError {
    ApiError {
        kind: ErrorKind::AuthenticationFailed,
        status_code,
        rc,
        message,
        endpoint: LOGIN_PATH.to_string(),
    }
}

/// Parses the `{code,message}` auth-error body, tolerating anything else.
fn parse_auth_error(body: &[u8]) -> (Option<String>, Option<String>) {
    match serde_json::from_slice::<AuthErrorBody>(body) {
        Ok(parsed) => (parsed.code, parsed.message),
        Err(_) => (None, None),
    }
}

/// Extracts the most specific failure description from a login response
/// body: the `{code,message}` shape first, then the envelope's errors list,
/// then its `meta.msg`.
fn most_specific_failure(body: &[u8]) -> (Option<String>, Option<String>) {
    if let Ok(parsed) = serde_json::from_slice::<AuthErrorBody>(body) {
        if parsed.message.is_some() {
            return (parsed.code, parsed.message);
        }
    }
    if let Ok(envelope) = serde_json::from_slice::<LoginEnvelope>(body) {
        if let Some(first) = envelope.errors.as_ref().and_then(|errors| errors.first()) {
            return (None, Some(first.clone()));
        }
        if let Some(meta) = envelope.meta {
            return (meta.rc, meta.msg);
        }
    }
    (None, None)
}
