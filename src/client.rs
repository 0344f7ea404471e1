//! Controller Client Facade
//!
//! [`UnifiClient`] wires the layers together: the auth manager sits on top
//! of the retry wrapper, which sits on top of the transport, and the event
//! stream client shares the transport's cookie jar and session state. One
//! client instance is expected to serve many concurrent callers; it is cheap
//! to clone and all clones share state.
//!
//! # Request surface
//! Two levels are offered:
//! - [`send`](UnifiClient::send): the raw post-authenticated exchange;
//!   the caller runs [`ensure_authenticated`](UnifiClient::ensure_authenticated)
//!   first and gets the full status/headers/body back.
//! - the typed helpers ([`get`](UnifiClient::get), [`post`](UnifiClient::post),
//!   [`put`](UnifiClient::put), [`delete`](UnifiClient::delete)): ensure
//!   authentication, send through the retry wrapper, and unwrap the
//!   `{ meta, data }` envelope into payload items.
//!
//! # CSRF failures on mutating requests
//! A request rejected with [`ErrorKind::InvalidCsrfToken`] can be retried
//! once after calling `ensure_authenticated` to obtain a fresh token. The
//! client does not do this automatically because it cannot know whether the
//! request is idempotent.
//!
//! [`ErrorKind::InvalidCsrfToken`]: crate::error::ErrorKind::InvalidCsrfToken

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::csrf::CsrfToken;
use crate::auth::session::Session;
use crate::auth::AuthManager;
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::events::EventStream;
use crate::models::{AuthErrorBody, Envelope, RawEnvelope};
use crate::transport::{retry, ApiRequest, ApiResponse, Transport};

/// High-level handle for one controller.
#[derive(Clone)]
pub struct UnifiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<Transport>,
    auth: Arc<AuthManager>,
    events: EventStream,
}

impl UnifiClient {
    /// Builds a client from the configuration without contacting the
    /// controller.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::InvalidConfig`] when the configuration
    /// fails validation or the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let csrf = Arc::new(CsrfToken::new());
        let transport = Arc::new(Transport::new(&config, csrf)?);
        let auth = Arc::new(AuthManager::new(
            Arc::clone(&transport),
            config.retry.clone(),
            config.username.clone(),
            config.password.clone(),
        ));
        let events = EventStream::new(Arc::clone(&transport), Arc::clone(&auth), &config)?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                auth,
                events,
            }),
        })
    }

    /// Builds a client and logs in immediately.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.login().await?;
        Ok(client)
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The configured default site identifier.
    pub fn default_site(&self) -> &str {
        &self.inner.config.default_site
    }

    /// The event stream client for this controller.
    pub fn events(&self) -> &EventStream {
        &self.inner.events
    }

    /// Unconditionally performs a fresh login. See [`AuthManager::login`].
    pub async fn login(&self) -> Result<()> {
        self.inner.auth.login().await
    }

    /// Best-effort logout; never fails. See [`AuthManager::logout`].
    pub async fn logout(&self) {
        self.inner.auth.logout().await
    }

    /// Ensures a valid session exists, logging in at most once across
    /// concurrent callers. See [`AuthManager::ensure_authenticated`].
    pub async fn ensure_authenticated(&self) -> Result<()> {
        self.inner.auth.ensure_authenticated().await
    }

    /// A read-only snapshot of the current session.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.inner.auth.session()
    }

    /// True iff the current session is valid.
    pub fn is_authenticated(&self) -> bool {
        self.inner.auth.is_authenticated()
    }

    /// Sends a raw request through the retry wrapper.
    ///
    /// Post-authenticated: the caller is expected to have run
    /// [`ensure_authenticated`](UnifiClient::ensure_authenticated). The
    /// response is returned whatever its status (including a retryable
    /// status that survived every attempt) so the caller can inspect it.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        retry::send_with_retry(&self.inner.transport, &self.inner.config.retry, &request).await
    }

    /// GET an endpoint and unwrap the envelope into payload items.
    pub async fn get<T: DeserializeOwned>(&self, path: impl Into<String>) -> Result<Vec<T>> {
        self.call(ApiRequest::get(path)).await
    }

    /// POST a JSON body and unwrap the envelope.
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: impl Into<String>,
        body: &B,
    ) -> Result<Vec<T>> {
        self.call(ApiRequest::post(path).json(body)?).await
    }

    /// PUT a JSON body and unwrap the envelope.
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: impl Into<String>,
        body: &B,
    ) -> Result<Vec<T>> {
        self.call(ApiRequest::put(path).json(body)?).await
    }

    /// DELETE an endpoint and unwrap the envelope.
    pub async fn delete<T: DeserializeOwned>(&self, path: impl Into<String>) -> Result<Vec<T>> {
        self.call(ApiRequest::delete(path)).await
    }

    /// Builds a site-scoped API path: `/api/s/{site}/{tail}`.
    pub fn site_path(&self, site: &str, tail: &str) -> String {
        format!("/api/s/{site}/{}", tail.trim_start_matches('/'))
    }

    /// Shared flow of the typed helpers: authenticate, send, unwrap.
    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Vec<T>> {
        self.ensure_authenticated().await?;
        let endpoint = request.path.clone();
        let response = self.send(request).await?;
        unwrap_envelope(&response, &endpoint)
    }
}

impl std::fmt::Debug for UnifiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiClient")
            .field("host", &self.inner.config.host)
            .field("default_site", &self.inner.config.default_site)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// Interprets a buffered response as a `{ meta, data }` envelope.
///
/// Either a non-2xx status or a non-"ok" `rc` constitutes failure; both are
/// folded into the error taxonomy with the most specific message the body
/// offers.
fn unwrap_envelope<T: DeserializeOwned>(response: &ApiResponse, endpoint: &str) -> Result<Vec<T>> {
    let status = response.status.as_u16();

    if !response.is_success() {
        let (rc, message) = failure_details(&response.body);
        let message = message.unwrap_or_else(|| format!("HTTP {status}"));
        return Err(ApiError::classify(status, rc.as_deref(), message, endpoint).into());
    }

    let envelope: Envelope<T> = response.json(endpoint)?;
    if envelope.meta.is_error() {
        let rc = envelope.meta.rc.clone();
        let message = envelope
            .meta
            .msg
            .clone()
            .unwrap_or_else(|| format!("rc={}", rc.as_deref().unwrap_or("error")));
        return Err(ApiError::classify(status, rc.as_deref(), message, endpoint).into());
    }

    Ok(envelope.data)
}

/// Pulls the most specific `(rc, message)` pair out of a failure body:
/// the envelope's `meta` first, then the flat `{code,message}` shape.
fn failure_details(body: &[u8]) -> (Option<String>, Option<String>) {
    if let Ok(envelope) = serde_json::from_slice::<RawEnvelope>(body) {
        if envelope.meta.rc.is_some() || envelope.meta.msg.is_some() {
            return (envelope.meta.rc, envelope.meta.msg);
        }
    }
    if let Ok(auth_body) = serde_json::from_slice::<AuthErrorBody>(body) {
        if auth_body.code.is_some() || auth_body.message.is_some() {
            return (auth_body.code, auth_body.message);
        }
    }
    (None, None)
}
