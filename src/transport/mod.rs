//! HTTP Transport
//!
//! Builds, sends, and receives one controller request at a time. The
//! transport owns the pieces every request shares:
//! - the pooled `reqwest` client, with redirects disabled: the controller
//!   uses 302s to convey auth state, so the first response must be surfaced
//! - the cookie jar holding the session credential
//! - the CSRF token holder, injected on requests and harvested from
//!   responses
//! - an in-flight limiter bounding concurrent requests to the pool size
//!
//! Retrying, authentication, and envelope interpretation live in the layers
//! above; the transport returns the raw status, headers, and fully buffered
//! body of whatever the controller said.

pub mod retry;

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::auth::csrf::{CsrfToken, CSRF_HEADER_NAME};
use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// A logical controller request: method, relative path, optional JSON body,
/// and extra headers. Constructed fresh per call and reusable across retry
/// attempts.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the controller base URL (leading slash optional).
    pub path: String,
    /// JSON body, already converted to a value tree.
    pub body: Option<Value>,
    /// Additional headers, applied last so they override the defaults.
    pub headers: HeaderMap,
}

impl ApiRequest {
    /// Creates a bodiless request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Shorthand for a PUT request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Shorthand for a DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attaches a JSON body.
    ///
    /// Serialization happens here so encoding failures surface to the caller
    /// before anything touches the network.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body).map_err(Error::Encode)?);
        Ok(self)
    }

    /// Adds a custom header. Custom headers override the defaults.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A fully buffered controller response.
///
/// The body is always read to completion before this is returned; callers
/// never see a partial read.
#[derive(Debug)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Complete response body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decodes the body as JSON into the given type.
    pub fn json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| Error::decode(endpoint, err))
    }

    /// The body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The shared HTTP transport for one client instance.
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
    cookie_jar: Arc<Jar>,
    csrf: Arc<CsrfToken>,
    /// Bounds simultaneous in-flight requests to the pool size. Callers
    /// suspend on acquisition until a slot frees up or their future is
    /// dropped.
    limiter: Semaphore,
}

impl Transport {
    /// Builds a transport from the client configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] for a malformed base URL or an HTTP
    /// client that cannot be constructed (e.g. TLS backend failure).
    pub fn new(config: &ClientConfig, csrf: Arc<CsrfToken>) -> Result<Self> {
        config.validate()?;
        let base_url = config.base_url()?;

        if config.skip_tls_verify {
            tracing::warn!(
                host = %config.host,
                "TLS certificate verification disabled; only use this against development controllers"
            );
        }

        let cookie_jar = Arc::new(Jar::default());
        let mut builder = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookie_jar))
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.max_idle_conns)
            .pool_idle_timeout(config.idle_conn_timeout)
            .danger_accept_invalid_certs(config.skip_tls_verify);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let http = builder
            .build()
            .map_err(|err| Error::InvalidConfig(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url,
            cookie_jar,
            csrf,
            limiter: Semaphore::new(config.max_idle_conns.max(1)),
        })
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The shared CSRF token holder.
    pub fn csrf(&self) -> &Arc<CsrfToken> {
        &self.csrf
    }

    /// Resolves a relative path against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let raw = format!("{base}/{}", path.trim_start_matches('/'));
        Url::parse(&raw)
            .map_err(|err| Error::InvalidConfig(format!("invalid request path '{path}': {err}")))
    }

    /// The `Cookie` header value for the current session, if the jar holds
    /// cookies for the controller origin. Used by the WebSocket handshake.
    pub fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookie_jar.cookies(&self.base_url)?;
        cookies.to_str().ok().map(String::from)
    }

    /// Executes one request/response exchange.
    ///
    /// Steps:
    /// 1. Resolve the path against the base URL.
    /// 2. Attach default headers (`Accept`, `Content-Type` when a body is
    ///    present) and the current CSRF token when one is known.
    /// 3. Apply the request's custom headers last so they win.
    /// 4. Send without following redirects and buffer the entire body.
    /// 5. Harvest a rotated CSRF token from the response.
    ///
    /// Transport-level failures (I/O, timeout) are returned wrapped with the
    /// endpoint; non-2xx statuses are NOT errors at this layer.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        // Backpressure: hold a slot for the duration of the exchange.
        let _permit = self.limiter.acquire().await.expect("request limiter closed");

        let url = self.resolve(&request.path)?;
        tracing::debug!(method = %request.method, url = %url, "sending controller request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .json(body);
        }

        let token = self.csrf.get();
        if !token.is_empty() {
            builder = builder.header(CSRF_HEADER_NAME, token);
        }

        // Custom headers go in last: they override every default above.
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| Error::transport(&request.path, err))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| Error::transport(&request.path, err))?
            .to_vec();

        // Capture any token rotation before the caller sees the response.
        self.csrf.update_from_response(&headers);

        tracing::trace!(
            status = status.as_u16(),
            bytes = body.len(),
            path = %request.path,
            "controller response received"
        );

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_paths_regardless_of_slashes() {
        let config = ClientConfig::new("controller.local").with_port(8443);
        let transport = Transport::new(&config, Arc::new(CsrfToken::new())).unwrap();

        let absolute = transport.resolve("/api/auth/login").unwrap();
        let relative = transport.resolve("api/auth/login").unwrap();
        assert_eq!(absolute.as_str(), "https://controller.local:8443/api/auth/login");
        assert_eq!(absolute, relative);
    }

    #[test]
    fn request_builder_serializes_body_eagerly() {
        let request = ApiRequest::post("/api/auth/login")
            .json(&serde_json::json!({"username": "admin"}))
            .unwrap();
        assert_eq!(
            request.body,
            Some(serde_json::json!({"username": "admin"}))
        );
    }
}
