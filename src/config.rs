//! Client Configuration
//!
//! Configuration for a controller client. Two construction paths are
//! supported:
//! - a builder API starting from [`ClientConfig::new`] for programmatic use
//! - [`ClientConfig::from_env`] for the `UNIFI_*` environment variables,
//!   which the sample binaries use together with a `.env` file
//!
//! All durations are plain [`std::time::Duration`] values; network-facing
//! defaults follow the controller's conventions (HTTPS on port 443, the
//! `default` site).

use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Environment variable holding the controller hostname (required).
const ENV_HOST: &str = "UNIFI_HOST";

/// Environment variable holding the HTTPS port (optional, default 443).
const ENV_PORT: &str = "UNIFI_PORT";

/// Environment variables holding the login credentials.
const ENV_USERNAME: &str = "UNIFI_USERNAME";
const ENV_PASSWORD: &str = "UNIFI_PASSWORD";

/// Environment variable selecting the default site (optional).
const ENV_SITE: &str = "UNIFI_SITE";

/// Environment variable disabling TLS certificate verification.
///
/// Accepts "true" (case-insensitive); anything else keeps verification on.
/// Development convenience only: most controllers ship self-signed
/// certificates out of the box.
const ENV_SKIP_TLS_VERIFY: &str = "UNIFI_SKIP_TLS_VERIFY";

/// Default HTTPS port of the controller.
const DEFAULT_PORT: u16 = 443;

/// Default administrative site identifier.
const DEFAULT_SITE: &str = "default";

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on idle pooled connections (total and per host).
const DEFAULT_MAX_IDLE_CONNS: usize = 10;

/// Default idle-connection lifetime before the pool releases it.
const DEFAULT_IDLE_CONN_TIMEOUT: Duration = Duration::from_secs(90);

/// Retry behavior for transient controller failures.
///
/// The wrapper performs `max_retries + 1` total tries, waiting
/// `min(initial_backoff × multiplier^attempt, max_backoff)` between them.
/// Only the listed HTTP statuses are considered transient; other failures
/// (notably 4xx client errors) are surfaced immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of re-tries after the initial attempt.
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single backoff wait.
    pub max_backoff: Duration,
    /// Exponential growth factor applied per attempt.
    pub multiplier: f64,
    /// HTTP statuses treated as transient.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
            retryable_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// True when the given status is in the transient set.
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Backoff to wait after the given zero-based attempt.
    ///
    /// Computed as `initial_backoff × multiplier^attempt`, capped at
    /// `max_backoff`. Saturates rather than overflowing for large attempt
    /// numbers.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(i32::MAX as u32) as i32);
        let raw = self.initial_backoff.as_secs_f64() * factor;
        let capped = raw.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

/// Connection settings for a controller client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Controller hostname or IP address (required).
    pub host: String,
    /// HTTPS port the controller listens on.
    pub port: u16,
    /// Login username.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Site identifier used when a call does not name one explicitly.
    pub default_site: String,
    /// Skip TLS certificate verification (development only).
    pub skip_tls_verify: bool,
    /// Per-request timeout, covering connect, send, and body read.
    pub timeout: Duration,
    /// Cap on idle pooled connections.
    pub max_idle_conns: usize,
    /// How long an idle connection is kept before being released.
    pub idle_conn_timeout: Duration,
    /// Optional User-Agent header value.
    pub user_agent: Option<String>,
    /// Retry behavior for transient failures.
    pub retry: RetryPolicy,
    /// Full base URL overriding the `https://{host}:{port}` derivation.
    ///
    /// For controllers reached through a local reverse proxy (possibly over
    /// plain HTTP) and for tests against in-process servers.
    pub base_url_override: Option<Url>,
}

impl ClientConfig {
    /// Creates a configuration for the given controller host with defaults
    /// for everything else.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            default_site: DEFAULT_SITE.to_string(),
            skip_tls_verify: false,
            timeout: DEFAULT_TIMEOUT,
            max_idle_conns: DEFAULT_MAX_IDLE_CONNS,
            idle_conn_timeout: DEFAULT_IDLE_CONN_TIMEOUT,
            user_agent: None,
            retry: RetryPolicy::default(),
            base_url_override: None,
        }
    }

    /// Loads the configuration from `UNIFI_*` environment variables.
    ///
    /// # Errors
    /// - `UNIFI_HOST` not set or empty
    /// - `UNIFI_PORT` set but not a valid port number
    pub fn from_env() -> Result<Self> {
        let host = env::var(ENV_HOST)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                Error::InvalidConfig(format!("{ENV_HOST} environment variable not set"))
            })?;

        let mut config = Self::new(host);

        if let Ok(raw) = env::var(ENV_PORT) {
            config.port = raw.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!("{ENV_PORT} must be a valid port number, got '{raw}'"))
            })?;
        }
        if let Ok(username) = env::var(ENV_USERNAME) {
            config.username = username;
        }
        if let Ok(password) = env::var(ENV_PASSWORD) {
            config.password = password;
        }
        if let Ok(site) = env::var(ENV_SITE) {
            let site = site.trim().to_string();
            if !site.is_empty() {
                config.default_site = site;
            }
        }
        if let Ok(raw) = env::var(ENV_SKIP_TLS_VERIFY) {
            config.skip_tls_verify = raw.trim().eq_ignore_ascii_case("true");
        }

        Ok(config)
    }

    /// Sets the HTTPS port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the login credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the default site identifier.
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.default_site = site.into();
        self
    }

    /// Disables TLS certificate verification.
    ///
    /// Only for development against controllers with self-signed
    /// certificates; a warning is logged when the transport is built with
    /// this flag set.
    pub fn with_skip_tls_verify(mut self, skip: bool) -> Self {
        self.skip_tls_verify = skip;
        self
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the derived base URL entirely (reverse-proxy setups).
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url_override = Some(base_url);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// - empty `host`
    /// - zero `timeout`
    /// - `multiplier` below 1.0 (the backoff would shrink)
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::InvalidConfig("host must not be empty".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be non-zero".to_string()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(Error::InvalidConfig(
                "retry multiplier must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// The HTTP(S) base URL: the override when set, otherwise
    /// `https://{host}:{port}`.
    pub fn base_url(&self) -> Result<Url> {
        if let Some(base_url) = &self.base_url_override {
            return Ok(base_url.clone());
        }
        let raw = format!("https://{}:{}", self.host.trim(), self.port);
        Url::parse(&raw)
            .map_err(|err| Error::InvalidConfig(format!("invalid controller URL '{raw}': {err}")))
    }

    /// The WebSocket base URL: the HTTP base with its scheme switched to
    /// `ws`/`wss`.
    pub fn ws_base_url(&self) -> Result<Url> {
        let mut url = self.base_url()?;
        let scheme = match url.scheme() {
            "http" => "ws",
            _ => "wss",
        };
        url.set_scheme(scheme)
            .map_err(|()| Error::InvalidConfig(format!("cannot derive WebSocket URL from '{url}'")))?;
        Ok(url)
    }
}
