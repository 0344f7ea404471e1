//! Event Stream Client
//!
//! Long-lived WebSocket consumer for the controller's site-scoped event
//! feed. One reader task runs per subscribed site; every inbound frame of
//! shape `{ meta: { message, rc }, data: [raw, ...] }` fans out as one
//! [`Event`] per `data` element to the matching subscribers.
//!
//! # Lifecycle
//! ```text
//!   Idle ── subscribe ──▶ Connecting
//!   Connecting ── success ──▶ Streaming
//!   Connecting ── failure ──▶ Backoff
//!   Streaming ── read OK ──▶ Streaming
//!   Streaming ── EOF/error ──▶ Backoff   (when reconnect is enabled)
//!   Streaming/Backoff ── close() ──▶ Closed
//!   Backoff ── timer ──▶ Connecting
//! ```
//!
//! The handshake reuses the transport's cookie jar and TLS settings, and
//! each reconnect re-runs `ensure_authenticated` first so an expired session
//! is refreshed before the new handshake. Reconnect waits follow the same
//! bounded exponential backoff shape as the HTTP retry policy.

pub mod subscription;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::auth::AuthManager;
use crate::config::{ClientConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::transport::Transport;

pub use self::subscription::{Event, EventSubscription, SubscribeOptions, DEFAULT_EVENT_BUFFER};
use self::subscription::{Subscriber, ERROR_BUFFER};

/// One inbound frame on the event socket.
#[derive(Debug, Deserialize)]
struct EventFrame {
    #[serde(default)]
    meta: FrameMeta,
    #[serde(default)]
    data: Vec<Value>,
}

/// Frame metadata; `message` names the event type of every `data` element.
#[derive(Debug, Default, Deserialize)]
struct FrameMeta {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    rc: Option<String>,
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a streaming connection ended.
enum ReadOutcome {
    /// `close()` was called or the client was dropped.
    Shutdown,
    /// Every subscriber went away; the site task can exit.
    NoSubscribers,
    /// Transport-level EOF or error; reconnect may apply.
    Disconnected(String),
}

/// Per-site reader bookkeeping.
struct SiteHandle {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
    task: tokio::task::JoinHandle<()>,
}

/// Registry of live site readers.
struct StreamState {
    sites: HashMap<String, SiteHandle>,
    closed: bool,
}

/// Everything a reader task needs, shared behind one `Arc`.
struct StreamShared {
    transport: Arc<Transport>,
    auth: Arc<AuthManager>,
    ws_base: Url,
    reconnect: bool,
    backoff: RetryPolicy,
    skip_tls_verify: bool,
    state: Mutex<StreamState>,
    shutdown: watch::Sender<bool>,
}

/// Client for the controller's real-time event feed.
///
/// Cheap to clone; all clones share the same site readers and shut down
/// together via [`close`](EventStream::close).
#[derive(Clone)]
pub struct EventStream {
    inner: Arc<StreamShared>,
}

impl EventStream {
    /// Creates an event stream client sharing the transport's session state.
    pub(crate) fn new(
        transport: Arc<Transport>,
        auth: Arc<AuthManager>,
        config: &ClientConfig,
    ) -> Result<Self> {
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            inner: Arc::new(StreamShared {
                transport,
                auth,
                ws_base: config.ws_base_url()?,
                reconnect: true,
                backoff: config.retry.clone(),
                skip_tls_verify: config.skip_tls_verify,
                state: Mutex::new(StreamState {
                    sites: HashMap::new(),
                    closed: false,
                }),
                shutdown,
            }),
        })
    }

    /// Subscribes to every event of a site.
    pub fn subscribe(&self, site: impl Into<String>) -> Result<EventSubscription> {
        self.subscribe_with(site, SubscribeOptions::new())
    }

    /// Subscribes to a site, accepting only the given event types.
    ///
    /// Non-matching events are dropped silently (they do not consume buffer
    /// space and produce no error).
    pub fn subscribe_filtered<I, S>(
        &self,
        site: impl Into<String>,
        event_types: I,
    ) -> Result<EventSubscription>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscribe_with(site, SubscribeOptions::new().with_event_types(event_types))
    }

    /// Subscribes with explicit options.
    ///
    /// The first subscription for a site starts its reader task; later ones
    /// share the existing connection.
    pub fn subscribe_with(
        &self,
        site: impl Into<String>,
        options: SubscribeOptions,
    ) -> Result<EventSubscription> {
        let site = site.into();
        let (events_tx, events_rx) = mpsc::channel(options.effective_buffer());
        let (errors_tx, errors_rx) = mpsc::channel(ERROR_BUFFER);
        let subscriber = Subscriber::new(options.event_types, events_tx, errors_tx);

        let mut state = self.inner.state.lock().expect("event stream state poisoned");
        if state.closed {
            return Err(Error::EventStream("event stream client is closed".into()));
        }

        match state.sites.get(&site) {
            Some(handle) if !handle.task.is_finished() => {
                handle
                    .subscribers
                    .lock()
                    .expect("subscriber list poisoned")
                    .push(subscriber);
            }
            _ => {
                let subscribers = Arc::new(Mutex::new(vec![subscriber]));
                let task = tokio::spawn(run_site_stream(
                    Arc::clone(&self.inner),
                    site.clone(),
                    Arc::clone(&subscribers),
                ));
                state.sites.insert(site.clone(), SiteHandle { subscribers, task });
            }
        }

        tracing::debug!(site = %site, "event subscription registered");
        Ok(EventSubscription::new(events_rx, errors_rx))
    }

    /// Shuts down every site reader and closes all subscriber channels.
    ///
    /// Idempotent: further calls are no-ops, and later subscribe attempts
    /// fail. Readers terminate within one read/write cycle.
    pub fn close(&self) {
        let had_sites = {
            let mut state = self.inner.state.lock().expect("event stream state poisoned");
            state.closed = true;
            let drained: Vec<_> = state.sites.drain().collect();
            !drained.is_empty()
        };
        let _ = self.inner.shutdown.send(true);
        if had_sites {
            tracing::info!("event stream client closed");
        }
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock().expect("event stream state poisoned");
        f.debug_struct("EventStream")
            .field("sites", &state.sites.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// Connect/stream/backoff loop for one site. Exits on shutdown, when
/// reconnection is disabled after a failure, or when no subscribers remain.
async fn run_site_stream(
    shared: Arc<StreamShared>,
    site: String,
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
) {
    let mut shutdown = shared.shutdown.subscribe();
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        // The handshake needs live session cookies; refresh first.
        if let Err(err) = shared.auth.ensure_authenticated().await {
            tracing::warn!(site = %site, error = %err, "event stream authentication failed");
            report_all(&subscribers, &format!("authentication failed: {err}"));
            if !shared.reconnect || wait_backoff(&shared.backoff, &mut attempt, &mut shutdown).await
            {
                break;
            }
            continue;
        }

        match connect_site(&shared, &site).await {
            Ok(ws) => {
                attempt = 0;
                tracing::info!(site = %site, "event stream connected");
                match read_loop(ws, &subscribers, &mut shutdown).await {
                    ReadOutcome::Shutdown => break,
                    ReadOutcome::NoSubscribers => {
                        tracing::debug!(site = %site, "last event subscriber dropped");
                        break;
                    }
                    ReadOutcome::Disconnected(reason) => {
                        tracing::warn!(site = %site, reason = %reason, "event stream disconnected");
                        report_all(&subscribers, &reason);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(site = %site, error = %err, "event stream connect failed");
                report_all(&subscribers, &format!("connect failed: {err}"));
            }
        }

        if !shared.reconnect {
            break;
        }
        if subscribers
            .lock()
            .expect("subscriber list poisoned")
            .is_empty()
        {
            break;
        }
        if wait_backoff(&shared.backoff, &mut attempt, &mut shutdown).await {
            break;
        }
    }

    // Dropping the senders closes every subscriber channel.
    subscribers
        .lock()
        .expect("subscriber list poisoned")
        .clear();
    tracing::debug!(site = %site, "event stream task terminated");
}

/// Performs the WebSocket handshake for a site, carrying the transport's
/// session cookies.
async fn connect_site(shared: &StreamShared, site: &str) -> Result<WsStream> {
    let base = shared.ws_base.as_str().trim_end_matches('/');
    let raw = format!("{base}/wss/s/{site}/events");
    let url = Url::parse(&raw)
        .map_err(|err| Error::InvalidConfig(format!("invalid event stream URL '{raw}': {err}")))?;

    let mut request = url.as_str().into_client_request()?;
    if let Some(cookie) = shared.transport.cookie_header() {
        let value = HeaderValue::from_str(&cookie).map_err(|err| {
            Error::EventStream(format!("session cookie not usable as header: {err}"))
        })?;
        request.headers_mut().insert(COOKIE, value);
    } else {
        tracing::debug!(site = %site, "no session cookies available for handshake");
    }

    let connector = if shared.skip_tls_verify {
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| Error::EventStream(format!("TLS connector: {err}")))?;
        Some(Connector::NativeTls(tls))
    } else {
        None
    };

    let (ws, _response) = connect_async_tls_with_config(request, None, false, connector).await?;
    Ok(ws)
}

/// Pumps frames from an established connection until it ends.
async fn read_loop(
    mut ws: WsStream,
    subscribers: &Arc<Mutex<Vec<Subscriber>>>,
    shutdown: &mut watch::Receiver<bool>,
) -> ReadOutcome {
    loop {
        {
            let mut subs = subscribers.lock().expect("subscriber list poisoned");
            subs.retain(|sub| !sub.is_closed());
            if subs.is_empty() {
                return ReadOutcome::NoSubscribers;
            }
        }

        tokio::select! {
            changed = shutdown.changed() => {
                // A send or a dropped sender both mean we are done.
                if changed.is_err() || *shutdown.borrow() {
                    return ReadOutcome::Shutdown;
                }
            }
            message = ws.next() => match message {
                None => return ReadOutcome::Disconnected("connection closed".to_string()),
                Some(Ok(Message::Text(text))) => dispatch_frame(text.as_bytes(), subscribers),
                Some(Ok(Message::Binary(data))) => dispatch_frame(&data, subscribers),
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(err) = ws.send(Message::Pong(payload)).await {
                        return ReadOutcome::Disconnected(format!("pong failed: {err}"));
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    return ReadOutcome::Disconnected("server closed the stream".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    return ReadOutcome::Disconnected(format!("read failed: {err}"));
                }
            }
        }
    }
}

/// Decodes one frame and fans its `data` elements out to the subscribers.
///
/// Undecodable frames are dropped with a trace; the controller occasionally
/// interleaves non-event payloads on the same socket.
fn dispatch_frame(payload: &[u8], subscribers: &Arc<Mutex<Vec<Subscriber>>>) {
    let frame: EventFrame = match serde_json::from_slice(payload) {
        Ok(frame) => frame,
        Err(err) => {
            tracing::trace!(error = %err, "ignoring undecodable event frame");
            return;
        }
    };

    let event_type = frame.meta.message.unwrap_or_default();
    let received = Utc::now();

    let mut subs = subscribers.lock().expect("subscriber list poisoned");
    for element in frame.data {
        subs.retain(|sub| {
            if !sub.wants(&event_type) {
                return true;
            }
            sub.deliver(Event {
                event_type: event_type.clone(),
                timestamp: received,
                payload: element.clone(),
            })
        });
    }
}

/// Records a stream-level error on every subscriber's error channel.
fn report_all(subscribers: &Arc<Mutex<Vec<Subscriber>>>, message: &str) {
    let subs = subscribers.lock().expect("subscriber list poisoned");
    for sub in subs.iter() {
        sub.report(message);
    }
}

/// Waits out one backoff period; returns `true` when shutdown fired instead.
async fn wait_backoff(
    policy: &RetryPolicy,
    attempt: &mut u32,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let delay = policy.backoff_for(*attempt);
    *attempt = attempt.saturating_add(1);
    tracing::debug!(?delay, "event stream backing off before reconnect");
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
