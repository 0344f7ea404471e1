//! In-process mock controller for integration tests.
//!
//! Implements just enough of the controller's wire surface to exercise the
//! client: the login/logout endpoints, a scripted "flaky" endpoint for retry
//! tests, a catch-all API endpoint that records every request it sees, and
//! the site-scoped WebSocket event feed driven by per-connection scripts.

// Each test binary uses a different slice of the mock.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use url::Url;

use unifi_client::{ClientConfig, RetryPolicy};

/// How the mock answers the next login attempts.
#[derive(Debug, Clone)]
pub enum LoginBehavior {
    /// 200 with an "ok" envelope, a session cookie, and this CSRF token.
    Success { csrf: String },
    /// 401 with the `{code,message}` auth-error body.
    Unauthorized { message: String },
    /// 200 whose envelope reports `rc=error` with this message.
    EnvelopeError { msg: String },
    /// 200 with a CSRF header but a non-JSON body (envelope-less firmware).
    BareCsrf { csrf: String },
}

/// One scripted WebSocket connection: frames to push, then either close or
/// hold the connection open.
#[derive(Debug, Clone, Default)]
pub struct WsScript {
    pub frames: Vec<String>,
    pub close_after: bool,
}

/// One request observed by the mock.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub csrf: Option<String>,
    pub cookie: Option<String>,
    pub body: String,
}

#[derive(Default)]
pub struct MockState {
    pub login_count: AtomicUsize,
    pub login_delay: Mutex<Duration>,
    pub login_behavior: Mutex<Option<LoginBehavior>>,
    pub requests: Mutex<Vec<CapturedRequest>>,
    /// Status codes the `/api/flaky` endpoint pops per hit; empty means 200.
    pub flaky_statuses: Mutex<VecDeque<u16>>,
    pub flaky_hits: AtomicUsize,
    /// Scripts popped per WebSocket connection; empty means "no frames,
    /// stay open".
    pub ws_scripts: Mutex<VecDeque<WsScript>>,
    pub ws_connections: AtomicUsize,
    /// Canned JSON bodies per `/api/...` path, served with status 200.
    pub responses: Mutex<std::collections::HashMap<String, serde_json::Value>>,
    /// When set, every API response carries this `X-CSRF-Token` header.
    pub rotate_csrf_to: Mutex<Option<String>>,
}

impl MockState {
    fn record(&self, method: &str, path: &str, headers: &HeaderMap, body: &str) {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(String::from)
        };
        self.requests.lock().unwrap().push(CapturedRequest {
            method: method.to_string(),
            path: path.to_string(),
            csrf: get("x-csrf-token"),
            cookie: get("cookie"),
            body: body.to_string(),
        });
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests_to(&self, path: &str) -> Vec<CapturedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.path == path)
            .cloned()
            .collect()
    }

    pub fn set_login_behavior(&self, behavior: LoginBehavior) {
        *self.login_behavior.lock().unwrap() = Some(behavior);
    }

    pub fn set_login_delay(&self, delay: Duration) {
        *self.login_delay.lock().unwrap() = delay;
    }

    pub fn script_flaky(&self, statuses: impl IntoIterator<Item = u16>) {
        let mut queue = self.flaky_statuses.lock().unwrap();
        queue.clear();
        queue.extend(statuses);
    }

    pub fn push_ws_script(&self, script: WsScript) {
        self.ws_scripts.lock().unwrap().push_back(script);
    }

    pub fn set_response(&self, path: &str, body: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), body);
    }

    pub fn rotate_csrf(&self, token: &str) {
        *self.rotate_csrf_to.lock().unwrap() = Some(token.to_string());
    }
}

pub struct MockController {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockController {
    /// Starts the mock on an ephemeral port.
    pub async fn spawn() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/logout", post(logout))
            .route("/wss/s/{site}/events", any(events_ws))
            .route("/api/{*rest}", any(api_catch_all))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// A client configuration pointed at this mock, with fast retries so
    /// tests stay quick.
    pub fn client_config(&self) -> ClientConfig {
        let base = Url::parse(&format!("http://{}", self.addr)).unwrap();
        ClientConfig::new("127.0.0.1")
            .with_credentials("admin", "correct-horse")
            .with_base_url(base)
            .with_retry(RetryPolicy {
                initial_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_millis(100),
                ..RetryPolicy::default()
            })
    }
}

async fn login(State(state): State<Arc<MockState>>, headers: HeaderMap, body: String) -> Response {
    state.record("POST", "/api/auth/login", &headers, &body);
    state.login_count.fetch_add(1, Ordering::SeqCst);

    let delay = *state.login_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let behavior = state
        .login_behavior
        .lock()
        .unwrap()
        .clone()
        .unwrap_or(LoginBehavior::Success {
            csrf: "mock-csrf".to_string(),
        });

    match behavior {
        LoginBehavior::Success { csrf } => {
            let mut headers = HeaderMap::new();
            headers.insert("x-csrf-token", csrf.parse().unwrap());
            headers.insert(
                SET_COOKIE,
                "unifises=mock-session; Path=/".parse().unwrap(),
            );
            (
                StatusCode::OK,
                headers,
                Json(json!({"meta": {"rc": "ok"}, "data": []})),
            )
                .into_response()
        }
        LoginBehavior::Unauthorized { message } => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": "api.err.Invalid", "message": message})),
        )
            .into_response(),
        LoginBehavior::EnvelopeError { msg } => (
            StatusCode::OK,
            Json(json!({"meta": {"rc": "error", "msg": msg}, "data": []})),
        )
            .into_response(),
        LoginBehavior::BareCsrf { csrf } => {
            let mut headers = HeaderMap::new();
            headers.insert("x-csrf-token", csrf.parse().unwrap());
            headers.insert(
                SET_COOKIE,
                "unifises=mock-session; Path=/".parse().unwrap(),
            );
            (StatusCode::OK, headers, "welcome").into_response()
        }
    }
}

async fn logout(State(state): State<Arc<MockState>>, headers: HeaderMap, body: String) -> Response {
    state.record("POST", "/api/logout", &headers, &body);
    (
        StatusCode::OK,
        Json(json!({"meta": {"rc": "ok"}, "data": []})),
    )
        .into_response()
}

async fn api_catch_all(
    State(state): State<Arc<MockState>>,
    Path(rest): Path<String>,
    method: axum::http::Method,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = format!("/api/{rest}");
    state.record(method.as_str(), &path, &headers, &body);

    if rest == "flaky" {
        state.flaky_hits.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = state.flaky_statuses.lock().unwrap().pop_front() {
            return (
                StatusCode::from_u16(status).unwrap(),
                Json(json!({"meta": {"rc": "error", "msg": "scripted failure"}})),
            )
                .into_response();
        }
    }

    let mut response_headers = HeaderMap::new();
    if let Some(token) = state.rotate_csrf_to.lock().unwrap().as_ref() {
        response_headers.insert("x-csrf-token", token.parse().unwrap());
    }

    let body = state
        .responses
        .lock()
        .unwrap()
        .get(&path)
        .cloned()
        .unwrap_or_else(|| json!({"meta": {"rc": "ok"}, "data": []}));

    (StatusCode::OK, response_headers, Json(body)).into_response()
}

async fn events_ws(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(site): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Response {
    state.record("GET", &format!("/wss/s/{site}/events"), &headers, "");
    state.ws_connections.fetch_add(1, Ordering::SeqCst);
    let script = state
        .ws_scripts
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_default();
    upgrade.on_upgrade(move |socket| run_ws_script(socket, script))
}

async fn run_ws_script(mut socket: WebSocket, script: WsScript) {
    for frame in script.frames {
        if socket.send(Message::Text(frame.into())).await.is_err() {
            return;
        }
    }
    if script.close_after {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    // Hold the connection open until the client goes away.
    while let Some(message) = socket.recv().await {
        if message.is_err() {
            break;
        }
    }
}

/// Builds one event frame in the controller's wire shape.
pub fn event_frame(event_type: &str, payloads: &[serde_json::Value]) -> String {
    json!({
        "meta": {"message": event_type, "rc": "ok"},
        "data": payloads,
    })
    .to_string()
}
