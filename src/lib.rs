/**
 * UniFi Network Controller Client - Library Root Module
 *
 * This crate is a concurrent client library for the UniFi-style network
 * controller HTTPS+WebSocket API used to administer fleets of networking
 * devices (access points, switches, gateways). It mediates between caller
 * tasks and the controller, handling authentication, CSRF token lifecycle,
 * transient-failure retries, and the real-time event stream.
 *
 * Architecture Overview:
 * The client composes the auth manager over the retry wrapper over the
 * transport; the event stream borrows the transport's authenticated cookie
 * jar for its handshake. One client instance serves many concurrent callers.
 *
 * # Modules
 *
 * ## [`auth`](mod@auth)
 * Authentication and session lifecycle:
 * - login/logout against the controller's cookie-based auth endpoints
 * - single-flight session refresh under concurrent load
 * - the shared CSRF token cell and the immutable session snapshot
 *
 * ## [`transport`](mod@transport)
 * One HTTP request/response exchange at a time:
 * - cookie-jar session persistence and CSRF header injection/extraction
 * - connection pooling with idle caps and an in-flight request limiter
 * - the retry wrapper with bounded exponential backoff
 *
 * ## [`events`](mod@events)
 * The long-lived WebSocket event consumer:
 * - site-scoped subscriptions with optional event-type filters
 * - bounded fan-out channels that never block the reader
 * - automatic reconnection with re-authentication
 *
 * ## [`error`](mod@error)
 * The stable error taxonomy and the controller response classifier.
 *
 * ## [`models`](mod@models)
 * Wire types: the `{ meta, data }` envelope, lenient scalar decoders for
 * the controller's inconsistent JSON, and domain payloads.
 *
 * ## [`api`](mod@api)
 * Typed endpoint facades (sites, devices, stations, alarms) layered on the
 * core request surface.
 *
 * # Usage
 *
 * ```rust,no_run
 * use unifi_client::{ClientConfig, UnifiClient};
 *
 * #[tokio::main]
 * async fn main() -> Result<(), Box<dyn std::error::Error>> {
 *     let config = ClientConfig::new("controller.example.com")
 *         .with_credentials("admin", "secret")
 *         .with_skip_tls_verify(true);
 *     let client = UnifiClient::connect(config).await?;
 *
 *     for device in client.list_devices("default").await? {
 *         println!("{} {:?}", device.mac, device.name);
 *     }
 *
 *     let mut events = client.events().subscribe("default")?;
 *     while let Some(event) = events.recv().await {
 *         println!("{}: {}", event.event_type, event.payload);
 *     }
 *     Ok(())
 * }
 * ```
 *
 * # Configuration
 *
 * Programmatic construction via [`ClientConfig`] builders, or from the
 * environment via [`ClientConfig::from_env`]:
 * - `UNIFI_HOST`: controller hostname (required)
 * - `UNIFI_PORT`: HTTPS port (default 443)
 * - `UNIFI_USERNAME` / `UNIFI_PASSWORD`: login credentials
 * - `UNIFI_SITE`: default site (default "default")
 * - `UNIFI_SKIP_TLS_VERIFY`: accept self-signed certificates (dev only)
 */
// Core client modules
pub mod api; // Typed endpoint facades
pub mod auth; // Authentication, session lifecycle, CSRF token
pub mod client; // High-level client facade
pub mod config; // Client configuration and retry policy
pub mod error; // Error taxonomy and response classification
pub mod events; // WebSocket event stream client
pub mod models; // Wire types and lenient decoders
pub mod transport; // HTTP transport and retry wrapper

pub use auth::csrf::CsrfToken;
pub use auth::session::Session;
pub use client::UnifiClient;
pub use config::{ClientConfig, RetryPolicy};
pub use error::{ApiError, Error, ErrorKind, Result, ValidationError};
pub use events::{Event, EventStream, EventSubscription, SubscribeOptions};
pub use transport::{ApiRequest, ApiResponse};
