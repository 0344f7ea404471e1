/**
 * Event Stream Watcher
 *
 * Sample program that subscribes to a site's real-time event feed and
 * prints every event until interrupted. Demonstrates the subscription
 * surface, the error channel, and cooperative shutdown.
 *
 * Usage:
 * ```bash
 * UNIFI_HOST=192.168.1.1 UNIFI_USERNAME=admin UNIFI_PASSWORD=... \
 *     cargo run --bin watch_events [-- site [event_type ...]]
 * ```
 *
 * Positional arguments: an optional site (defaults to the configured one)
 * followed by optional event-type filters. With filters given, only
 * matching events are printed.
 */
use std::env;

use anyhow::{Context, Result};
use dotenv::dotenv;
use tokio::signal;

use unifi_client::{ClientConfig, UnifiClient};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env().context("failed to load UNIFI_* configuration")?;
    let client = UnifiClient::connect(config)
        .await
        .context("failed to connect to controller")?;

    let mut args = env::args().skip(1);
    let site = args
        .next()
        .unwrap_or_else(|| client.default_site().to_string());
    let filters: Vec<String> = args.collect();

    let subscription = if filters.is_empty() {
        client.events().subscribe(&site)
    } else {
        client.events().subscribe_filtered(&site, filters.clone())
    }
    .context("failed to subscribe to event stream")?;
    let (mut events, mut errors) = subscription.into_parts();

    tracing::info!(site = %site, ?filters, "watching events; press Ctrl+C to stop");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    println!("[{}] {}: {}", event.timestamp, event.event_type, event.payload);
                }
                None => {
                    tracing::warn!("event stream terminated");
                    break;
                }
            },
            error = errors.recv() => {
                if let Some(error) = error {
                    tracing::warn!(%error, "event stream reported an error");
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("received Ctrl+C; shutting down");
                break;
            }
        }
    }

    client.events().close();
    client.logout().await;
    Ok(())
}
