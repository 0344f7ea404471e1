/**
 * Device Listing Utility
 *
 * Sample program that connects to a controller and prints the devices of a
 * site. Intended as a smoke test for credentials and connectivity, and as a
 * minimal example of the typed endpoint surface.
 *
 * Usage:
 * ```bash
 * UNIFI_HOST=192.168.1.1 UNIFI_USERNAME=admin UNIFI_PASSWORD=... \
 *     cargo run --bin list_devices [-- site]
 * ```
 *
 * Configuration is read from the environment (a `.env` file is honored);
 * the optional positional argument overrides the configured site.
 */
use std::env;

use anyhow::{Context, Result};
use dotenv::dotenv;

use unifi_client::{ClientConfig, UnifiClient};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env().context("failed to load UNIFI_* configuration")?;
    let client = UnifiClient::connect(config)
        .await
        .context("failed to connect to controller")?;

    let site = env::args()
        .nth(1)
        .unwrap_or_else(|| client.default_site().to_string());

    let devices = client
        .list_devices(&site)
        .await
        .with_context(|| format!("failed to list devices for site '{site}'"))?;

    println!("{} device(s) on site '{site}':", devices.len());
    for device in devices {
        println!(
            "  {}  {:<10} {:<16} {}",
            device.mac,
            device.device_type.as_deref().unwrap_or("-"),
            device.ip.as_deref().unwrap_or("-"),
            device.name.as_deref().unwrap_or("(unnamed)"),
        );
    }

    client.logout().await;
    Ok(())
}
