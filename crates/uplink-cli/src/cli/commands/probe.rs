//! `uplink probe` – run the connectivity check on its own.

use anyhow::{Context, Result};
use uplink_core::config::UplinkConfig;
use uplink_core::connect_check::{ConnectivityProber, CurlConnectChecker};

pub async fn run_probe(cfg: &UplinkConfig) -> Result<()> {
    if !cfg.connect_check.enabled {
        println!("connect check disabled in config; uploads treat the network as reachable");
        return Ok(());
    }
    let checker = CurlConnectChecker::new(&cfg.connect_check);
    let (outcome, connected) = tokio::task::spawn_blocking(move || {
        let outcome = checker.probe();
        let connected = checker.is_connected(&outcome);
        (outcome, connected)
    })
    .await
    .context("probe task panicked")?;

    println!("probe urls: {}", cfg.connect_check.urls.join(", "));
    println!("result: {}", outcome);
    println!("{}", if connected { "connected" } else { "offline" });
    Ok(())
}
