//! `uplink config` – show where the config lives and what is in effect.

use anyhow::Result;
use uplink_core::config::{self, UplinkConfig};

pub fn run_config(cfg: &UplinkConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", config::to_toml(cfg)?);
    Ok(())
}
