use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Retry parameters (`[retry]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries per logical request (attempts = max_retries + 1).
    pub max_retries: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub retry_interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            retry_interval_ms: 500,
        }
    }
}

/// HTTP transport parameters (`[transport]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    /// Whole-exchange timeout; the only time limit an attempt is subject to.
    pub timeout_secs: u64,
    /// Ask libcurl for HTTP/3 (falls back to HTTP/2 when unsupported).
    pub use_http3: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            timeout_secs: 60,
            use_http3: false,
        }
    }
}

/// Connectivity probe parameters (`[connect_check]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectCheckConfig {
    /// When false the probe always reports "connected" without network access.
    pub enabled: bool,
    /// URLs probed in order with HEAD; the first HTTP answer wins.
    pub urls: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for ConnectCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            urls: vec![
                "https://www.qiniu.com".to_string(),
                "https://www.baidu.com".to_string(),
                "https://www.google.com".to_string(),
            ],
            timeout_ms: 2000,
        }
    }
}

/// Telemetry parameters (`[report]` section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub enabled: bool,
    /// Hand events to a background thread instead of logging inline.
    pub background: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            background: true,
        }
    }
}

/// HTTP(S) proxy used by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// e.g. `http://10.0.0.1:3128` or `socks5://127.0.0.1:1080`.
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Global configuration loaded from `~/.config/uplink/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UplinkConfig {
    /// Successful uploads above this many bytes feed the network-quality table.
    pub network_quality_min_bytes: u64,
    pub retry: RetryConfig,
    pub transport: TransportConfig,
    pub connect_check: ConnectCheckConfig,
    pub report: ReportConfig,
    /// Optional proxy; direct connections when missing.
    pub proxy: Option<ProxyConfig>,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            network_quality_min_bytes: 1024 * 1024,
            retry: RetryConfig::default(),
            transport: TransportConfig::default(),
            connect_check: ConnectCheckConfig::default(),
            report: ReportConfig::default(),
            proxy: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("uplink")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<UplinkConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = UplinkConfig::default();
        let toml = to_toml(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Render a configuration the way it is stored on disk.
pub fn to_toml(cfg: &UplinkConfig) -> Result<String> {
    toml::to_string_pretty(cfg).context("serializing config")
}

/// Load configuration from an explicit file.
pub fn load_from(path: &Path) -> Result<UplinkConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: UplinkConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
