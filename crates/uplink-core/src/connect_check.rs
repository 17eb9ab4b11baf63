//! Out-of-band connectivity probe.
//!
//! Used after ambiguous transport failures (timeouts, DNS, connect, TLS) to
//! tell "this server is unreachable" apart from "this device is offline or
//! its link is unusable". Uses HEAD requests through libcurl against a small
//! list of well-known URLs.

use std::time::Duration;

use crate::config::ConnectCheckConfig;
use crate::outcome::AttemptOutcome;
use crate::status;
use crate::transport::status_for_curl_error;

/// Secondary connectivity check. `probe` must not retry on its own.
pub trait ConnectivityProber: Send + Sync {
    fn probe(&self) -> AttemptOutcome;

    fn is_connected(&self, outcome: &AttemptOutcome) -> bool {
        outcome.status_code > 99
    }
}

/// Probes the configured check URLs in order; the first one that answers
/// with any HTTP status wins.
#[derive(Debug, Clone)]
pub struct CurlConnectChecker {
    enabled: bool,
    urls: Vec<String>,
    timeout: Duration,
}

impl CurlConnectChecker {
    pub fn new(cfg: &ConnectCheckConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            urls: cfg.urls.clone(),
            timeout: Duration::from_millis(cfg.timeout_ms),
        }
    }

    fn head(&self, url: &str) -> AttemptOutcome {
        match head_request(url, self.timeout) {
            Ok(code) => AttemptOutcome::new(code as i32),
            Err(e) => AttemptOutcome::error(status_for_curl_error(&e), e.to_string()),
        }
    }
}

impl ConnectivityProber for CurlConnectChecker {
    fn probe(&self) -> AttemptOutcome {
        if !self.enabled {
            return AttemptOutcome::new(200);
        }
        let mut last = AttemptOutcome::error(status::NETWORK_ERROR, "no connect check URL configured");
        for url in &self.urls {
            let outcome = self.head(url);
            tracing::debug!("connect check {}: {}", url, outcome);
            if self.is_connected(&outcome) {
                return outcome;
            }
            last = outcome;
        }
        last
    }
}

/// HEAD `url`, returning the HTTP status.
fn head_request(url: &str, timeout: Duration) -> Result<u32, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.nobody(true)?;
    easy.connect_timeout(timeout)?;
    easy.timeout(timeout)?;
    easy.perform()?;
    easy.response_code()
}
