use std::time::Duration;

use crate::config::RetryConfig;

/// Retry-relevant class of an attempt status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 2xx response.
    Success,
    /// The request was cancelled by the caller.
    Cancelled,
    /// Local failure or rejected response body (`-1000 < code < -1`).
    Local,
    /// HTTP 4xx.
    Http4xx(u16),
    /// Transport-level failure, including TLS and `NETWORK_SLOW`.
    Network,
    /// 5xx, parse errors and service-specific codes.
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry; complete with the current outcome.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Fixed-interval retry policy with an attempt ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries (attempts = max_retries + 1).
    pub max_retries: u32,
    /// Delay between two attempts.
    pub retry_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            retry_interval: Duration::from_millis(cfg.retry_interval_ms),
        }
    }
}

impl RetryPolicy {
    /// Decide whether another attempt may start.
    ///
    /// `retries_done` is the number of retries already performed (0 after the
    /// first attempt). `eligible` is the combined verdict of the caller's
    /// predicate and the outcome classifier.
    pub fn decide(&self, retries_done: u32, eligible: bool) -> RetryDecision {
        if !eligible || retries_done >= self.max_retries {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.retry_interval)
    }
}
