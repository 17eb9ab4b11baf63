//! Per-attempt timing and byte counters, and the per-request aggregate.

use std::time::{Duration, SystemTime};

use crate::outcome::AttemptOutcome;

/// Timing and byte counters for one attempt, filled in by the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttemptMetrics {
    pub start: Option<SystemTime>,
    pub end: Option<SystemTime>,
    pub dns: Option<Duration>,
    pub connect: Option<Duration>,
    pub tls_handshake: Option<Duration>,
    /// Time spent sending the request (headers and body).
    pub request: Option<Duration>,
    /// Time between the request being sent and the first response byte.
    pub wait: Option<Duration>,
    /// Time spent receiving the response.
    pub response: Option<Duration>,
    pub bytes_sent: u64,
    pub total_bytes: u64,
    pub remote_address: Option<String>,
    pub remote_port: Option<u16>,
    pub client_name: Option<String>,
    pub client_version: Option<String>,
    /// Outcome of the connectivity probe, when one ran for this attempt.
    pub connect_check: Option<AttemptOutcome>,
}

impl AttemptMetrics {
    /// Wall-clock duration from start to end (None if either is missing or end < start).
    pub fn total_elapsed(&self) -> Option<Duration> {
        let (start, end) = (self.start?, self.end?);
        end.duration_since(start).ok()
    }

    /// Upload speed in bytes per second, `bytes * 1000 / millis`.
    /// None when the measured duration is zero.
    pub fn upload_speed(&self) -> Option<u64> {
        let millis = self.total_elapsed()?.as_millis();
        if millis == 0 {
            return None;
        }
        Some((u128::from(self.bytes_sent) * 1000 / millis) as u64)
    }
}

/// Append-only, attempt-ordered list of metrics for one logical request.
#[derive(Debug, Clone, Default)]
pub struct MetricsLog {
    entries: Vec<AttemptMetrics>,
}

impl MetricsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metrics: AttemptMetrics) {
        self.entries.push(metrics);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&AttemptMetrics> {
        self.entries.last()
    }

    /// Copy of all entries in attempt order.
    pub fn snapshot(&self) -> Vec<AttemptMetrics> {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(bytes: u64, millis: u64) -> AttemptMetrics {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        AttemptMetrics {
            start: Some(start),
            end: Some(start + Duration::from_millis(millis)),
            bytes_sent: bytes,
            ..Default::default()
        }
    }

    #[test]
    fn speed_uses_distinct_start_and_end() {
        let m = timed(2 * 1024 * 1024, 2000);
        assert_eq!(m.total_elapsed(), Some(Duration::from_secs(2)));
        assert_eq!(m.upload_speed(), Some(1024 * 1024));
    }

    #[test]
    fn speed_none_for_zero_duration_or_missing_timestamps() {
        assert_eq!(timed(4096, 0).upload_speed(), None);
        let m = AttemptMetrics {
            bytes_sent: 10,
            ..Default::default()
        };
        assert_eq!(m.upload_speed(), None);
    }

    #[test]
    fn log_preserves_insertion_order() {
        let mut log = MetricsLog::new();
        for i in 1..=3 {
            log.push(timed(i, 10));
        }
        let snap = log.snapshot();
        assert_eq!(snap.len(), 3);
        let sent: Vec<u64> = snap.iter().map(|m| m.bytes_sent).collect();
        assert_eq!(sent, vec![1, 2, 3]);
        assert_eq!(log.last().map(|m| m.bytes_sent), Some(3));
    }
}
