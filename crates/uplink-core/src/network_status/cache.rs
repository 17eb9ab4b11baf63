//! In-memory speed table keyed by link type.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use super::NetworkQualitySink;

/// Latest observation for one link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkStatus {
    /// Last measured upload speed in bytes per second.
    pub speed_bytes_per_sec: u64,
    pub samples: u32,
    pub updated_at: Instant,
}

/// Process-local network quality table, safe to share across requests.
#[derive(Debug, Default)]
pub struct NetworkStatusCache {
    entries: RwLock<HashMap<String, NetworkStatus>>,
}

impl NetworkStatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the latest observation for a link.
    pub fn get(&self, link_type: &str) -> Option<NetworkStatus> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(link_type)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NetworkQualitySink for NetworkStatusCache {
    fn update(&self, link_type: &str, speed_bytes_per_sec: u64) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(link_type.to_string()).or_insert(NetworkStatus {
            speed_bytes_per_sec,
            samples: 0,
            updated_at: Instant::now(),
        });
        entry.speed_bytes_per_sec = speed_bytes_per_sec;
        entry.samples = entry.samples.saturating_add(1);
        entry.updated_at = Instant::now();
        tracing::debug!("network status {}: {} B/s", link_type, speed_bytes_per_sec);
    }
}
