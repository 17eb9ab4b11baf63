//! Per-link network quality table.
//!
//! Successful large uploads feed the measured speed of the link they used,
//! keyed by [`link_type`] (host plus coarse IP prefix), so that host/IP
//! selection elsewhere can prefer faster links. The table is process-local.

mod cache;
mod key;

pub use cache::{NetworkStatus, NetworkStatusCache};
pub use key::link_type;

/// Receiver of opportunistic speed measurements. Best effort: must not block.
pub trait NetworkQualitySink: Send + Sync {
    fn update(&self, link_type: &str, speed_bytes_per_sec: u64);
}
