//! HTTP transport contract and the libcurl implementation.

mod codes;
mod curl_client;

pub use codes::status_for_curl_error;
pub use curl_client::CurlTransport;

use serde_json::Value;

use crate::config::ProxyConfig;
use crate::metrics::AttemptMetrics;
use crate::outcome::AttemptOutcome;
use crate::request::RequestDescriptor;

/// Terminal result of one transport exchange.
#[derive(Debug, Clone)]
pub struct AttemptResponse {
    pub outcome: AttemptOutcome,
    pub metrics: Option<AttemptMetrics>,
    /// Parsed JSON response body, when the server sent one.
    pub body: Option<Value>,
}

/// One HTTP exchange at a time.
///
/// `request` blocks until the exchange ends and always returns exactly one
/// terminal response, including after `cancel()`. `progress` receives
/// `(bytes_written, bytes_expected)` zero or more times before that.
/// `cancel` may be called from any thread (including from inside `progress`)
/// and must make the in-flight `request` return promptly.
pub trait TransportClient: Send + Sync {
    fn request(
        &self,
        request: &RequestDescriptor,
        proxy: Option<&ProxyConfig>,
        progress: &mut dyn FnMut(u64, u64),
    ) -> AttemptResponse;

    fn cancel(&self);
}
