//! Typed errors for request setup.

use thiserror::Error;

/// Failure building a request descriptor or one of the engine's collaborators.
#[derive(Debug, Error)]
pub enum UplinkError {
    #[error("invalid request URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request URL has no host: {0}")]
    MissingHost(String),
    #[error("invalid IP address {0:?}")]
    InvalidIp(String),
}
