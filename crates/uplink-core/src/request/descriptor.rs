//! Immutable description of the request every attempt sends.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use crate::error::UplinkError;
use crate::retry::{DefaultClassifier, ErrorClassifier};

/// Where the server IP came from (DNS prefetch provenance), for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSource {
    /// Resolver that produced the IP, e.g. "system", "httpdns", "custom".
    pub source: Option<String>,
    /// Unix time in milliseconds when the IP was prefetched.
    pub prefetched_at_ms: Option<i64>,
    /// Last prefetch failure observed by the resolver.
    pub prefetch_error: Option<String>,
}

/// Upload-level facts attached to telemetry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadContext {
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub file_offset: Option<u64>,
    pub target_region_id: Option<String>,
    pub current_region_id: Option<String>,
    /// Upload kind, e.g. "form", "mkblk", "upload_part".
    pub upload_type: Option<String>,
    /// Caller's eligibility flag for request telemetry.
    pub report_enabled: bool,
}

/// Target and payload of one logical request. Shared read-only by all attempts.
#[derive(Clone)]
pub struct RequestDescriptor {
    pub url: String,
    pub host: String,
    /// Pinned server IP; the transport resolves `host` to it when set.
    pub ip: Option<IpAddr>,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Arc<Vec<u8>>,
    pub http3: bool,
    pub server: ServerSource,
    pub context: UploadContext,
    pub classifier: Arc<dyn ErrorClassifier>,
}

impl RequestDescriptor {
    /// POST `body` to `url`; the host is taken from the URL.
    pub fn new(url: &str, body: Vec<u8>) -> Result<Self, UplinkError> {
        let parsed = url::Url::parse(url).map_err(|source| UplinkError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| UplinkError::MissingHost(url.to_string()))?
            .to_string();
        Ok(Self {
            url: url.to_string(),
            host,
            ip: None,
            method: "POST".to_string(),
            headers: Vec::new(),
            body: Arc::new(body),
            http3: false,
            server: ServerSource::default(),
            context: UploadContext::default(),
            classifier: Arc::new(DefaultClassifier),
        })
    }

    pub fn with_ip(mut self, ip: &str) -> Result<Self, UplinkError> {
        let ip = ip
            .parse::<IpAddr>()
            .map_err(|_| UplinkError::InvalidIp(ip.to_string()))?;
        self.ip = Some(ip);
        Ok(self)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_server_source(mut self, server: ServerSource) -> Self {
        self.server = server;
        self
    }

    pub fn with_context(mut self, context: UploadContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_http3(mut self, http3: bool) -> Self {
        self.http3 = http3;
        self
    }

    /// Port from the URL (scheme default when absent).
    pub fn port(&self) -> Option<u16> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.port_or_known_default())
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("url", &self.url)
            .field("host", &self.host)
            .field("ip", &self.ip)
            .field("method", &self.method)
            .field("body_len", &self.body.len())
            .field("http3", &self.http3)
            .field("server", &self.server)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
