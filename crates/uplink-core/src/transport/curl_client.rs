//! Blocking libcurl upload client.
//!
//! Sends the descriptor body in one POST (or custom method), pins the host to
//! the selected IP when one is given, reports upload progress, and aborts from
//! the progress callback once `cancel()` has been called.

use std::net::IpAddr;
use std::str;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use curl::easy::{Easy, HttpVersion, List};
use serde_json::Value;

use super::codes::status_for_curl_error;
use super::{AttemptResponse, TransportClient};
use crate::config::{ProxyConfig, TransportConfig};
use crate::metrics::AttemptMetrics;
use crate::outcome::AttemptOutcome;
use crate::request::RequestDescriptor;
use crate::status;

const REQUEST_ID_HEADER: &str = "x-reqid";
/// Longest non-JSON error body copied into an outcome.
const MAX_ERROR_BODY: usize = 512;

/// libcurl-backed [`TransportClient`]. One exchange at a time.
#[derive(Debug)]
pub struct CurlTransport {
    connect_timeout: Duration,
    timeout: Duration,
    cancelled: AtomicBool,
}

impl CurlTransport {
    pub fn new(cfg: &TransportConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
            cancelled: AtomicBool::new(false),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn perform(
        &self,
        easy: &mut Easy,
        request: &RequestDescriptor,
        proxy: Option<&ProxyConfig>,
        progress: &mut dyn FnMut(u64, u64),
        headers: &mut Vec<String>,
        body: &mut Vec<u8>,
        bytes_sent: &mut u64,
    ) -> Result<(), curl::Error> {
        easy.url(&request.url)?;
        easy.post(true)?;
        easy.post_fields_copy(&request.body)?;
        if !request.method.eq_ignore_ascii_case("POST") {
            easy.custom_request(&request.method)?;
        }
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        easy.progress(true)?;

        if let (Some(ip), Some(port)) = (request.ip, request.port()) {
            let addr = match ip {
                IpAddr::V6(v6) => format!("[{}]", v6),
                IpAddr::V4(v4) => v4.to_string(),
            };
            let mut resolve = List::new();
            resolve.append(&format!("{}:{}:{}", request.host, port, addr))?;
            easy.resolve(resolve)?;
        }

        if let Some(p) = proxy {
            easy.proxy(&p.url)?;
            if let Some(user) = &p.username {
                easy.proxy_username(user)?;
            }
            if let Some(pass) = &p.password {
                easy.proxy_password(pass)?;
            }
        }

        if request.http3 {
            if let Err(e) = easy.http_version(HttpVersion::V3) {
                tracing::debug!("HTTP/3 unavailable, using libcurl default: {}", e);
            }
        }

        let mut list = List::new();
        // Suppress `Expect: 100-continue`; bodies are sent in one go.
        list.append("Expect:")?;
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;

        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                headers.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.progress_function(|_dltotal, _dlnow, ultotal, ulnow| {
            let sent = ulnow as u64;
            *bytes_sent = sent;
            progress(sent, ultotal as u64);
            !self.cancelled.load(Ordering::SeqCst)
        })?;
        transfer.perform()
    }
}

impl TransportClient for CurlTransport {
    fn request(
        &self,
        request: &RequestDescriptor,
        proxy: Option<&ProxyConfig>,
        progress: &mut dyn FnMut(u64, u64),
    ) -> AttemptResponse {
        self.cancelled.store(false, Ordering::SeqCst);

        let mut metrics = AttemptMetrics {
            start: Some(SystemTime::now()),
            total_bytes: request.body.len() as u64,
            client_name: Some("libcurl".to_string()),
            client_version: Some(curl::Version::get().version().to_string()),
            ..Default::default()
        };
        let mut easy = Easy::new();
        let mut headers = Vec::new();
        let mut body = Vec::new();
        let mut bytes_sent = 0u64;

        let result = self.perform(
            &mut easy,
            request,
            proxy,
            progress,
            &mut headers,
            &mut body,
            &mut bytes_sent,
        );
        metrics.end = Some(SystemTime::now());
        metrics.bytes_sent = bytes_sent;
        fill_timings(&mut easy, &mut metrics);

        let outcome = match result {
            Err(e) => {
                let code = status_for_curl_error(&e);
                tracing::debug!("transfer to {} failed: {} (status {})", request.url, e, code);
                AttemptOutcome::error(code, e.to_string())
            }
            Ok(()) => match easy.response_code() {
                Ok(code) => {
                    let request_id = find_header(&headers, REQUEST_ID_HEADER);
                    let (outcome, json) = response_outcome(code as i32, &body);
                    return AttemptResponse {
                        outcome: outcome.with_request_id(request_id),
                        metrics: Some(metrics),
                        body: json,
                    };
                }
                Err(e) => AttemptOutcome::error(status::NETWORK_ERROR, e.to_string()),
            },
        };
        AttemptResponse {
            outcome,
            metrics: Some(metrics),
            body: None,
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Build the outcome for an HTTP response: parse a JSON body and pull the
/// server's `error` field into the outcome.
fn response_outcome(code: i32, body: &[u8]) -> (AttemptOutcome, Option<Value>) {
    let json: Option<Value> = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(body).ok()
    };

    if status::is_ok(code) {
        if json.is_none() && !body.is_empty() {
            return (
                AttemptOutcome::error(status::PARSE_ERROR, "response body is not JSON"),
                None,
            );
        }
        return (AttemptOutcome::new(code), json);
    }

    let mut outcome = AttemptOutcome::new(code);
    outcome.error = match json.as_ref().and_then(|v| v.get("error")).and_then(Value::as_str) {
        Some(e) => Some(e.to_string()),
        None if !body.is_empty() => {
            let text = String::from_utf8_lossy(body);
            Some(text.chars().take(MAX_ERROR_BODY).collect())
        }
        None => None,
    };
    (outcome, json)
}

/// Last value of a response header (case-insensitive), across all header blocks.
fn find_header(lines: &[String], name: &str) -> Option<String> {
    lines
        .iter()
        .filter_map(|line| line.split_once(':'))
        .filter(|(k, _)| k.trim().eq_ignore_ascii_case(name))
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .last()
}

/// Convert libcurl's cumulative timers into per-phase durations.
///
/// libcurl does not expose when the request body finished uploading, so body
/// upload time is part of `wait` (pretransfer to first response byte).
fn fill_timings(easy: &mut Easy, m: &mut AttemptMetrics) {
    let dns = easy.namelookup_time().ok();
    let connect = easy.connect_time().ok();
    let tls = easy.appconnect_time().ok().filter(|t| !t.is_zero());
    let pretransfer = easy.pretransfer_time().ok();
    let first_byte = easy.starttransfer_time().ok();
    let total = easy.total_time().ok();

    m.dns = dns;
    m.connect = delta(connect, dns);
    m.tls_handshake = tls.and_then(|t| delta(Some(t), connect));
    m.request = delta(pretransfer, tls.or(connect));
    m.wait = delta(first_byte, pretransfer);
    m.response = delta(total, first_byte);

    m.remote_address = easy
        .primary_ip()
        .ok()
        .flatten()
        .filter(|ip| !ip.is_empty())
        .map(str::to_string);
    m.remote_port = easy.primary_port().ok().filter(|p| *p != 0);
}

fn delta(later: Option<Duration>, earlier: Option<Duration>) -> Option<Duration> {
    later?.checked_sub(earlier?)
}
