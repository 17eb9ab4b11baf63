//! Request telemetry: one flat event per logical request.
//!
//! The event is built from the final outcome, the last attempt's metrics, the
//! request descriptor and ambient process facts, then handed to a
//! [`TelemetrySink`] keyed by the caller's auth token. Values that are not
//! known are left out of the event rather than reported as zero.

mod ambient;
mod sink;

pub use ambient::{AmbientFacts, SystemFacts};
pub use sink::{LogSink, QueuedSink, TelemetrySink};

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::metrics::AttemptMetrics;
use crate::outcome::FinalOutcome;
use crate::request::RequestDescriptor;
use crate::status;

pub const LOG_TYPE_REQUEST: &str = "request";

/// Flat telemetry record for one logical request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportEvent {
    pub log_type: String,
    /// Unix time in seconds.
    pub up_time: i64,
    pub status_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_id: Option<String>,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_elapsed_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_elapsed_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_elapsed_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_connect_elapsed_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_elapsed_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_elapsed_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_elapsed_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_offset: Option<u64>,
    pub bytes_sent: u64,
    pub bytes_total: u64,
    pub pid: u32,
    pub tid: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_region_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_region_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up_type: Option<String>,
    pub os_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    pub sdk_name: String,
    pub sdk_version: String,
    /// Unix time in milliseconds.
    pub client_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefetched_dns_source: Option<String>,
    /// How long before the report the server IP was prefetched, in ms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefetched_before: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefetched_error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_client_version: Option<String>,
    /// Transport status before a negative connectivity probe rewrote it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_status_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_check_status_code: Option<i32>,
}

fn millis(d: Option<Duration>) -> Option<u64> {
    d.map(|d| d.as_millis() as u64)
}

/// Assemble the event for a finished request.
pub fn build_report(
    fin: &FinalOutcome,
    request: &RequestDescriptor,
    metrics: &AttemptMetrics,
    facts: &dyn AmbientFacts,
) -> ReportEvent {
    let now = facts.now_millis();
    let outcome = &fin.outcome;
    let error_type = status::error_type_label(outcome.status_code);
    let error_description = error_type
        .and_then(|_| outcome.description())
        .map(str::to_string);
    let ctx = &request.context;

    ReportEvent {
        log_type: LOG_TYPE_REQUEST.to_string(),
        up_time: now / 1000,
        status_code: outcome.status_code,
        req_id: outcome.request_id.clone(),
        host: request.host.clone(),
        remote_ip: metrics.remote_address.clone(),
        port: metrics.remote_port,
        target_bucket: ctx.bucket.clone(),
        target_key: ctx.key.clone(),
        total_elapsed_time: millis(metrics.total_elapsed()),
        dns_elapsed_time: millis(metrics.dns),
        connect_elapsed_time: millis(metrics.connect),
        tls_connect_elapsed_time: millis(metrics.tls_handshake),
        request_elapsed_time: millis(metrics.request),
        wait_elapsed_time: millis(metrics.wait),
        response_elapsed_time: millis(metrics.response),
        file_offset: ctx.file_offset,
        bytes_sent: metrics.bytes_sent,
        bytes_total: metrics.total_bytes,
        pid: facts.process_id(),
        tid: facts.thread_id(),
        target_region_id: ctx.target_region_id.clone(),
        current_region_id: ctx.current_region_id.clone(),
        error_type: error_type.map(str::to_string),
        error_description,
        up_type: ctx.upload_type.clone(),
        os_name: facts.os_name(),
        os_version: facts.os_version(),
        sdk_name: facts.sdk_name(),
        sdk_version: facts.sdk_version(),
        client_time: now,
        network_type: facts.network_type(),
        signal_strength: facts.signal_strength(),
        prefetched_dns_source: request.server.source.clone(),
        prefetched_before: request.server.prefetched_at_ms.map(|at| now - at),
        prefetched_error_message: request.server.prefetch_error.clone(),
        http_client: metrics.client_name.clone(),
        http_client_version: metrics.client_version.clone(),
        origin_status_code: fin.reclassified_from.as_ref().map(|o| o.status_code),
        connect_check_status_code: metrics.connect_check.as_ref().map(|o| o.status_code),
    }
}

/// Sink, ambient facts and auth token for one uploader.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn TelemetrySink>,
    facts: Arc<dyn AmbientFacts>,
    auth_token: String,
}

impl Reporter {
    pub fn new(
        sink: Arc<dyn TelemetrySink>,
        facts: Arc<dyn AmbientFacts>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            sink,
            facts,
            auth_token: auth_token.into(),
        }
    }

    /// Build and hand off the event if the request is eligible. Returns
    /// whether an event was emitted.
    pub fn report(
        &self,
        fin: &FinalOutcome,
        request: &RequestDescriptor,
        last_metrics: Option<&AttemptMetrics>,
    ) -> bool {
        if self.auth_token.is_empty() || !request.context.report_enabled {
            return false;
        }
        let Some(metrics) = last_metrics else {
            return false;
        };
        let event = build_report(fin, request, metrics, self.facts.as_ref());
        self.sink.report(&event, &self.auth_token);
        true
    }
}
