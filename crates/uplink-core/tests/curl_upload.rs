//! End-to-end: libcurl transport against a local scripted upload endpoint.

mod common;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use common::{always_retry, upload_server, Completions};
use serde_json::json;
use uplink_core::config::{ConnectCheckConfig, TransportConfig};
use uplink_core::connect_check::CurlConnectChecker;
use uplink_core::control::RequestState;
use uplink_core::request::{RequestDescriptor, SingleRequest};
use uplink_core::retry::RetryPolicy;
use uplink_core::status;
use uplink_core::transport::CurlTransport;

fn curl_engine(max_retries: u32) -> SingleRequest {
    let transport = TransportConfig {
        connect_timeout_secs: 5,
        timeout_secs: 10,
        use_http3: false,
    };
    let check = ConnectCheckConfig {
        enabled: false,
        ..Default::default()
    };
    SingleRequest::new(
        RetryPolicy {
            max_retries,
            retry_interval: std::time::Duration::from_millis(10),
        },
        Arc::new(CurlTransport::new(&transport)),
        Arc::new(CurlConnectChecker::new(&check)),
        Arc::new(RequestState::default()),
    )
}

#[test]
fn upload_sends_body_and_parses_json_response() {
    let server = upload_server::start(vec![(200, r#"{"hash":"Fh8x","key":"a.bin"}"#.to_string())]);
    let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
    let request = RequestDescriptor::new(&server.url, payload.clone())
        .unwrap()
        .with_header("Authorization", "UpToken test");
    let req = curl_engine(1);
    let done = Completions::new();
    let progressed = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&progressed);

    req.request(
        &request,
        done.handlers()
            .should_retry(always_retry())
            .on_progress(move |written, _| {
                seen.fetch_max(written, Ordering::SeqCst);
            }),
    );

    let c = done.next();
    assert_eq!(c.outcome.status_code(), 200, "outcome: {}", c.outcome.outcome);
    assert_eq!(c.outcome.outcome.request_id.as_deref(), Some("req-1"));
    assert_eq!(c.response, Some(json!({"hash": "Fh8x", "key": "a.bin"})));
    assert_eq!(server.received(), vec![payload.clone()]);

    assert_eq!(c.metrics.len(), 1);
    let m = &c.metrics[0];
    assert!(m.bytes_sent > 0 && m.bytes_sent <= payload.len() as u64);
    assert_eq!(m.total_bytes, payload.len() as u64);
    assert_eq!(m.remote_address.as_deref(), Some("127.0.0.1"));
    assert_eq!(m.client_name.as_deref(), Some("libcurl"));
    assert!(m.total_elapsed().is_some());
    assert!(progressed.load(Ordering::SeqCst) > 0);
}

#[test]
fn client_error_is_final() {
    let server = upload_server::start(vec![(401, r#"{"error":"bad token"}"#.to_string())]);
    let request = RequestDescriptor::new(&server.url, b"data".to_vec()).unwrap();
    let req = curl_engine(3);
    let done = Completions::new();

    req.request(&request, done.handlers().should_retry(always_retry()));

    let c = done.next();
    assert_eq!(c.outcome.status_code(), 401);
    assert_eq!(c.outcome.outcome.error.as_deref(), Some("bad token"));
    assert_eq!(server.received().len(), 1);
}

#[test]
fn server_error_then_success_is_retried() {
    let server = upload_server::start(vec![
        (503, r#"{"error":"busy"}"#.to_string()),
        (200, r#"{"key":"a.bin"}"#.to_string()),
    ]);
    let request = RequestDescriptor::new(&server.url, b"payload".to_vec()).unwrap();
    let req = curl_engine(2);
    let done = Completions::new();

    req.request(&request, done.handlers().should_retry(|o, _| !o.is_ok()));

    let c = done.next();
    assert_eq!(c.outcome.status_code(), 200);
    assert_eq!(c.outcome.outcome.request_id.as_deref(), Some("req-2"));
    assert_eq!(c.metrics.len(), 2);
    assert_eq!(req.retry_count(), 1);
    assert_eq!(server.received().len(), 2);
}

#[test]
fn non_json_success_body_is_a_parse_error() {
    let server = upload_server::start(vec![(200, "<html>proxy login</html>".to_string())]);
    let request = RequestDescriptor::new(&server.url, b"x".to_vec()).unwrap();
    let req = curl_engine(0);
    let done = Completions::new();

    req.request(&request, done.handlers());

    assert_eq!(done.next().outcome.status_code(), status::PARSE_ERROR);
}

#[test]
fn refused_connection_maps_to_cannot_connect() {
    let request = RequestDescriptor::new("http://127.0.0.1:1/upload", b"x".to_vec()).unwrap();
    let req = curl_engine(0);
    let done = Completions::new();

    req.request(&request, done.handlers());

    let c = done.next();
    // The disabled checker reports connected, so no reclassification.
    assert_eq!(c.outcome.status_code(), status::CANNOT_CONNECT_TO_HOST);
    assert!(!c.outcome.is_reclassified());
    assert!(c.metrics[0].connect_check.is_some());
}
