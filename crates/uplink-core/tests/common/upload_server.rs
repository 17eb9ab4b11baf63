//! Minimal HTTP/1.1 upload endpoint for integration tests.
//!
//! Accepts any request with a `Content-Length` body, records the body, and
//! answers with the next scripted `(status, json)` response (the last one
//! repeats once the script runs out). Every response carries
//! `X-Reqid: req-<n>` where n counts requests from 1.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub struct UploadServer {
    pub url: String,
    received: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl UploadServer {
    /// Bodies received so far, in arrival order.
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start(responses: Vec<(u16, String)>) -> UploadServer {
    assert!(!responses.is_empty(), "need at least one scripted response");
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let received = Arc::new(Mutex::new(Vec::new()));
    let received_srv = Arc::clone(&received);
    thread::spawn(move || {
        let mut served = 0usize;
        for stream in listener.incoming().flatten() {
            let (status, body) = responses[served.min(responses.len() - 1)].clone();
            served += 1;
            handle(stream, status, &body, served, &received_srv);
        }
    });
    UploadServer {
        url: format!("http://127.0.0.1:{}/upload", port),
        received,
    }
}

fn handle(
    mut stream: TcpStream,
    status: u16,
    body: &str,
    request_no: usize,
    received: &Mutex<Vec<Vec<u8>>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(upload) = read_request_body(&mut stream) else {
        return;
    };
    received.lock().unwrap().push(upload);
    let response = format!(
        "HTTP/1.1 {} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\
X-Reqid: req-{}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        request_no,
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

/// Reads headers, then exactly `Content-Length` body bytes.
fn read_request_body(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    let header_end = loop {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = std::str::from_utf8(&data[..header_end]).ok()?;
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buf[..n]);
    }
    Some(body)
}
