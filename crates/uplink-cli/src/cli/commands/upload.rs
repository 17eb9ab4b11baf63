//! `uplink upload` – send one file as a single request body.

use anyhow::{anyhow, bail, Context, Result};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Instant;
use uplink_core::config::{ReportConfig, UplinkConfig};
use uplink_core::control::{CancellationSignal, RequestState};
use uplink_core::metrics::AttemptMetrics;
use uplink_core::network_status::{link_type, NetworkStatusCache};
use uplink_core::report::{LogSink, QueuedSink, Reporter, SystemFacts, TelemetrySink};
use uplink_core::request::{
    Completion, RequestDescriptor, RequestHandlers, SingleRequest, UploadContext,
};

use crate::cli::UploadArgs;

const PROGRESS_INTERVAL_MS: u128 = 500;

pub async fn run_upload(cfg: &UplinkConfig, args: UploadArgs) -> Result<()> {
    let body = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    if body.is_empty() {
        bail!("{} is empty; nothing to upload", args.file.display());
    }
    let request = build_request(cfg, &args, body)?;

    let mut cfg = cfg.clone();
    if let Some(n) = args.retries {
        cfg.retry.max_retries = n;
    }

    let signal = CancellationSignal::new();
    let state = Arc::new(RequestState::new(Some(signal.clone())));
    let quality = Arc::new(NetworkStatusCache::new());
    let mut engine = SingleRequest::from_config(&cfg, state)
        .with_network_quality(quality.clone(), cfg.network_quality_min_bytes);
    let mut report_queue = None;
    if let Some(token) = args.token.as_deref() {
        if cfg.report.enabled {
            let (reporter, queue) = reporter(&cfg.report, token)?;
            engine = engine.with_reporter(reporter);
            report_queue = queue;
        }
    }
    let engine = Arc::new(engine);

    let interrupt = {
        let signal = signal.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, cancelling upload");
                eprintln!("\ncancelling...");
                signal.cancel();
            }
        })
    };

    let link = link_type(request.ip, &request.host);
    let started = Instant::now();
    let completion = tokio::task::spawn_blocking(move || upload_blocking(&engine, &request))
        .await
        .context("upload task panicked")??;
    interrupt.abort();
    eprintln!();
    if let Some(queue) = report_queue {
        tokio::task::spawn_blocking(move || queue.close())
            .await
            .context("report flush panicked")?;
    }

    print_completion(&completion, started);
    if let Some(status) = quality.get(&link) {
        println!("link {}: {} B/s", link, status.speed_bytes_per_sec);
    }

    let outcome = &completion.outcome.outcome;
    if !outcome.is_ok() {
        bail!("upload failed: {}", outcome);
    }
    Ok(())
}

fn build_request(cfg: &UplinkConfig, args: &UploadArgs, body: Vec<u8>) -> Result<RequestDescriptor> {
    let key = args.key.clone().or_else(|| {
        args.file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    });
    let mut request = RequestDescriptor::new(&args.url, body)?
        .with_http3(cfg.transport.use_http3 || args.http3)
        .with_context(UploadContext {
            key,
            upload_type: Some("form".to_string()),
            report_enabled: cfg.report.enabled,
            ..Default::default()
        });
    if let Some(ip) = &args.ip {
        request = request.with_ip(ip)?;
    }
    if let Some(token) = &args.token {
        request = request.with_header("Authorization", format!("UpToken {}", token));
    }
    for raw in &args.headers {
        let (name, value) = parse_header(raw)?;
        request = request.with_header(name, value);
    }
    Ok(request)
}

/// Parse `Name: value` (whitespace around either part is ignored).
pub(crate) fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header {:?} is not NAME:VALUE", raw))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        bail!("invalid header name in {:?}", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Reporter for this upload. With `background` the returned queue must be
/// closed before exit so the event is not lost.
fn reporter(cfg: &ReportConfig, token: &str) -> Result<(Reporter, Option<Arc<QueuedSink>>)> {
    if !cfg.background {
        return Ok((Reporter::new(Arc::new(LogSink), Arc::new(SystemFacts), token), None));
    }
    let queue = Arc::new(QueuedSink::spawn(LogSink)?);
    let sink: Arc<dyn TelemetrySink> = queue.clone();
    Ok((Reporter::new(sink, Arc::new(SystemFacts), token), Some(queue)))
}

/// Runs the request on the calling (blocking) thread and returns its completion.
fn upload_blocking(engine: &SingleRequest, request: &RequestDescriptor) -> Result<Completion> {
    let (tx, rx) = mpsc::channel();
    let last_print = Mutex::new(None::<Instant>);
    let handlers = RequestHandlers::new(move |c| {
        let _ = tx.send(c);
    })
    // The classifier drops fatal statuses; everything else is worth another try.
    .should_retry(|outcome, _| !outcome.is_ok())
    .on_progress(move |written, expected| {
        let mut last = last_print.lock().unwrap_or_else(|e| e.into_inner());
        let due = last.map_or(true, |t| t.elapsed().as_millis() >= PROGRESS_INTERVAL_MS);
        if due || (expected > 0 && written >= expected) {
            let pct = if expected > 0 {
                written as f64 * 100.0 / expected as f64
            } else {
                0.0
            };
            eprint!("\r  {} / {} bytes ({:.1}%)  ", written, expected, pct);
            *last = Some(Instant::now());
        }
    });
    engine.request(request, handlers);
    rx.recv().context("request finished without a completion")
}

fn print_completion(completion: &Completion, started: Instant) {
    let fin = &completion.outcome;
    println!("status: {}", fin.outcome);
    if let Some(origin) = &fin.reclassified_from {
        println!("  reclassified from: {}", origin);
    }
    if let Some(id) = &fin.outcome.request_id {
        println!("request id: {}", id);
    }
    if let Some(body) = &completion.response {
        match serde_json::to_string_pretty(body) {
            Ok(s) => println!("response: {}", s),
            Err(_) => println!("response: {}", body),
        }
    }
    println!(
        "{} attempt(s) in {:.2}s",
        completion.metrics.len(),
        started.elapsed().as_secs_f64()
    );
    println!(
        "{:<4} {:<10} {:<12} {:<24} {}",
        "#", "ELAPSED", "SENT", "REMOTE", "CHECK"
    );
    for (i, m) in completion.metrics.iter().enumerate() {
        print_attempt(i + 1, m);
    }
}

fn print_attempt(n: usize, m: &AttemptMetrics) {
    let elapsed = m
        .total_elapsed()
        .map(|d| format!("{}ms", d.as_millis()))
        .unwrap_or_else(|| "-".to_string());
    let remote = match (&m.remote_address, m.remote_port) {
        (Some(addr), Some(port)) => format!("{}:{}", addr, port),
        (Some(addr), None) => addr.clone(),
        _ => "-".to_string(),
    };
    let check = m
        .connect_check
        .as_ref()
        .map(|o| o.status_code.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<4} {:<10} {:<12} {:<24} {}",
        n, elapsed, m.bytes_sent, remote, check
    );
}
