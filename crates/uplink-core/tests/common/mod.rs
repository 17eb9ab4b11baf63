//! Test doubles for the request engine: scripted transport, fixed prober,
//! recording telemetry and network-quality sinks.

#![allow(dead_code)]

pub mod upload_server;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, SystemTime};

use serde_json::Value;
use uplink_core::config::ProxyConfig;
use uplink_core::connect_check::ConnectivityProber;
use uplink_core::metrics::AttemptMetrics;
use uplink_core::network_status::NetworkQualitySink;
use uplink_core::outcome::AttemptOutcome;
use uplink_core::report::{ReportEvent, TelemetrySink};
use uplink_core::request::{Completion, RequestDescriptor, RequestHandlers, UploadContext};
use uplink_core::status;
use uplink_core::transport::{AttemptResponse, TransportClient};

/// One scripted attempt.
#[derive(Debug, Clone)]
pub struct Step {
    pub status: i32,
    pub body: Option<Value>,
    pub with_metrics: bool,
    pub bytes_sent: u64,
    pub elapsed: Duration,
}

impl Step {
    pub fn status(status: i32) -> Self {
        Self {
            status,
            body: None,
            with_metrics: true,
            bytes_sent: 16,
            elapsed: Duration::from_millis(5),
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn no_metrics(mut self) -> Self {
        self.with_metrics = false;
        self
    }

    pub fn sent(mut self, bytes: u64, elapsed: Duration) -> Self {
        self.bytes_sent = bytes;
        self.elapsed = elapsed;
        self
    }
}

/// Transport that replays a script. The last step repeats once the script
/// runs out. Optionally emits progress ticks and honours `cancel()` between them.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    ticks: u32,
    tick_delay: Duration,
    cancelled: AtomicBool,
    pub calls: AtomicUsize,
    pub cancels: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            last: Mutex::new(None),
            ticks: 1,
            tick_delay: Duration::ZERO,
            cancelled: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        }
    }

    pub fn always(status: i32) -> Self {
        Self::new(vec![Step::status(status)])
    }

    pub fn with_ticks(mut self, ticks: u32, tick_delay: Duration) -> Self {
        self.ticks = ticks;
        self.tick_delay = tick_delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        let mut last = self.last.lock().unwrap();
        if let Some(step) = self.script.lock().unwrap().pop_front() {
            *last = Some(step);
        }
        last.clone().expect("script must not be empty")
    }
}

fn metrics_for(step: &Step, bytes_sent: u64) -> AttemptMetrics {
    let start = SystemTime::now();
    AttemptMetrics {
        start: Some(start),
        end: Some(start + step.elapsed),
        bytes_sent,
        total_bytes: step.bytes_sent,
        remote_address: Some("127.0.0.1".to_string()),
        remote_port: Some(443),
        client_name: Some("scripted".to_string()),
        ..Default::default()
    }
}

impl TransportClient for ScriptedTransport {
    fn request(
        &self,
        _request: &RequestDescriptor,
        _proxy: Option<&ProxyConfig>,
        progress: &mut dyn FnMut(u64, u64),
    ) -> AttemptResponse {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cancelled.store(false, Ordering::SeqCst);
        let step = self.next_step();

        for i in 1..=self.ticks {
            if !self.tick_delay.is_zero() {
                std::thread::sleep(self.tick_delay);
            }
            let sent = step.bytes_sent * u64::from(i) / u64::from(self.ticks);
            progress(sent, step.bytes_sent);
            if self.cancelled.load(Ordering::SeqCst) {
                return AttemptResponse {
                    outcome: AttemptOutcome::cancelled(),
                    metrics: step.with_metrics.then(|| metrics_for(&step, sent)),
                    body: None,
                };
            }
        }

        let mut outcome = AttemptOutcome::new(step.status);
        if !status::is_ok(step.status) {
            outcome.error = Some(format!("scripted failure {}", step.status));
        }
        AttemptResponse {
            outcome,
            metrics: step.with_metrics.then(|| metrics_for(&step, step.bytes_sent)),
            body: step.body.clone(),
        }
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Prober with a fixed verdict.
pub struct FixedProber {
    connected: bool,
    pub calls: AtomicUsize,
}

impl FixedProber {
    pub fn connected() -> Self {
        Self {
            connected: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn offline() -> Self {
        Self {
            connected: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConnectivityProber for FixedProber {
    fn probe(&self) -> AttemptOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.connected {
            AttemptOutcome::new(200)
        } else {
            AttemptOutcome::error(status::TIMED_OUT, "probe timed out")
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<(ReportEvent, String)>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<(ReportEvent, String)> {
        self.events.lock().unwrap().clone()
    }
}

impl TelemetrySink for RecordingSink {
    fn report(&self, event: &ReportEvent, auth_token: &str) {
        self.events
            .lock()
            .unwrap()
            .push((event.clone(), auth_token.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingQuality {
    pub updates: Mutex<Vec<(String, u64)>>,
}

impl RecordingQuality {
    pub fn updates(&self) -> Vec<(String, u64)> {
        self.updates.lock().unwrap().clone()
    }
}

impl NetworkQualitySink for RecordingQuality {
    fn update(&self, link_type: &str, speed_bytes_per_sec: u64) {
        self.updates
            .lock()
            .unwrap()
            .push((link_type.to_string(), speed_bytes_per_sec));
    }
}

pub fn descriptor(report_enabled: bool) -> RequestDescriptor {
    RequestDescriptor::new("https://up.example.com/upload", vec![7; 16])
        .unwrap()
        .with_context(UploadContext {
            bucket: Some("bucket".to_string()),
            key: Some("object.bin".to_string()),
            report_enabled,
            ..Default::default()
        })
}

/// Collects completions; `handlers()` can be called once per logical request.
pub struct Completions {
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
}

impl Completions {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn handlers(&self) -> RequestHandlers {
        let tx = self.tx.clone();
        RequestHandlers::new(move |c| {
            let _ = tx.send(c);
        })
    }

    /// Next completion, waiting up to five seconds.
    pub fn next(&self) -> Completion {
        self.rx
            .recv_timeout(Duration::from_secs(5))
            .expect("completion should fire")
    }

    /// All completions received so far, without waiting.
    pub fn drain(&self) -> Vec<Completion> {
        self.rx.try_iter().collect()
    }
}

/// Retry predicate that always approves.
pub fn always_retry() -> impl Fn(&AttemptOutcome, Option<&Value>) -> bool + Send + Sync + 'static {
    |_: &AttemptOutcome, _: Option<&Value>| true
}

pub fn arc<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
