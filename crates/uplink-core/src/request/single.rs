//! Attempt loop for one logical request.
//!
//! `Attempting -> Deciding -> {Retrying, Completing}`: each attempt goes to
//! the transport with a progress adapter that doubles as the cancellation
//! monitor; ambiguous network failures are re-checked with the connectivity
//! prober; the retry policy then either sleeps (cancellably) and loops or
//! hands the final outcome to the completion gate.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::config::{ProxyConfig, UplinkConfig};
use crate::connect_check::{ConnectivityProber, CurlConnectChecker};
use crate::control::RequestState;
use crate::metrics::{AttemptMetrics, MetricsLog};
use crate::network_status::{link_type, NetworkQualitySink};
use crate::outcome::{AttemptOutcome, FinalOutcome};
use crate::report::Reporter;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::status;
use crate::transport::{AttemptResponse, CurlTransport, TransportClient};

use super::RequestDescriptor;

/// `(outcome, response body) -> retry?`, asked once per attempt.
pub type RetryPredicate = Box<dyn Fn(&AttemptOutcome, Option<&Value>) -> bool + Send + Sync>;
/// `(bytes_written, bytes_expected)`.
pub type ProgressHandler = Box<dyn Fn(u64, u64) + Send + Sync>;
pub type CompleteHandler = Box<dyn FnOnce(Completion) + Send>;

/// What the caller receives exactly once per logical request.
#[derive(Debug, Clone)]
pub struct Completion {
    pub outcome: FinalOutcome,
    /// One entry per attempt that produced metrics, in attempt order.
    pub metrics: Vec<AttemptMetrics>,
    pub response: Option<Value>,
}

/// Caller callbacks for one logical request.
pub struct RequestHandlers {
    pub should_retry: Option<RetryPredicate>,
    pub progress: Option<ProgressHandler>,
    pub complete: CompleteHandler,
}

impl RequestHandlers {
    pub fn new(complete: impl FnOnce(Completion) + Send + 'static) -> Self {
        Self {
            should_retry: None,
            progress: None,
            complete: Box::new(complete),
        }
    }

    pub fn should_retry(
        mut self,
        predicate: impl Fn(&AttemptOutcome, Option<&Value>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_retry = Some(Box::new(predicate));
        self
    }

    pub fn on_progress(mut self, progress: impl Fn(u64, u64) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }
}

/// Per-run counters, owned by the run.
#[derive(Debug, Default)]
struct RunState {
    retry_count: u32,
    metrics: MetricsLog,
}

/// Result of the attempt that ended the run.
struct LastAttempt {
    outcome: FinalOutcome,
    body: Option<Value>,
    metrics: Option<AttemptMetrics>,
}

/// Executes logical requests one at a time with retry, cancellation,
/// connectivity fallback, metrics aggregation and reporting.
pub struct SingleRequest {
    policy: RetryPolicy,
    proxy: Option<ProxyConfig>,
    transport: Arc<dyn TransportClient>,
    prober: Arc<dyn ConnectivityProber>,
    quality: Option<(Arc<dyn NetworkQualitySink>, u64)>,
    reporter: Option<Reporter>,
    state: Arc<RequestState>,
    run: Mutex<RunState>,
    /// Set while a logical request is running; taken exactly once by completion.
    active: Mutex<Option<Arc<dyn TransportClient>>>,
}

impl SingleRequest {
    pub fn new(
        policy: RetryPolicy,
        transport: Arc<dyn TransportClient>,
        prober: Arc<dyn ConnectivityProber>,
        state: Arc<RequestState>,
    ) -> Self {
        Self {
            policy,
            proxy: None,
            transport,
            prober,
            quality: None,
            reporter: None,
            state,
            run: Mutex::new(RunState::default()),
            active: Mutex::new(None),
        }
    }

    /// libcurl transport and connectivity checker configured from `cfg`.
    pub fn from_config(cfg: &UplinkConfig, state: Arc<RequestState>) -> Self {
        Self::new(
            RetryPolicy::from(&cfg.retry),
            Arc::new(CurlTransport::new(&cfg.transport)),
            Arc::new(CurlConnectChecker::new(&cfg.connect_check)),
            state,
        )
        .with_proxy(cfg.proxy.clone())
    }

    pub fn with_proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Feed successful uploads larger than `min_bytes` into `sink`.
    pub fn with_network_quality(mut self, sink: Arc<dyn NetworkQualitySink>, min_bytes: u64) -> Self {
        self.quality = Some((sink, min_bytes));
        self
    }

    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn state(&self) -> &Arc<RequestState> {
        &self.state
    }

    /// Request cancellation from any thread: latches the cancel flag and asks
    /// the in-flight transport (if any) to stop.
    pub fn cancel(&self) {
        self.state.set_user_cancelled();
        if let Some(client) = self.lock_active().as_ref() {
            client.cancel();
        }
    }

    /// Run a logical request on the current thread. `handlers.complete` has
    /// been called exactly once when this returns.
    pub fn request(&self, request: &RequestDescriptor, handlers: RequestHandlers) {
        let RequestHandlers {
            should_retry,
            progress,
            complete,
        } = handlers;

        if !self.begin() {
            tracing::warn!("request to {} rejected: another request is in flight", request.url);
            complete(Completion {
                outcome: FinalOutcome::unchanged(AttemptOutcome::error(
                    status::INVALID_ARGUMENT,
                    "a request is already in flight",
                )),
                metrics: Vec::new(),
                response: None,
            });
            return;
        }

        let key = request.context.key.as_deref().unwrap_or("");
        let mut last: Option<LastAttempt> = None;
        loop {
            if self.state.check_cancel() {
                tracing::info!("key:{} cancelled before next attempt", key);
                break;
            }

            let retry_count = self.lock_run().retry_count;
            tracing::info!(
                "key:{} retry:{} url:{} ip:{}",
                key,
                retry_count,
                request.url,
                request.ip.map(|ip| ip.to_string()).unwrap_or_default()
            );

            let AttemptResponse {
                outcome,
                metrics,
                body,
            } = self.attempt(request, progress.as_deref());
            let (fin, metrics) = self.check_connectivity(outcome, metrics);
            if let Some(m) = &metrics {
                self.record_quality(request, &fin, m);
                self.lock_run().metrics.push(m.clone());
            }
            tracing::info!("key:{} response:{}", key, fin.outcome);

            let approved = should_retry
                .as_ref()
                .is_some_and(|f| f(&fin.outcome, body.as_ref()));
            let eligible = approved
                && request.classifier.could_retry(&fin.outcome)
                && !self.state.check_cancel();
            let decision = self.policy.decide(retry_count, eligible);
            last = Some(LastAttempt {
                outcome: fin,
                body,
                metrics,
            });

            match decision {
                RetryDecision::NoRetry => break,
                RetryDecision::RetryAfter(delay) => {
                    if !self.state.sleep_unless_cancelled(delay) {
                        tracing::info!("key:{} cancelled during retry delay", key);
                        break;
                    }
                    self.lock_run().retry_count += 1;
                }
            }
        }

        let last = last.unwrap_or(LastAttempt {
            outcome: FinalOutcome::unchanged(AttemptOutcome::cancelled()),
            body: None,
            metrics: None,
        });
        self.complete(request, last, complete);
    }

    /// Run a logical request on a dedicated worker thread.
    pub fn spawn(
        self: &Arc<Self>,
        request: Arc<RequestDescriptor>,
        handlers: RequestHandlers,
    ) -> Result<JoinHandle<()>> {
        let this = Arc::clone(self);
        thread::Builder::new()
            .name("uplink-request".to_string())
            .spawn(move || this.request(&request, handlers))
            .context("spawning request thread")
    }

    /// Number of retries performed by the current (or last) logical request.
    pub fn retry_count(&self) -> u32 {
        self.lock_run().retry_count
    }

    /// Start a fresh logical request: reset counters and claim the active slot.
    fn begin(&self) -> bool {
        let mut active = self.lock_active();
        if active.is_some() {
            return false;
        }
        *active = Some(Arc::clone(&self.transport));
        let mut run = self.lock_run();
        run.retry_count = 0;
        run.metrics = MetricsLog::new();
        true
    }

    fn attempt(
        &self,
        request: &RequestDescriptor,
        progress: Option<&(dyn Fn(u64, u64) + Send + Sync)>,
    ) -> AttemptResponse {
        let mut monitor = |written: u64, expected: u64| {
            if self.state.check_cancel() {
                self.cancel();
            } else if let Some(p) = progress {
                p(written, expected);
            }
        };
        self.transport
            .request(request, self.proxy.as_ref(), &mut monitor)
    }

    /// Probe connectivity after an ambiguous failure and rewrite the outcome
    /// to `NETWORK_SLOW` when the probe says we are offline.
    fn check_connectivity(
        &self,
        outcome: AttemptOutcome,
        metrics: Option<AttemptMetrics>,
    ) -> (FinalOutcome, Option<AttemptMetrics>) {
        if !status::is_connectivity_ambiguous(outcome.status_code) {
            return (FinalOutcome::unchanged(outcome), metrics);
        }
        let probe = self.prober.probe();
        let connected = self.prober.is_connected(&probe);
        tracing::debug!("connect check after {}: {} (connected: {})", outcome, probe, connected);
        let metrics = metrics.map(|mut m| {
            m.connect_check = Some(probe);
            m
        });
        let fin = if connected {
            FinalOutcome::unchanged(outcome)
        } else {
            FinalOutcome::network_slow(outcome)
        };
        (fin, metrics)
    }

    fn record_quality(&self, request: &RequestDescriptor, fin: &FinalOutcome, m: &AttemptMetrics) {
        let Some((sink, min_bytes)) = &self.quality else {
            return;
        };
        if !fin.outcome.is_ok() || m.bytes_sent <= *min_bytes {
            return;
        }
        if let Some(speed) = m.upload_speed() {
            sink.update(&link_type(request.ip, &request.host), speed);
        }
    }

    /// Completion gate: only the caller that takes the active handle proceeds.
    fn complete(&self, request: &RequestDescriptor, last: LastAttempt, on_complete: CompleteHandler) {
        if self.lock_active().take().is_none() {
            return;
        }
        let metrics = self.lock_run().metrics.snapshot();
        on_complete(Completion {
            outcome: last.outcome.clone(),
            metrics,
            response: last.body,
        });
        if let Some(reporter) = &self.reporter {
            reporter.report(&last.outcome, request, last.metrics.as_ref());
        }
    }

    fn lock_run(&self) -> MutexGuard<'_, RunState> {
        self.run.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<Arc<dyn TransportClient>>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}
