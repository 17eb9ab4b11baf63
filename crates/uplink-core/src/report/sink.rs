//! Telemetry sinks. Reporting is advisory: sinks swallow their own failures.

use std::sync::mpsc;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};

use super::ReportEvent;

/// Fire-and-forget consumer of report events.
pub trait TelemetrySink: Send + Sync {
    fn report(&self, event: &ReportEvent, auth_token: &str);
}

/// Emits each event as one JSON line on the `uplink::report` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn report(&self, event: &ReportEvent, auth_token: &str) {
        match serde_json::to_string(event) {
            Ok(json) => tracing::info!(
                target: "uplink::report",
                token_len = auth_token.len(),
                "{}",
                json
            ),
            Err(e) => tracing::warn!("failed to serialize report event: {}", e),
        }
    }
}

/// Hands events to a background thread so `report` never waits on the
/// inner sink's I/O. Call [`QueuedSink::close`] before exit to flush.
pub struct QueuedSink {
    tx: Mutex<Option<mpsc::Sender<(ReportEvent, String)>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueuedSink {
    pub fn spawn<S>(inner: S) -> Result<Self>
    where
        S: TelemetrySink + 'static,
    {
        let (tx, rx) = mpsc::channel::<(ReportEvent, String)>();
        let worker = thread::Builder::new()
            .name("uplink-report".to_string())
            .spawn(move || {
                for (event, token) in rx {
                    inner.report(&event, &token);
                }
            })
            .context("spawning report thread")?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Stop accepting events and wait until every queued one was delivered.
    /// Later `report` calls are dropped with a warning.
    pub fn close(&self) {
        drop(self.tx.lock().unwrap_or_else(|e| e.into_inner()).take());
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::warn!("report thread panicked");
            }
        }
    }
}

impl TelemetrySink for QueuedSink {
    fn report(&self, event: &ReportEvent, auth_token: &str) {
        let tx = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        let sent = tx
            .as_ref()
            .is_some_and(|tx| tx.send((event.clone(), auth_token.to_string())).is_ok());
        if !sent {
            tracing::warn!("report queue closed; dropping event");
        }
    }
}
