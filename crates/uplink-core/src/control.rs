//! Cooperative cancellation: per-request cancel flag plus an optional
//! caller-owned signal.
//!
//! Cancellation is level-triggered. The attempt loop checks it before every
//! attempt and during the retry sleep; the progress adapter checks it on every
//! transport progress tick and asks the active transport to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of the cancellable retry sleep.
const CANCEL_POLL_SLICE: Duration = Duration::from_millis(20);

/// Caller-owned cancellation flag (e.g. wired to Ctrl-C or a UI button).
/// Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal(Arc<AtomicBool>);

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Shared cancellation state of one logical request.
#[derive(Debug, Default)]
pub struct RequestState {
    user_cancelled: AtomicBool,
    signal: Option<CancellationSignal>,
}

impl RequestState {
    pub fn new(signal: Option<CancellationSignal>) -> Self {
        Self {
            user_cancelled: AtomicBool::new(false),
            signal,
        }
    }

    /// True once the request itself was cancelled (sticky).
    pub fn is_user_cancelled(&self) -> bool {
        self.user_cancelled.load(Ordering::SeqCst)
    }

    pub fn set_user_cancelled(&self) {
        self.user_cancelled.store(true, Ordering::SeqCst);
    }

    /// Checks the request flag, then the caller's signal. A raised caller
    /// signal is latched into the request flag.
    pub fn check_cancel(&self) -> bool {
        if self.is_user_cancelled() {
            return true;
        }
        let external = self.signal.as_ref().is_some_and(CancellationSignal::is_cancelled);
        if external {
            self.set_user_cancelled();
        }
        external
    }

    /// Sleep for `duration` unless cancellation is observed first.
    /// Returns false when the sleep was cut short.
    pub fn sleep_unless_cancelled(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.check_cancel() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(CANCEL_POLL_SLICE.min(deadline - now));
        }
    }
}
