//! Attempt outcomes and the connectivity reclassification wrapper.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::status;

/// Result of one attempt (or of one connectivity probe).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    pub status_code: i32,
    /// Machine-readable error (server `error` field or transport error text).
    pub error: Option<String>,
    /// Human-oriented detail, e.g. the reclassification diagnostic.
    pub message: Option<String>,
    /// Server-assigned request id (`X-Reqid`), when a response arrived.
    pub request_id: Option<String>,
}

impl AttemptOutcome {
    pub fn new(status_code: i32) -> Self {
        Self {
            status_code,
            error: None,
            message: None,
            request_id: None,
        }
    }

    /// Outcome for a failure that never produced a server response.
    pub fn error(status_code: i32, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status_code,
            error: Some(message.clone()),
            message: Some(message),
            request_id: None,
        }
    }

    pub fn cancelled() -> Self {
        Self::error(status::CANCELLED, "cancelled by user")
    }

    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn is_ok(&self) -> bool {
        status::is_ok(self.status_code)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status_code == status::CANCELLED
    }

    /// Error string, falling back to the message.
    pub fn description(&self) -> Option<&str> {
        self.error.as_deref().or(self.message.as_deref())
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status:{}", self.status_code)?;
        if let Some(id) = &self.request_id {
            write!(f, " reqId:{}", id)?;
        }
        if let Some(desc) = self.description() {
            write!(f, " error:{}", desc)?;
        }
        Ok(())
    }
}

/// Outcome handed to the caller: the effective outcome and, when the
/// connectivity probe rewrote it, the outcome the transport actually produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalOutcome {
    pub outcome: AttemptOutcome,
    pub reclassified_from: Option<AttemptOutcome>,
}

impl FinalOutcome {
    pub fn unchanged(outcome: AttemptOutcome) -> Self {
        Self {
            outcome,
            reclassified_from: None,
        }
    }

    /// Rewrite an ambiguous transport failure to `NETWORK_SLOW`, keeping the
    /// original for the report.
    pub fn network_slow(original: AttemptOutcome) -> Self {
        let message = format!(
            "check origin statusCode:{} error:{}",
            original.status_code,
            original.error.as_deref().unwrap_or("null")
        );
        Self {
            outcome: AttemptOutcome::error(status::NETWORK_SLOW, message),
            reclassified_from: Some(original),
        }
    }

    pub fn status_code(&self) -> i32 {
        self.outcome.status_code
    }

    pub fn is_reclassified(&self) -> bool {
        self.reclassified_from.is_some()
    }
}
