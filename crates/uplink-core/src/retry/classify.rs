//! Classify attempt status codes into retry policy error kinds.

use super::policy::ErrorKind;
use crate::outcome::AttemptOutcome;
use crate::status;

/// Storage service codes that are definitive answers (quota, bad token,
/// object exists, ...); retrying the same request cannot change them.
const DEFINITIVE_SERVICE_CODES: &[i32] = &[501, 573, 579, 608, 612, 614, 616, 619, 630, 631, 640, 701];

/// Decides whether an outcome is retry-eligible at all. Carried by the
/// request descriptor so different request types can tighten the rules.
pub trait ErrorClassifier: Send + Sync {
    fn could_retry(&self, outcome: &AttemptOutcome) -> bool;
}

/// Rules used by upload requests unless the caller supplies its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClassifier;

impl ErrorClassifier for DefaultClassifier {
    fn could_retry(&self, outcome: &AttemptOutcome) -> bool {
        let code = outcome.status_code;
        if DEFINITIVE_SERVICE_CODES.contains(&code) {
            return false;
        }
        match classify_status(code) {
            ErrorKind::Success | ErrorKind::Cancelled | ErrorKind::Local => false,
            ErrorKind::Http4xx(c) => c == 406,
            ErrorKind::Network | ErrorKind::Other => true,
        }
    }
}

/// Classify a status code (HTTP or synthetic) into an ErrorKind.
pub fn classify_status(code: i32) -> ErrorKind {
    match code {
        status::CANCELLED => ErrorKind::Cancelled,
        c if c < -1 && c > -1000 => ErrorKind::Local,
        c if status::is_connectivity_ambiguous(c) || c == status::NETWORK_SLOW => {
            ErrorKind::Network
        }
        200..=299 => ErrorKind::Success,
        400..=499 => ErrorKind::Http4xx(code as u16),
        _ => ErrorKind::Other,
    }
}
