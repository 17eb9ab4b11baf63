//! Retry policy and outcome classification.
//!
//! This module decides whether an attempt outcome may be retried (the
//! descriptor's [`ErrorClassifier`]) and how long to wait before the next
//! attempt ([`RetryPolicy`]). The attempt loop itself lives in
//! [`crate::request::SingleRequest`].

mod classify;
mod policy;

pub use classify::{classify_status, DefaultClassifier, ErrorClassifier};
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
