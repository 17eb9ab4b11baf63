//! Status codes shared by every layer of the request engine.
//!
//! Positive values are HTTP status codes returned by the endpoint. Negative
//! values are synthetic: local validation failures (-1..-999) and transport
//! failures (-1000 and below) mapped from the HTTP client.

pub const NETWORK_ERROR: i32 = -1;
pub const CANCELLED: i32 = -2;
pub const INVALID_FILE: i32 = -3;
pub const INVALID_ARGUMENT: i32 = -4;
pub const INVALID_TOKEN: i32 = -5;
pub const ZERO_SIZE_FILE: i32 = -6;
pub const LOCAL_IO_ERROR: i32 = -7;
pub const MALICIOUS_RESPONSE: i32 = -8;

pub const TIMED_OUT: i32 = -1001;
pub const UNKNOWN_HOST: i32 = -1003;
pub const CANNOT_CONNECT_TO_HOST: i32 = -1004;
pub const CONNECTION_LOST: i32 = -1005;
pub const NOT_CONNECTED_TO_INTERNET: i32 = -1009;
/// Rewritten status for ambiguous network failures when the connectivity
/// probe says the device is offline or the link is unusably slow.
pub const NETWORK_SLOW: i32 = -1010;
pub const PARSE_ERROR: i32 = -1015;

/// First code of the TLS failure class (-1299..=-1200).
pub const NETWORK_SSL_ERROR: i32 = -1200;
const TLS_CLASS_LOWEST: i32 = -1299;

/// 2xx response from the endpoint.
pub fn is_ok(code: i32) -> bool {
    (200..300).contains(&code)
}

/// TLS handshake / certificate failure.
pub fn is_tls_error(code: i32) -> bool {
    (TLS_CLASS_LOWEST..=NETWORK_SSL_ERROR).contains(&code)
}

/// Transport failures whose cause cannot be told apart from "the device has
/// no connectivity" without a secondary probe.
pub fn is_connectivity_ambiguous(code: i32) -> bool {
    matches!(
        code,
        NETWORK_ERROR
            | TIMED_OUT
            | UNKNOWN_HOST
            | CANNOT_CONNECT_TO_HOST
            | CONNECTION_LOST
            | NOT_CONNECTED_TO_INTERNET
    ) || is_tls_error(code)
}

/// Error-type label used by telemetry; `None` for successful responses.
pub fn error_type_label(code: i32) -> Option<&'static str> {
    let label = match code {
        c if is_ok(c) => return None,
        NETWORK_ERROR => "network_error",
        TIMED_OUT => "timeout",
        UNKNOWN_HOST => "unknown_host",
        CANNOT_CONNECT_TO_HOST => "cannot_connect_to_host",
        CONNECTION_LOST | NOT_CONNECTED_TO_INTERNET => "transmission_error",
        c if is_tls_error(c) => "ssl_error",
        NETWORK_SLOW => "network_slow",
        PARSE_ERROR => "parse_error",
        CANCELLED => "user_canceled",
        INVALID_FILE | INVALID_ARGUMENT | INVALID_TOKEN | ZERO_SIZE_FILE | LOCAL_IO_ERROR => {
            "local_io_error"
        }
        MALICIOUS_RESPONSE => "malicious_response",
        c if c >= 300 => "response_error",
        _ => "unknown_error",
    };
    Some(label)
}
