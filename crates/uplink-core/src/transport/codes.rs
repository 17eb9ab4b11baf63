//! Map libcurl failures onto synthetic status codes.

use crate::status;

/// Status code for a transfer that failed inside libcurl.
pub fn status_for_curl_error(e: &curl::Error) -> i32 {
    if e.is_aborted_by_callback() {
        return status::CANCELLED;
    }
    if e.is_operation_timedout() {
        return status::TIMED_OUT;
    }
    if e.is_couldnt_resolve_host() {
        return status::UNKNOWN_HOST;
    }
    if e.is_couldnt_connect() || e.is_couldnt_resolve_proxy() {
        return status::CANNOT_CONNECT_TO_HOST;
    }
    if e.is_send_error()
        || e.is_recv_error()
        || e.is_got_nothing()
        || e.is_partial_file()
        || e.is_read_error()
    {
        return status::CONNECTION_LOST;
    }
    if e.is_ssl_connect_error()
        || e.is_peer_failed_verification()
        || e.is_ssl_certproblem()
        || e.is_ssl_cipher()
        || e.is_ssl_cacert()
    {
        return status::NETWORK_SSL_ERROR;
    }
    if e.is_url_malformed() || e.is_unsupported_protocol() {
        return status::INVALID_ARGUMENT;
    }
    status::NETWORK_ERROR
}
