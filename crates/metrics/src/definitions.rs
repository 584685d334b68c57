//! Metric name and label definitions.
//!
//! Centralizing these keeps the names used by the auth flow and the backend
//! client consistent.

/// Login flow metrics
pub mod auth {
    /// Login attempts started (one per pop-up opened)
    pub const LOGIN_ATTEMPTS_TOTAL: &str = "weblib_auth_login_attempts_total";
    /// Login attempts that reached an authenticated session
    pub const LOGIN_SUCCESS_TOTAL: &str = "weblib_auth_login_success_total";
    /// Login attempts that ended in a terminal failure
    pub const LOGIN_FAILURES_TOTAL: &str = "weblib_auth_login_failures_total";
    /// Silent attempts retried with an interactive prompt
    pub const INTERACTIVE_RETRIES_TOTAL: &str = "weblib_auth_interactive_retries_total";
    /// Identity tokens rejected by claim validation
    pub const TOKEN_VALIDATION_FAILURES_TOTAL: &str = "weblib_auth_token_validation_failures_total";
    /// Pending attempts that expired without an answer
    pub const ATTEMPTS_EXPIRED_TOTAL: &str = "weblib_auth_attempts_expired_total";
}

/// Backend API client metrics
pub mod backend {
    /// Requests sent to the backend
    pub const REQUESTS_TOTAL: &str = "weblib_backend_requests_total";
    /// Requests that failed or were rejected
    pub const REQUEST_ERRORS_TOTAL: &str = "weblib_backend_request_errors_total";
    /// Request duration in seconds
    pub const REQUEST_DURATION_SECONDS: &str = "weblib_backend_request_duration_seconds";
}

/// Common label keys
pub mod labels {
    pub const ENDPOINT: &str = "endpoint";
    pub const PROMPT: &str = "prompt";
    pub const REASON: &str = "reason";
    pub const CHECK: &str = "check";
}

