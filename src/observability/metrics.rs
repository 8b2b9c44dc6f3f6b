//! Auth flow counters recorded through the `metrics` facade.

use metrics::counter;

/// Record a login attempt outcome ("success", "invalid_credentials",
/// "account_suspended").
pub fn record_authentication(outcome: &'static str) {
    counter!("auth_login_attempts_total", "outcome" => outcome).increment(1);
}

/// Record issuance of a token of the given type.
pub fn record_token_issued(token_type: &'static str) {
    counter!("auth_tokens_issued_total", "type" => token_type).increment(1);
}

/// Record consumption (single-use deletion) of a token of the given type.
pub fn record_token_consumed(token_type: &'static str) {
    counter!("auth_tokens_consumed_total", "type" => token_type).increment(1);
}

/// Record a collapsed flow failure ("refresh", "reset_password",
/// "verify_email").
pub fn record_flow_failure(flow: &'static str) {
    counter!("auth_flow_failures_total", "flow" => flow).increment(1);
}
