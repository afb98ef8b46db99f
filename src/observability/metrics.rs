//! Metrics collection and exposition.
//!
//! # Metrics
//! - `verifier_challenges_total` (counter): handled challenges by outcome
//! - `verifier_decode_errors_total` (counter): undecodable challenge logs
//! - `verifier_rpc_errors_total` (counter): RPC calls that failed on every provider
//! - `verifier_cursor_block` (gauge): last fully handled block
//! - `verifier_rpc_healthy` (gauge): 1=reachable, 0=unreachable
//! - `verifier_submission_seconds` (histogram): broadcast to receipt latency

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Outcome label for `verifier_challenges_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Verified,
    Rejected,
    SigningFailed,
    SubmissionFailed,
}

impl ChallengeOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            ChallengeOutcome::Verified => "verified",
            ChallengeOutcome::Rejected => "rejected",
            ChallengeOutcome::SigningFailed => "signing_failed",
            ChallengeOutcome::SubmissionFailed => "submission_failed",
        }
    }
}

pub fn record_challenge(outcome: ChallengeOutcome) {
    metrics::counter!("verifier_challenges_total", "outcome" => outcome.as_str()).increment(1);
}

pub fn record_decode_error() {
    metrics::counter!("verifier_decode_errors_total").increment(1);
}

pub fn record_rpc_error(op: &'static str) {
    metrics::counter!("verifier_rpc_errors_total", "op" => op).increment(1);
}

pub fn record_cursor(block: u64) {
    metrics::gauge!("verifier_cursor_block").set(block as f64);
}

pub fn record_rpc_health(healthy: bool) {
    metrics::gauge!("verifier_rpc_healthy").set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_submission_latency(elapsed: Duration) {
    metrics::histogram!("verifier_submission_seconds").record(elapsed.as_secs_f64());
}
