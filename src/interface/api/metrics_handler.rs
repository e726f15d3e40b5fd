//! Prometheus metrics

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::warn;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder (once per process) and return its handle
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();

            if metrics::set_global_recorder(recorder).is_err() {
                warn!("A global metrics recorder is already installed");
            }

            describe_counter!(
                "voice_tokens_issued_total",
                "Access tokens requested, by outcome"
            );
            describe_counter!(
                "voice_webhooks_total",
                "Call-control webhooks answered, by kind and outcome"
            );
            describe_counter!(
                "voice_call_status_callbacks_total",
                "Call status callbacks received, by call status"
            );
            describe_counter!(
                "voice_recording_callbacks_total",
                "Recording status callbacks received"
            );
            describe_counter!(
                "voice_call_history_requests_total",
                "Call history queries, by outcome"
            );

            handle
        })
        .clone()
}

/// HTTP metrics handler
pub async fn metrics_handler(State(prometheus_handle): State<PrometheusHandle>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        prometheus_handle.render(),
    )
        .into_response()
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Record a token request
pub fn record_token_issued(success: bool) {
    counter!("voice_tokens_issued_total", "outcome" => outcome(success)).increment(1);
}

/// Record a call-control webhook; failure means the fallback was served
pub fn record_webhook(kind: &'static str, success: bool) {
    counter!("voice_webhooks_total", "kind" => kind, "outcome" => outcome(success)).increment(1);
}

/// Record a call status callback.
///
/// Unknown statuses share one label so callers cannot grow the label set.
pub fn record_call_status(status: Option<&str>) {
    let label = match status {
        Some(
            s @ ("queued" | "initiated" | "ringing" | "in-progress" | "completed" | "busy"
            | "failed" | "no-answer" | "canceled"),
        ) => s.to_string(),
        Some(_) => "other".to_string(),
        None => "unknown".to_string(),
    };
    counter!("voice_call_status_callbacks_total", "status" => label).increment(1);
}

/// Record a recording status callback
pub fn record_recording_callback() {
    counter!("voice_recording_callbacks_total").increment(1);
}

/// Record a call history query
pub fn record_call_history_request(success: bool) {
    counter!("voice_call_history_requests_total", "outcome" => outcome(success)).increment(1);
}
