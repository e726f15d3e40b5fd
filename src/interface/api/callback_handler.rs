//! Provider status callbacks
//!
//! The provider only needs an acknowledgement and retries on anything but
//! 2xx, so these handlers answer 200 with an empty body no matter what.

use axum::{extract::State, http::StatusCode};
use tracing::{info, warn};

use super::metrics_handler::{record_call_status, record_recording_callback};
use super::state::AppState;
use super::webhook_form::WebhookForm;
use crate::domain::call_events::{CallStatusEvent, RecordingStatusEvent};

/// Call progress notification
pub async fn call_status_callback(
    State(state): State<AppState>,
    WebhookForm(fields): WebhookForm,
) -> StatusCode {
    let event = CallStatusEvent::from_fields(&fields);
    info!(
        "API: Call status callback ({}: {})",
        event.call_sid.as_deref().unwrap_or("-"),
        event.call_status.as_deref().unwrap_or("-")
    );

    record_call_status(event.call_status.as_deref());
    if let Err(e) = state.event_sink.call_status(&event).await {
        warn!("API: Call status event dropped: {}", e);
    }

    StatusCode::OK
}

/// Recording completion notification
pub async fn recording_status_callback(
    State(state): State<AppState>,
    WebhookForm(fields): WebhookForm,
) -> StatusCode {
    let event = RecordingStatusEvent::from_fields(&fields);
    info!(
        "API: Recording status callback ({})",
        event.recording_sid.as_deref().unwrap_or("-")
    );

    record_recording_callback();
    if let Err(e) = state.event_sink.recording_status(&event).await {
        warn!("API: Recording status event dropped: {}", e);
    }

    StatusCode::OK
}
