//! Voice webhook handlers
//!
//! Both handlers answer with HTTP 200 and a valid call-control document on
//! every input. Construction failures, including panics, degrade to the
//! spoken apology.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::panic::{self, AssertUnwindSafe};
use tracing::{info, warn};

use super::metrics_handler::record_webhook;
use super::router::API_PREFIX;
use super::state::AppState;
use super::webhook_form::WebhookForm;
use crate::config::Config;
use crate::domain::call_control::{
    render_or_fallback, Dial, DialTarget, RecordMode, VoiceResponse, CONTENT_TYPE,
};
use crate::domain::directory::ClientDirectory;
use crate::domain::shared::{DomainError, Result};

/// Outbound call from a browser client
pub async fn voice_webhook(
    State(state): State<AppState>,
    WebhookForm(fields): WebhookForm,
) -> Response {
    let to = fields.get("To").map(String::as_str);
    info!("API: Outbound call webhook (To: {})", to.unwrap_or("-"));

    control_response("voice", || outbound_call_document(&state.config, to))
}

/// Inbound call to the platform number
pub async fn incoming_webhook(
    State(state): State<AppState>,
    WebhookForm(fields): WebhookForm,
) -> Response {
    let from = fields.get("From").map(String::as_str);
    let called = fields.get("To").map(String::as_str);
    info!(
        "API: Inbound call webhook (From: {}, To: {})",
        from.unwrap_or("-"),
        called.unwrap_or("-")
    );

    control_response("incoming", || {
        inbound_call_document(state.directory.as_ref(), from, called)
    })
}

/// Dial the requested destination from the platform number
pub fn outbound_call_document(config: &Config, to: Option<&str>) -> Result<VoiceResponse> {
    let target = to
        .and_then(DialTarget::from_destination)
        .ok_or_else(|| DomainError::ValidationError("no destination provided".to_string()))?;

    let caller_id = config.twilio.phone_number.trim();
    if caller_id.is_empty() {
        return Err(DomainError::Configuration(
            "platform phone number is not configured".to_string(),
        ));
    }

    let mut dial = Dial::new(target).with_caller_id(caller_id);
    if config.gateway.record_outbound_calls {
        dial = dial.with_recording(RecordMode::RecordFromAnswerDual, recording_callback_url(config));
    }

    Ok(VoiceResponse::new().dial(dial))
}

/// Ring the browser client the directory picks
pub fn inbound_call_document(
    directory: &dyn ClientDirectory,
    from: Option<&str>,
    called: Option<&str>,
) -> Result<VoiceResponse> {
    let identity = directory.resolve_inbound(called)?;

    let mut dial = Dial::new(DialTarget::Client(identity.into_string()));
    if let Some(from) = from.map(str::trim).filter(|f| !f.is_empty()) {
        dial = dial.with_caller_id(from);
    }

    Ok(VoiceResponse::new().dial(dial))
}

/// Absolute when a public base URL is known, otherwise relative to the webhook
fn recording_callback_url(config: &Config) -> String {
    match &config.gateway.webhook_base_url {
        Some(base) => format!("{}{}/recording-status", base.trim_end_matches('/'), API_PREFIX),
        None => format!("{}/recording-status", API_PREFIX),
    }
}

fn control_response<F>(kind: &'static str, build: F) -> Response
where
    F: FnOnce() -> Result<VoiceResponse>,
{
    let document = panic::catch_unwind(AssertUnwindSafe(build)).unwrap_or_else(|_| {
        Err(DomainError::Internal(format!(
            "{} document construction panicked",
            kind
        )))
    });

    if let Err(e) = &document {
        warn!("API: {} webhook degraded to fallback: {}", kind, e);
    }
    record_webhook(kind, document.is_ok());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        render_or_fallback(document),
    )
        .into_response()
}
