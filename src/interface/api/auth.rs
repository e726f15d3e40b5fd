//! Request authorization
//!
//! Caller-facing endpoints pass through an [`Authorizer`]; provider webhooks
//! are checked against the provider's request signature instead.

use axum::{
    body::Body,
    extract::{OriginalUri, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::error::ApiError;
use super::state::AppState;
use crate::domain::shared::{DomainError, Result};
use crate::infrastructure::twilio::SIGNATURE_HEADER;

/// Upper bound on webhook bodies buffered for signature checks
const MAX_WEBHOOK_BODY: usize = 64 * 1024;

/// Decides whether a caller may use a caller-facing endpoint
pub trait Authorizer: Send + Sync {
    fn authorize(&self, headers: &HeaderMap) -> Result<()>;
}

/// Lets every request through
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _headers: &HeaderMap) -> Result<()> {
        Ok(())
    }
}

/// Requires `Authorization: Bearer <token>` with a shared token
#[derive(Clone)]
pub struct BearerTokenAuthorizer {
    token: String,
}

impl BearerTokenAuthorizer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Authorizer for BearerTokenAuthorizer {
    fn authorize(&self, headers: &HeaderMap) -> Result<()> {
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| DomainError::Unauthorized("missing bearer token".to_string()))?;

        if constant_time_eq(presented.trim().as_bytes(), self.token.as_bytes()) {
            Ok(())
        } else {
            Err(DomainError::Unauthorized("invalid bearer token".to_string()))
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Middleware guarding caller-facing routes
pub async fn require_authorization(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match state.authorizer.authorize(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            warn!("API: Rejected {} {}: {}", request.method(), request.uri(), e);
            ApiError::unauthorized(e).into_response()
        }
    }
}

/// Middleware verifying provider signatures on webhook routes.
///
/// Passes everything through unless a public base URL is configured, since
/// the signed URL must match what the provider called.
pub async fn verify_webhook_signature(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (Some(validator), Some(base_url)) = (
        state.webhook_validator.as_ref(),
        state.config.gateway.webhook_base_url.as_deref(),
    ) else {
        return next.run(request).await;
    };

    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());
    let path_and_query = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let url = format!("{}{}", base_url.trim_end_matches('/'), path_and_query);

    let signature = request
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_WEBHOOK_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("API: Unreadable webhook body for {}: {}", url, e);
            return ApiError::forbidden("unreadable request body").into_response();
        }
    };

    let params: Vec<(String, String)> = url::form_urlencoded::parse(&bytes).into_owned().collect();

    match signature {
        Some(signature) if validator.validate(&url, &params, &signature) => {
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        Some(_) => {
            warn!("API: Invalid webhook signature for {}", url);
            ApiError::forbidden("invalid request signature").into_response()
        }
        None => {
            warn!("API: Missing webhook signature for {}", url);
            ApiError::forbidden("missing request signature").into_response()
        }
    }
}
