//! Credential issuance handler

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::error::ApiError;
use super::metrics_handler::record_token_issued;
use super::state::AppState;
use crate::domain::shared::Identity;

/// Token request body, every field optional
#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub identity: Option<String>,
}

/// Token response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub identity: String,
    pub token: String,
}

/// An empty or unparseable body counts as "no identity requested"
fn parse_token_request(body: &[u8]) -> TokenRequest {
    if body.iter().all(u8::is_ascii_whitespace) {
        return TokenRequest::default();
    }

    serde_json::from_slice(body).unwrap_or_else(|e| {
        debug!("API: Ignoring malformed token request body: {}", e);
        TokenRequest::default()
    })
}

/// Issue a calling credential
pub async fn issue_token(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TokenResponse>, ApiError> {
    let request = parse_token_request(&body);
    let identity = Identity::from_request(request.identity);

    info!("API: Issuing access token for {}", identity);

    match state.credential_issuer.issue(&identity) {
        Ok(credential) => {
            record_token_issued(true);
            Ok(Json(TokenResponse {
                identity: credential.identity.into_string(),
                token: credential.token,
            }))
        }
        Err(e) => {
            error!("API: Failed to generate token for {}: {}", identity, e);
            record_token_issued(false);
            Err(ApiError::internal("Failed to generate token", e, state.mode()))
        }
    }
}
