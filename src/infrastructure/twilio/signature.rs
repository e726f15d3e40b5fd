//! Webhook request signatures
//!
//! The provider signs each webhook with HMAC-SHA1 keyed by the account auth
//! token, over the full request URL followed by every POST parameter as
//! `name` + `value`, sorted by name. The base64 digest arrives in the
//! `X-Twilio-Signature` header.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use tracing::warn;

use crate::domain::shared::{DomainError, Result};

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the request signature
pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

/// Validates webhook signatures for one account
#[derive(Clone)]
pub struct RequestValidator {
    auth_token: String,
}

impl RequestValidator {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            auth_token: auth_token.into(),
        }
    }

    fn mac(&self, url: &str, params: &[(String, String)]) -> Result<HmacSha1> {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();

        let mut mac = HmacSha1::new_from_slice(self.auth_token.as_bytes())
            .map_err(|e| DomainError::Internal(format!("Invalid signing key: {}", e)))?;
        mac.update(url.as_bytes());
        for (name, value) in sorted {
            mac.update(name.as_bytes());
            mac.update(value.as_bytes());
        }
        Ok(mac)
    }

    /// Expected base64 signature for a request
    pub fn compute_signature(&self, url: &str, params: &[(String, String)]) -> Result<String> {
        Ok(STANDARD.encode(self.mac(url, params)?.finalize().into_bytes()))
    }

    /// Constant-time check of a received signature
    pub fn validate(&self, url: &str, params: &[(String, String)], signature: &str) -> bool {
        let Ok(expected) = STANDARD.decode(signature.trim()) else {
            return false;
        };

        match self.mac(url, params) {
            Ok(mac) => mac.verify_slice(&expected).is_ok(),
            Err(e) => {
                warn!("Cannot verify webhook signature: {}", e);
                false
            }
        }
    }
}
