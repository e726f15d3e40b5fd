//! Access token issuance
//!
//! Tokens are HS256 JWTs in the provider's access-token format: the issuer is
//! the signing key SID, the subject is the account SID and the permissions
//! live under a `grants` claim.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TwilioConfig;
use crate::domain::credential::{Credential, CredentialIssuer, Grants};
use crate::domain::shared::{DomainError, Identity, Result};

/// Content type the provider requires in the token header
pub const ACCESS_TOKEN_CONTENT_TYPE: &str = "twilio-fpa;v=1";

/// Provider limit on access token lifetime
pub const MAX_TOKEN_TTL_SECS: u64 = 86_400;

/// Claims of a provider access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub jti: String,
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub grants: Grants,
}

/// Signs voice access tokens with the configured key pair
pub struct AccessTokenIssuer {
    account_sid: String,
    key_sid: String,
    key_secret: String,
    application_sid: String,
    ttl: Duration,
}

impl AccessTokenIssuer {
    pub fn new(config: &TwilioConfig, ttl_secs: u64) -> Self {
        let (key_sid, key_secret) = config.signing_key();
        Self {
            account_sid: config.account_sid.clone(),
            key_sid: key_sid.to_string(),
            key_secret: key_secret.to_string(),
            application_sid: config.twiml_app_sid.clone(),
            ttl: Duration::seconds(ttl_secs.min(MAX_TOKEN_TTL_SECS) as i64),
        }
    }

    fn check_configured(&self) -> Result<()> {
        if self.account_sid.trim().is_empty() {
            return Err(DomainError::Configuration(
                "account SID is not configured".to_string(),
            ));
        }
        if self.key_sid.trim().is_empty() || self.key_secret.is_empty() {
            return Err(DomainError::Configuration(
                "token signing credentials are not configured".to_string(),
            ));
        }
        if self.application_sid.trim().is_empty() {
            return Err(DomainError::Configuration(
                "calling application SID is not configured".to_string(),
            ));
        }
        Ok(())
    }
}

impl CredentialIssuer for AccessTokenIssuer {
    fn issue(&self, identity: &Identity) -> Result<Credential> {
        self.check_configured()?;

        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = AccessTokenClaims {
            jti: format!("{}-{}", self.key_sid, now.timestamp()),
            iss: self.key_sid.clone(),
            sub: self.account_sid.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            grants: Grants::voice(identity, self.application_sid.clone()),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.cty = Some(ACCESS_TOKEN_CONTENT_TYPE.to_string());

        // jsonwebtoken errors never carry the key material
        let token = encode(&header, &claims, &EncodingKey::from_secret(self.key_secret.as_bytes()))
            .map_err(|e| DomainError::Signing(e.to_string()))?;

        debug!("Issued access token for {} (expires {})", identity, expires_at);

        Ok(Credential {
            identity: identity.clone(),
            token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};

    fn twilio_config() -> TwilioConfig {
        let mut config = Config::default().twilio;
        config.account_sid = "AC123".to_string();
        config.auth_token = "account-secret".to_string();
        config.phone_number = "+15559999999".to_string();
        config.twiml_app_sid = "AP123".to_string();
        config
    }

    fn decode_claims(token: &str, secret: &str) -> AccessTokenClaims {
        decode::<AccessTokenClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap()
        .claims
    }

    #[test]
    fn test_issue_signed_voice_token() {
        let issuer = AccessTokenIssuer::new(&twilio_config(), 3600);
        let identity = Identity::new("alice").unwrap();

        let credential = issuer.issue(&identity).unwrap();
        let claims = decode_claims(&credential.token, "account-secret");

        assert_eq!(claims.iss, "AC123");
        assert_eq!(claims.sub, "AC123");
        assert!(claims.jti.starts_with("AC123-"));
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.grants.identity, "alice");
        assert!(claims.grants.voice.incoming.allow);
        assert_eq!(
            claims.grants.voice.outgoing.unwrap().application_sid,
            "AP123"
        );
    }

    #[test]
    fn test_token_header_content_type() {
        let issuer = AccessTokenIssuer::new(&twilio_config(), 60);
        let credential = issuer.issue(&Identity::new("alice").unwrap()).unwrap();

        let header = decode_header(&credential.token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
        assert_eq!(header.cty.as_deref(), Some(ACCESS_TOKEN_CONTENT_TYPE));
    }

    #[test]
    fn test_ttl_is_capped() {
        let issuer = AccessTokenIssuer::new(&twilio_config(), u64::MAX);
        let credential = issuer.issue(&Identity::new("alice").unwrap()).unwrap();
        let claims = decode_claims(&credential.token, "account-secret");

        assert_eq!(claims.exp - claims.iat, MAX_TOKEN_TTL_SECS as i64);
    }

    #[test]
    fn test_api_key_pair_signs_when_present() {
        let mut config = twilio_config();
        config.api_key = Some("SK456".to_string());
        config.api_secret = Some("key-secret".to_string());

        let issuer = AccessTokenIssuer::new(&config, 60);
        let credential = issuer.issue(&Identity::new("alice").unwrap()).unwrap();
        let claims = decode_claims(&credential.token, "key-secret");

        assert_eq!(claims.iss, "SK456");
        assert_eq!(claims.sub, "AC123");
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let mut config = twilio_config();
        config.auth_token = String::new();

        let issuer = AccessTokenIssuer::new(&config, 60);
        let err = issuer.issue(&Identity::new("alice").unwrap()).unwrap_err();

        assert!(matches!(err, DomainError::Configuration(_)));
    }

    #[test]
    fn test_missing_application_is_configuration_error() {
        let mut config = twilio_config();
        config.twiml_app_sid = String::new();

        let issuer = AccessTokenIssuer::new(&config, 60);
        let err = issuer.issue(&Identity::new("alice").unwrap()).unwrap_err();

        assert!(err.to_string().contains("application"));
        assert!(!err.to_string().contains("account-secret"));
    }
}
