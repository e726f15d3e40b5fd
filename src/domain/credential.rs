//! Calling credentials issued to browser clients
//!
//! A credential is a signed, time-boxed token that lets one identity place
//! outgoing calls through a registered calling application and receive
//! incoming calls addressed to it. Nothing here is stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{Identity, Result};

/// Permissions embedded in a credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grants {
    pub identity: String,
    pub voice: VoiceGrant,
}

impl Grants {
    pub fn voice(identity: &Identity, application_sid: impl Into<String>) -> Self {
        Self {
            identity: identity.as_str().to_string(),
            voice: VoiceGrant {
                incoming: IncomingGrant { allow: true },
                outgoing: Some(OutgoingGrant {
                    application_sid: application_sid.into(),
                }),
            },
        }
    }
}

/// Voice calling permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceGrant {
    pub incoming: IncomingGrant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outgoing: Option<OutgoingGrant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingGrant {
    pub allow: bool,
}

/// Outgoing calls are routed through this application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingGrant {
    pub application_sid: String,
}

/// A freshly issued credential
#[derive(Debug, Clone)]
pub struct Credential {
    pub identity: Identity,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues signed credentials for an identity
#[cfg_attr(test, mockall::automock)]
pub trait CredentialIssuer: Send + Sync {
    fn issue(&self, identity: &Identity) -> Result<Credential>;
}
