//! Routing of inbound calls to browser clients

use super::shared::{DomainError, Identity, Result};

/// Looks up which browser client should ring for an inbound call
pub trait ClientDirectory: Send + Sync {
    /// `called` is the dialed platform number, when the provider sent one
    fn resolve_inbound(&self, called: Option<&str>) -> Result<Identity>;
}

/// Single fixed browser endpoint for every inbound call
#[derive(Debug, Clone)]
pub struct StaticDirectory {
    identity: String,
}

impl StaticDirectory {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }
}

impl ClientDirectory for StaticDirectory {
    fn resolve_inbound(&self, _called: Option<&str>) -> Result<Identity> {
        Identity::new(self.identity.clone()).ok_or_else(|| {
            DomainError::Configuration("inbound client identity is not configured".to_string())
        })
    }
}
