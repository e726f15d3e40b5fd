//! Shared value objects

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a browser-side calling endpoint
///
/// Opaque on purpose: the provider accepts any string, so no format or
/// uniqueness checks happen here. Blank values are rejected so that a caller
/// sending `{"identity": ""}` gets a generated one instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Timestamp-derived default identity.
    ///
    /// Two calls within the same millisecond yield the same value.
    pub fn generate() -> Self {
        Self(format!("user_{}", Utc::now().timestamp_millis()))
    }

    /// Use the requested identity when present, otherwise generate one
    pub fn from_request(requested: Option<String>) -> Self {
        requested.and_then(Self::new).unwrap_or_else(Self::generate)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
