//! Status notifications pushed by the provider
//!
//! The provider retries a callback until it sees a 2xx, so the same event may
//! arrive more than once. Sinks must tolerate duplicates.

use async_trait::async_trait;
use std::collections::HashMap;

use super::shared::Result;

/// Call progress notification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallStatusEvent {
    pub call_sid: Option<String>,
    pub call_status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub call_duration: Option<String>,
}

impl CallStatusEvent {
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            call_sid: field(fields, "CallSid"),
            call_status: field(fields, "CallStatus"),
            from: field(fields, "From"),
            to: field(fields, "To"),
            call_duration: field(fields, "CallDuration"),
        }
    }
}

/// Recording completion notification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingStatusEvent {
    pub recording_sid: Option<String>,
    pub recording_url: Option<String>,
    pub recording_status: Option<String>,
    pub recording_duration: Option<String>,
    pub call_sid: Option<String>,
}

impl RecordingStatusEvent {
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            recording_sid: field(fields, "RecordingSid"),
            recording_url: field(fields, "RecordingUrl"),
            recording_status: field(fields, "RecordingStatus"),
            recording_duration: field(fields, "RecordingDuration"),
            call_sid: field(fields, "CallSid"),
        }
    }
}

fn field(fields: &HashMap<String, String>, name: &str) -> Option<String> {
    fields.get(name).filter(|v| !v.is_empty()).cloned()
}

/// Receiver of provider notifications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallEventSink: Send + Sync {
    async fn call_status(&self, event: &CallStatusEvent) -> Result<()>;

    async fn recording_status(&self, event: &RecordingStatusEvent) -> Result<()>;
}
