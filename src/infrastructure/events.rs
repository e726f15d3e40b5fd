//! Tracing-backed call event sink

use async_trait::async_trait;
use tracing::info;

use crate::domain::call_events::{CallEventSink, CallStatusEvent, RecordingStatusEvent};
use crate::domain::shared::Result;

/// Emits provider notifications as structured log events
#[derive(Debug, Default, Clone)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CallEventSink for TracingEventSink {
    async fn call_status(&self, event: &CallStatusEvent) -> Result<()> {
        info!(
            call_sid = event.call_sid.as_deref().unwrap_or("-"),
            status = event.call_status.as_deref().unwrap_or("-"),
            from = event.from.as_deref().unwrap_or("-"),
            to = event.to.as_deref().unwrap_or("-"),
            duration = event.call_duration.as_deref().unwrap_or("-"),
            "Call status update"
        );
        Ok(())
    }

    async fn recording_status(&self, event: &RecordingStatusEvent) -> Result<()> {
        info!(
            recording_sid = event.recording_sid.as_deref().unwrap_or("-"),
            recording_url = event.recording_url.as_deref().unwrap_or("-"),
            status = event.recording_status.as_deref().unwrap_or("-"),
            call_sid = event.call_sid.as_deref().unwrap_or("-"),
            "Recording status update"
        );
        Ok(())
    }
}
