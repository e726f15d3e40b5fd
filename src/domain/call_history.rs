//! Recent call history, fetched live from the provider
//!
//! Records are owned by the telephony provider. The gateway only reprojects
//! them into a normalized shape for the browser; nothing is cached.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::Result;

/// Maximum number of records returned by a history query
pub const CALL_HISTORY_LIMIT: usize = 20;

/// Normalized call record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub sid: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub status: Option<String>,
    pub direction: Option<String>,
    /// Duration in seconds
    pub duration: Option<u64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub date_created: Option<DateTime<Utc>>,
    pub price: Option<String>,
    pub price_unit: Option<String>,
}

/// Source of recent call records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallHistoryProvider: Send + Sync {
    /// Most recent calls first, at most `limit` records
    async fn recent_calls(&self, limit: usize) -> Result<Vec<CallRecord>>;
}
