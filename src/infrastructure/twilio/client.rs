//! Provider REST API client

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::TwilioConfig;
use crate::domain::call_history::{CallHistoryProvider, CallRecord};
use crate::domain::shared::{DomainError, Result};

/// REST API version segment
const API_VERSION: &str = "2010-04-01";

/// Account API client, owns its HTTP connection pool
pub struct TwilioRestClient {
    http: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioRestClient {
    pub fn new(config: &TwilioConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/{}/Accounts/{}/Calls.json",
            self.base_url, API_VERSION, self.account_sid
        )
    }
}

/// One page of the call list resource
#[derive(Debug, Deserialize)]
struct CallPage {
    #[serde(default)]
    calls: Vec<ApiCall>,
}

/// Call resource as the provider returns it
#[derive(Debug, Deserialize)]
struct ApiCall {
    sid: String,
    from: Option<String>,
    to: Option<String>,
    status: Option<String>,
    direction: Option<String>,
    duration: Option<String>,
    start_time: Option<String>,
    end_time: Option<String>,
    date_created: Option<String>,
    price: Option<String>,
    price_unit: Option<String>,
}

/// Error body of a failed API request
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<u32>,
}

/// Provider timestamps are RFC 2822 ("Tue, 31 Aug 2010 20:36:28 +0000")
fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl From<ApiCall> for CallRecord {
    fn from(call: ApiCall) -> Self {
        CallRecord {
            duration: call.duration.as_deref().and_then(|d| d.parse().ok()),
            start_time: parse_timestamp(call.start_time.as_deref()),
            end_time: parse_timestamp(call.end_time.as_deref()),
            date_created: parse_timestamp(call.date_created.as_deref()),
            sid: call.sid,
            from: call.from,
            to: call.to,
            status: call.status,
            direction: call.direction,
            price: call.price,
            price_unit: call.price_unit,
        }
    }
}

#[async_trait]
impl CallHistoryProvider for TwilioRestClient {
    async fn recent_calls(&self, limit: usize) -> Result<Vec<CallRecord>> {
        if self.account_sid.trim().is_empty() || self.auth_token.is_empty() {
            return Err(DomainError::Configuration(
                "account credentials are not configured".to_string(),
            ));
        }

        debug!("Fetching {} most recent calls", limit);

        let response = self
            .http
            .get(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .query(&[("PageSize", limit)])
            .send()
            .await
            .map_err(|e| DomainError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ApiErrorBody>().await.ok();
            let message = match body {
                Some(ApiErrorBody {
                    message: Some(message),
                    code,
                }) => match code {
                    Some(code) => format!("{} (code {})", message, code),
                    None => message,
                },
                _ => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            };
            error!("Call list request failed with HTTP {}: {}", status.as_u16(), message);
            return Err(DomainError::Upstream(format!(
                "{} (HTTP {})",
                message,
                status.as_u16()
            )));
        }

        let page: CallPage = response
            .json()
            .await
            .map_err(|e| DomainError::Upstream(format!("Invalid call list response: {}", e)))?;

        Ok(page
            .calls
            .into_iter()
            .take(limit)
            .map(CallRecord::from)
            .collect())
    }
}
