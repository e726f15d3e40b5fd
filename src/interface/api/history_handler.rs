//! Call history proxy

use axum::{extract::State, Json};
use tracing::{error, info};

use super::error::ApiError;
use super::metrics_handler::record_call_history_request;
use super::state::AppState;
use crate::domain::call_history::{CallRecord, CALL_HISTORY_LIMIT};

/// List the most recent calls, straight from the provider
pub async fn get_call_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<CallRecord>>, ApiError> {
    info!("API: Fetching call history (limit: {})", CALL_HISTORY_LIMIT);

    match state.call_history.recent_calls(CALL_HISTORY_LIMIT).await {
        Ok(mut calls) => {
            calls.truncate(CALL_HISTORY_LIMIT);
            record_call_history_request(true);
            Ok(Json(calls))
        }
        Err(e) => {
            error!("API: Failed to fetch call history: {}", e);
            record_call_history_request(false);
            Err(ApiError::internal(
                "Failed to fetch call history",
                e,
                state.mode(),
            ))
        }
    }
}
