//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use tracing::error;

use crate::config::RuntimeMode;

/// Message shown instead of error detail in production
pub const GENERIC_ERROR_MESSAGE: &str = "Internal server error";

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Caller-facing API error
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    detail: String,
    expose_detail: bool,
}

impl ApiError {
    /// 500 whose detail is hidden in production
    pub fn internal(error: impl Into<String>, detail: impl fmt::Display, mode: RuntimeMode) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
            detail: detail.to_string(),
            expose_detail: !mode.is_production(),
        }
    }

    pub fn unauthorized(detail: impl fmt::Display) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "Unauthorized".to_string(),
            detail: detail.to_string(),
            expose_detail: true,
        }
    }

    pub fn forbidden(detail: impl fmt::Display) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            error: "Forbidden".to_string(),
            detail: detail.to_string(),
            expose_detail: true,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error.clone(),
            message: if self.expose_detail {
                self.detail.clone()
            } else {
                GENERIC_ERROR_MESSAGE.to_string()
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

/// Response for a panic caught anywhere below the router
pub fn panic_response(err: Box<dyn Any + Send + 'static>, mode: RuntimeMode) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!("Unhandled panic in request handler: {}", detail);
    ApiError::internal("Internal server error", detail, mode).into_response()
}
