//! API Router configuration

use super::auth::{require_authorization, verify_webhook_signature};
use super::call_control_handler::{incoming_webhook, voice_webhook};
use super::callback_handler::{call_status_callback, recording_status_callback};
use super::error::panic_response;
use super::health_handler::health_check;
use super::history_handler::get_call_history;
use super::metrics_handler::metrics_handler;
use super::state::AppState;
use super::token_handler::issue_token;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Common prefix of every API route
pub const API_PREFIX: &str = "/api";

/// Build the gateway router: API routes under [`API_PREFIX`], static
/// frontend assets everywhere else
pub fn build_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    let mode = state.mode();
    let static_dir = state.config.server.static_dir.clone();

    // Caller-facing routes (authorizer applies)
    let caller_routes = Router::new()
        .route("/token", post(issue_token))
        .route("/call-history", get(get_call_history))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_authorization,
        ));

    // Provider webhooks (signature check applies)
    let webhook_routes = Router::new()
        .route("/voice", post(voice_webhook))
        .route("/incoming", post(incoming_webhook))
        .route("/call-status", post(call_status_callback))
        .route("/recording-status", post(recording_status_callback))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            verify_webhook_signature,
        ));

    // Health check route (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    // Metrics route (separate state)
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    let api_routes = Router::new()
        .merge(caller_routes)
        .merge(webhook_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(metrics_routes);

    Router::new()
        .nest(API_PREFIX, api_routes)
        .fallback_service(ServeDir::new(static_dir))
        .layer(CatchPanicLayer::custom(
            move |err: Box<dyn std::any::Any + Send + 'static>| panic_response(err, mode),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
