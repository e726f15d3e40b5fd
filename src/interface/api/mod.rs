//! API interface implementations

pub mod auth;
pub mod call_control_handler;
pub mod callback_handler;
pub mod error;
pub mod health_handler;
pub mod history_handler;
pub mod metrics_handler;
pub mod router;
pub mod state;
pub mod token_handler;
pub mod webhook_form;

pub use auth::{AllowAll, Authorizer, BearerTokenAuthorizer};
pub use error::{ApiError, ErrorResponse};
pub use metrics_handler::init_metrics;
pub use router::{build_router, API_PREFIX};
pub use state::AppState;
