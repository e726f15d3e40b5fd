//! Voice gateway - HTTP backend for browser calling
//!
//! Issues short-lived calling credentials to a browser client, answers the
//! telephony provider's voice webhooks with call-control documents, proxies
//! recent call history and serves the static frontend.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::error::Result;
