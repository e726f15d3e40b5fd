//! Interface layer - External interfaces
//!
//! This layer handles:
//! - REST endpoints for the browser client
//! - Webhooks called by the telephony provider
//! - Request/response formatting

pub mod api;
