//! Domain layer - Core rules of the gateway
//!
//! This layer contains:
//! - Value Objects: identities, call-control documents, call records
//! - Ports: credential issuance, call history, event sinks, client directory
//!
//! The telephony provider owns all durable state; nothing here persists.

pub mod call_control;
pub mod call_events;
pub mod call_history;
pub mod credential;
pub mod directory;
pub mod shared;

// Re-export commonly used types
pub use shared::{DomainError, Result};
