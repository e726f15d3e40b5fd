//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Telephony provider integration (tokens, REST API, webhook signatures)
//! - Call event sinks

pub mod events;
pub mod twilio;
