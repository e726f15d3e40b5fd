//! Shared kernel - Common types used across the gateway

pub mod error;
pub mod value_objects;

pub use error::{DomainError, Result};
pub use value_objects::*;
