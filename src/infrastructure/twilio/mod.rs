//! Telephony provider integration

pub mod client;
pub mod signature;
pub mod token;

pub use client::TwilioRestClient;
pub use signature::{RequestValidator, SIGNATURE_HEADER};
pub use token::{AccessTokenClaims, AccessTokenIssuer};
