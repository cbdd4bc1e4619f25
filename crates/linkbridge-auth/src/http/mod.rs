//! HTTP boundary for the token exchange.
//!
//! - [`verify`] - `POST /verify` handler and error responses

pub mod verify;

pub use verify::{VerifyRequest, VerifyResponse, VerifyState, verify_handler};
